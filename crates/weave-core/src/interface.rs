//! Interface identity and multi-interface dispatch.
//!
//! The Runtime's interface set is small and closed, so `get_interface`
//! returns a value of this closed [`InterfaceRef`] enum rather than
//! leaning on `dyn Any`/`TypeId` — see DESIGN.md for why that satisfies
//! the identity/reflexivity invariants without reaching for dynamic
//! type info.

use crate::any::{IAny, IExternalChange};
use crate::event::IEvent;
use crate::function::IFunction;
use crate::metadata::IMetadata;
use crate::property::IProperty;
use crate::uid::{make_uid, Uid};

/// Gives every core interface a stable [`Uid`], independent of any
/// concrete implementor.
pub trait InterfaceId {
    const UID: Uid;
}

impl InterfaceId for dyn IAny {
    const UID: Uid = make_uid("weave::IAny");
}
impl InterfaceId for dyn IFunction {
    const UID: Uid = make_uid("weave::IFunction");
}
impl InterfaceId for dyn IEvent {
    const UID: Uid = make_uid("weave::IEvent");
}
impl InterfaceId for dyn IProperty {
    const UID: Uid = make_uid("weave::IProperty");
}
impl InterfaceId for dyn IExternalChange {
    const UID: Uid = make_uid("weave::IExternalChange");
}
impl InterfaceId for dyn IMetadata {
    const UID: Uid = make_uid("weave::IMetadata");
}

/// A type-erased, borrowed reference to one of the Runtime's core
/// interfaces, returned by [`IInterface::get_interface`].
pub enum InterfaceRef<'a> {
    Any(&'a dyn IAny),
    Function(&'a dyn IFunction),
    Event(&'a dyn IEvent),
    Property(&'a dyn IProperty),
    ExternalChange(&'a dyn IExternalChange),
    Metadata(&'a dyn IMetadata),
}

impl<'a> InterfaceRef<'a> {
    pub fn as_any(&self) -> Option<&'a dyn IAny> {
        match *self {
            InterfaceRef::Any(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&'a dyn IFunction> {
        match *self {
            InterfaceRef::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_event(&self) -> Option<&'a dyn IEvent> {
        match *self {
            InterfaceRef::Event(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_property(&self) -> Option<&'a dyn IProperty> {
        match *self {
            InterfaceRef::Property(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_external_change(&self) -> Option<&'a dyn IExternalChange> {
        match *self {
            InterfaceRef::ExternalChange(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_metadata(&self) -> Option<&'a dyn IMetadata> {
        match *self {
            InterfaceRef::Metadata(m) => Some(m),
            _ => None,
        }
    }
}

/// Base capability every Runtime object implements.
///
/// `get_interface` returns the same answer on every call for a given
/// `uid`, and is reflexive: if a class derives
/// [`weave_macros::Interfaces`] listing interface `I`,
/// `get_interface(I::UID)` is `Some` for every instance of that class.
pub trait IInterface: Send + Sync {
    /// UID of this object's most-derived concrete class.
    fn class_uid(&self) -> Uid;

    /// Looks up one of this object's interfaces by UID, or `None`.
    fn get_interface(&self, uid: Uid) -> Option<InterfaceRef<'_>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_interface_uids_are_distinct() {
        let uids = [
            <dyn IAny as InterfaceId>::UID,
            <dyn IFunction as InterfaceId>::UID,
            <dyn IEvent as InterfaceId>::UID,
            <dyn IProperty as InterfaceId>::UID,
            <dyn IExternalChange as InterfaceId>::UID,
            <dyn IMetadata as InterfaceId>::UID,
        ];
        for (i, a) in uids.iter().enumerate() {
            for (j, b) in uids.iter().enumerate() {
                if i != j {
                    assert_ne!(a, b);
                }
            }
        }
    }

    #[test]
    fn get_interface_is_stable_across_calls() {
        use crate::any::AnyValue;
        let any = AnyValue::new(1i32);
        let first = any.get_interface(<dyn IAny as InterfaceId>::UID).is_some();
        let second = any.get_interface(<dyn IAny as InterfaceId>::UID).is_some();
        assert_eq!(first, second);
        assert!(first);
        assert!(any.get_interface(<dyn IEvent as InterfaceId>::UID).is_none());
    }
}
