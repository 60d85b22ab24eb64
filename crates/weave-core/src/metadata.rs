//! Per-class static member descriptors and lazy per-instance member
//! containers.
//!
//! Each concrete class carries a `&'static ClassInfo` (generated by the
//! `Interfaces` derive macro from `#[member(...)]` attributes, or
//! assembled by hand for the built-ins in this crate). The first
//! lookup of a given member name materializes it — a
//! [`crate::property::Property`], [`crate::event::Event`] or
//! [`crate::function::Function`] — and caches it for the life of the
//! object.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::event::{Event, IEvent};
use crate::function::{Function, IFunction};
use crate::global;
use crate::interface::{IInterface, InterfaceId};
use crate::property::{IProperty, Property};
use crate::types::{ClassInfo, MemberKind};
use crate::uid::{type_uid, Uid};

pub trait IMetadata: IInterface {
    fn class_info(&self) -> &'static ClassInfo;
    fn get_property(&self, name: &str) -> Option<Arc<dyn IProperty>>;
    fn get_event(&self, name: &str) -> Option<Arc<dyn IEvent>>;
    fn get_function(&self, name: &str) -> Option<Arc<dyn IFunction>>;
}

#[derive(Clone)]
enum CachedMember {
    Property(Arc<dyn IProperty>),
    Event(Arc<dyn IEvent>),
    Function(Arc<dyn IFunction>),
}

/// Embeddable reflection helper. A class that wants `IMetadata` holds
/// one of these and forwards the three lookup methods to it.
pub struct MetadataContainer {
    class_info: &'static ClassInfo,
    cache: RwLock<HashMap<&'static str, CachedMember>>,
}

impl MetadataContainer {
    pub fn new(class_info: &'static ClassInfo) -> Self {
        Self {
            class_info,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn class_info(&self) -> &'static ClassInfo {
        self.class_info
    }

    pub fn get_property(&self, name: &str) -> Option<Arc<dyn IProperty>> {
        if let Some(CachedMember::Property(p)) = self.cache.read().get(name) {
            return Some(p.clone());
        }
        let desc = self.class_info.member(name)?;
        if desc.kind != MemberKind::Property {
            return None;
        }
        let prop = create_builtin_property();
        if let Some(api) = global::runtime_api() {
            if let Some(any) = api.create_any(desc.type_uid) {
                prop.set_any(any);
            }
        }
        self.cache
            .write()
            .insert(desc.name, CachedMember::Property(prop.clone()));
        Some(prop)
    }

    pub fn get_event(&self, name: &str) -> Option<Arc<dyn IEvent>> {
        if let Some(CachedMember::Event(e)) = self.cache.read().get(name) {
            return Some(e.clone());
        }
        let desc = self.class_info.member(name)?;
        if desc.kind != MemberKind::Event {
            return None;
        }
        let handle = create_builtin_event();
        self.cache
            .write()
            .insert(desc.name, CachedMember::Event(handle.clone()));
        Some(handle)
    }

    pub fn get_function(&self, name: &str) -> Option<Arc<dyn IFunction>> {
        if let Some(CachedMember::Function(f)) = self.cache.read().get(name) {
            return Some(f.clone());
        }
        let desc = self.class_info.member(name)?;
        if desc.kind != MemberKind::Function {
            return None;
        }
        let handle = create_builtin_function();
        self.cache
            .write()
            .insert(desc.name, CachedMember::Function(handle.clone()));
        Some(handle)
    }
}

/// Materializes a fresh `Property` through the instance registry
/// (`RuntimeApi::create`, keyed by `Property`'s own class UID) rather
/// than constructing it directly, so this built-in goes through the
/// same registration path every other class does. Narrows the
/// registry's `Arc<dyn IInterface>` back down to `Arc<dyn IProperty>`
/// via `get_interface` plus `IProperty::self_arc`.
///
/// Falls back to direct construction if no `RuntimeApi` is installed
/// (e.g. `weave-core` used, or tested, without `weave-runtime` linked
/// in) or if the registry call comes back empty for any reason — the
/// built-ins have no state that depends on registry-assigned identity,
/// so a bare `Property::new()` is behaviorally identical.
fn create_builtin_property() -> Arc<dyn IProperty> {
    global::runtime_api()
        .and_then(|api| api.create(property_class_uid()))
        .and_then(|obj| obj.get_interface(<dyn IProperty as InterfaceId>::UID)?.as_property()?.self_arc())
        .unwrap_or_else(|| Property::new() as Arc<dyn IProperty>)
}

fn create_builtin_event() -> Arc<dyn IEvent> {
    global::runtime_api()
        .and_then(|api| api.create(event_class_uid()))
        .and_then(|obj| obj.get_interface(<dyn IEvent as InterfaceId>::UID)?.as_event()?.self_arc())
        .unwrap_or_else(|| Event::new() as Arc<dyn IEvent>)
}

fn create_builtin_function() -> Arc<dyn IFunction> {
    global::runtime_api()
        .and_then(|api| api.create(function_class_uid()))
        .and_then(|obj| obj.get_interface(<dyn IFunction as InterfaceId>::UID)?.as_function()?.self_arc())
        .unwrap_or_else(|| Function::new() as Arc<dyn IFunction>)
}

impl std::fmt::Debug for MetadataContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataContainer")
            .field("class", &self.class_info.name)
            .field("cached", &self.cache.read().len())
            .finish()
    }
}

/// UID registered for the built-in `Property` class, used by
/// [`crate::global::RuntimeApi`] implementors that need to recognize
/// it without a hard dependency on this module.
pub fn property_class_uid() -> Uid {
    type_uid::<Property>()
}

/// UID registered for the built-in `Event` class, used by
/// [`crate::global::RuntimeApi`] implementors that need to recognize
/// it without a hard dependency on this module.
pub fn event_class_uid() -> Uid {
    type_uid::<Event>()
}

/// UID registered for the built-in `Function` class, used by
/// [`crate::global::RuntimeApi`] implementors that need to recognize
/// it without a hard dependency on this module.
pub fn function_class_uid() -> Uid {
    type_uid::<Function>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MemberDesc;

    static MEMBERS: &[MemberDesc] = &[
        MemberDesc {
            kind: MemberKind::Event,
            name: "clicked",
            type_uid: Uid::NIL,
        },
        MemberDesc {
            kind: MemberKind::Function,
            name: "reset",
            type_uid: Uid::NIL,
        },
    ];

    static CLASS: ClassInfo = ClassInfo {
        class_uid: Uid::NIL,
        name: "Widget",
        members: MEMBERS,
    };

    #[test]
    fn lazily_creates_and_caches_members() {
        let container = MetadataContainer::new(&CLASS);
        let a = container.get_event("clicked").unwrap();
        let b = container.get_event("clicked").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn unknown_member_name_is_none() {
        let container = MetadataContainer::new(&CLASS);
        assert!(container.get_property("nonexistent").is_none());
    }

    #[test]
    fn wrong_kind_lookup_is_none() {
        let container = MetadataContainer::new(&CLASS);
        // "clicked" is an Event member, not a Function.
        assert!(container.get_function("clicked").is_none());
    }
}
