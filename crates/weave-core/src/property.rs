//! A change-notifying value: an [`IAny`] plus an `on_changed` event.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::any::{IAny, IExternalChange};
use crate::event::{Event, IEvent};
use crate::function::{FnArgs, Function, IFunction};
use crate::interface::{IInterface, InterfaceId};
use crate::rc::SelfRef;
use crate::types::{InvokeType, ReturnValue};
use crate::uid::{type_uid, Uid};

pub trait IProperty: IInterface {
    /// Binds the backing Any. `Unbound -> Bound` is one-way: binding
    /// the same Any again is [`ReturnValue::NothingToDo`]; binding a
    /// different Any once already bound is [`ReturnValue::Fail`].
    fn set_any(&self, any: Arc<dyn IAny>) -> ReturnValue;

    /// Copies `from`'s value into the backing Any, firing `on_changed`
    /// iff the stored bytes actually changed. Fails if unbound.
    fn set_value(&self, from: &dyn IAny) -> ReturnValue;

    /// Raw-bytes equivalent of [`IProperty::set_value`].
    fn set_data(&self, src: &[u8], type_uid: Uid) -> ReturnValue;

    fn backing(&self) -> Option<Arc<dyn IAny>>;

    fn on_changed(&self) -> Arc<dyn IEvent>;

    fn is_bound(&self) -> bool;

    /// A strong reference to this property, used to hand back an owned
    /// `Arc<dyn IProperty>` from a borrowed `&dyn IProperty` (e.g. after
    /// the instance registry hands back an `Arc<dyn IInterface>` and the
    /// caller narrows it via `get_interface`). `None` if this property
    /// was never constructed through something that stamps a
    /// [`SelfRef`].
    fn self_arc(&self) -> Option<Arc<dyn IProperty>>;
}

enum State {
    Unbound,
    Bound {
        any: Arc<dyn IAny>,
        external_link: Option<(Arc<dyn IEvent>, Arc<dyn IFunction>)>,
    },
}

/// The built-in `Property` class.
pub struct Property {
    state: RwLock<State>,
    on_changed: Arc<Event>,
    self_ref: SelfRef<dyn IProperty>,
}

impl Property {
    pub fn new() -> Arc<Self> {
        let arc = Arc::new(Self {
            state: RwLock::new(State::Unbound),
            on_changed: Event::new(),
            self_ref: SelfRef::new(),
        });
        let weak = Arc::downgrade(&(arc.clone() as Arc<dyn IProperty>));
        arc.self_ref.set(weak);
        arc
    }

    pub fn bound(any: Arc<dyn IAny>) -> Arc<Self> {
        let prop = Self::new();
        prop.set_any(any);
        prop
    }

    fn fire_changed(&self) {
        let guard = self.state.read();
        if let State::Bound { any, .. } = &*guard {
            let args = [any.clone()];
            self.on_changed.call(FnArgs::new(&args));
        }
    }
}

fn wire_external_change(
    any: &Arc<dyn IAny>,
    on_changed: &Arc<Event>,
) -> Option<(Arc<dyn IEvent>, Arc<dyn IFunction>)> {
    let ext_uid = <dyn IExternalChange as InterfaceId>::UID;
    let ext_iface = any.get_interface(ext_uid)?;
    let external = ext_iface.as_external_change()?;
    let ext_event = external.on_data_changed();

    let on_changed_for_handler = on_changed.clone();
    let handler: Arc<dyn IFunction> = Function::with_callback(Arc::new(move |args| {
        on_changed_for_handler.call(args);
        None
    }));
    ext_event.add_handler(handler.clone(), InvokeType::Immediate);
    Some((ext_event, handler))
}

impl IInterface for Property {
    fn class_uid(&self) -> Uid {
        type_uid::<Property>()
    }

    fn get_interface(&self, uid: Uid) -> Option<crate::interface::InterfaceRef<'_>> {
        use crate::interface::InterfaceRef;
        if uid == <dyn IProperty as InterfaceId>::UID {
            return Some(InterfaceRef::Property(self));
        }
        None
    }
}

impl IProperty for Property {
    fn set_any(&self, any: Arc<dyn IAny>) -> ReturnValue {
        let mut guard = self.state.write();
        match &*guard {
            State::Unbound => {
                let external_link = wire_external_change(&any, &self.on_changed);
                *guard = State::Bound { any, external_link };
                ReturnValue::Success
            }
            State::Bound { any: existing, .. } => {
                if Arc::ptr_eq(existing, &any) {
                    ReturnValue::NothingToDo
                } else {
                    tracing::error!("property already bound; rejecting rebind to a different Any");
                    ReturnValue::Fail
                }
            }
        }
    }

    fn set_value(&self, from: &dyn IAny) -> ReturnValue {
        let rv = {
            let guard = self.state.read();
            let State::Bound { any, .. } = &*guard else {
                return ReturnValue::Fail;
            };
            any.copy_from(from)
        };
        if rv == ReturnValue::Success {
            self.fire_changed();
        }
        rv
    }

    fn set_data(&self, src: &[u8], type_uid: Uid) -> ReturnValue {
        let rv = {
            let guard = self.state.read();
            let State::Bound { any, .. } = &*guard else {
                return ReturnValue::Fail;
            };
            any.set_data(src, type_uid)
        };
        if rv == ReturnValue::Success {
            self.fire_changed();
        }
        rv
    }

    fn backing(&self) -> Option<Arc<dyn IAny>> {
        match &*self.state.read() {
            State::Bound { any, .. } => Some(any.clone()),
            State::Unbound => None,
        }
    }

    fn on_changed(&self) -> Arc<dyn IEvent> {
        self.on_changed.clone()
    }

    fn is_bound(&self) -> bool {
        matches!(&*self.state.read(), State::Bound { .. })
    }

    fn self_arc(&self) -> Option<Arc<dyn IProperty>> {
        self.self_ref.get()
    }
}

impl Drop for Property {
    fn drop(&mut self) {
        if let State::Bound {
            external_link: Some((ext_event, handler)),
            ..
        } = self.state.get_mut()
        {
            ext_event.remove_handler(handler);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::any::AnyValue;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn unbound_set_value_fails() {
        let p = Property::new();
        let v = AnyValue::new(1.0f32);
        assert_eq!(p.set_value(&*v), ReturnValue::Fail);
    }

    #[test]
    fn set_value_fires_on_changed_only_when_bytes_change() {
        let p = Property::bound(AnyValue::new(0.0f32));
        let fired = Arc::new(AtomicUsize::new(0));
        let f = fired.clone();
        let handler = Function::with_callback(Arc::new(move |_| {
            f.fetch_add(1, Ordering::SeqCst);
            None
        }));
        p.on_changed().add_handler(handler, InvokeType::Immediate);

        assert_eq!(p.set_value(&*AnyValue::new(3.14f32)), ReturnValue::Success);
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        assert_eq!(p.set_value(&*AnyValue::new(3.14f32)), ReturnValue::NothingToDo);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn rebinding_same_any_is_a_no_op_different_any_fails() {
        let any = AnyValue::new(1i32);
        let p = Property::bound(any.clone());
        assert_eq!(p.set_any(any), ReturnValue::NothingToDo);
        assert_eq!(p.set_any(AnyValue::new(2i32)), ReturnValue::Fail);
    }
}
