//! Multicast invocation over two ordered handler lists.
//!
//! An event IS a function: invoking it with [`InvokeType::Immediate`]
//! runs immediate handlers synchronously and queues deferred handlers;
//! invoking it with [`InvokeType::Deferred`] re-queues the entire
//! dispatch as one task (via [`IFunction`]'s default `invoke`, since
//! `call` below is exactly the dispatch logic that task ends up
//! running).

use std::sync::Arc;

use parking_lot::RwLock;

use crate::any::IAny;
use crate::function::{FnArgs, IFunction};
use crate::interface::IInterface;
use crate::rc::SelfRef;
use crate::types::{InvokeType, ReturnValue};
use crate::uid::{type_uid, Uid};

/// Multicast capability layered on top of [`IFunction`].
pub trait IEvent: IFunction {
    /// Appends `handler` to the immediate or deferred list. A handler
    /// already present (by pointer identity) is left alone and this
    /// returns [`ReturnValue::NothingToDo`].
    fn add_handler(&self, handler: Arc<dyn IFunction>, invoke_type: InvokeType) -> ReturnValue;

    /// Removes `handler` from whichever list contains it.
    fn remove_handler(&self, handler: &Arc<dyn IFunction>) -> ReturnValue;

    fn has_handlers(&self) -> bool;

    /// A strong reference to this event, for callers that only have a
    /// borrowed `&dyn IEvent` (e.g. narrowed from an `Arc<dyn IInterface>`
    /// handed back by the instance registry). `None` if this event was
    /// never constructed through something that stamps a [`SelfRef`].
    fn self_arc(&self) -> Option<Arc<dyn IEvent>>;
}

/// The built-in `Event` class.
pub struct Event {
    immediate: RwLock<Vec<Arc<dyn IFunction>>>,
    deferred: RwLock<Vec<Arc<dyn IFunction>>>,
    self_ref: SelfRef<dyn IEvent>,
}

impl Event {
    pub fn new() -> Arc<Self> {
        let arc = Arc::new(Self {
            immediate: RwLock::new(Vec::new()),
            deferred: RwLock::new(Vec::new()),
            self_ref: SelfRef::new(),
        });
        let weak = Arc::downgrade(&(arc.clone() as Arc<dyn IEvent>));
        arc.self_ref.set(weak);
        arc
    }

    fn dispatch_list(&self, list: &RwLock<Vec<Arc<dyn IFunction>>>, args: FnArgs<'_>, deferred: bool) {
        // Snapshot caps which handlers are eligible for this dispatch,
        // so handlers added mid-dispatch never fire in it. Re-checking
        // live presence before each call lets a removal that happens
        // before a handler is visited take effect for this dispatch too.
        let snapshot = list.read().clone();
        for handler in snapshot {
            let still_present = list.read().iter().any(|h| Arc::ptr_eq(h, &handler));
            if !still_present {
                continue;
            }
            if deferred {
                handler.invoke(args, InvokeType::Deferred);
            } else {
                handler.call(args);
            }
        }
    }
}

impl IInterface for Event {
    fn class_uid(&self) -> Uid {
        type_uid::<Event>()
    }

    fn get_interface(&self, uid: Uid) -> Option<crate::interface::InterfaceRef<'_>> {
        use crate::interface::{InterfaceId, InterfaceRef};
        if uid == <dyn IEvent as InterfaceId>::UID {
            return Some(InterfaceRef::Event(self));
        }
        if uid == <dyn IFunction as InterfaceId>::UID {
            return Some(InterfaceRef::Function(self));
        }
        None
    }
}

impl IFunction for Event {
    fn call(&self, args: FnArgs<'_>) -> Option<Arc<dyn IAny>> {
        self.dispatch_list(&self.immediate, args, false);
        self.dispatch_list(&self.deferred, args, true);
        None
    }

    fn self_arc(&self) -> Option<Arc<dyn IFunction>> {
        self.self_ref.get().map(|e| e as Arc<dyn IFunction>)
    }
}

impl IEvent for Event {
    fn add_handler(&self, handler: Arc<dyn IFunction>, invoke_type: InvokeType) -> ReturnValue {
        let list = match invoke_type {
            InvokeType::Immediate => &self.immediate,
            InvokeType::Deferred => &self.deferred,
        };
        let mut guard = list.write();
        if guard.iter().any(|h| Arc::ptr_eq(h, &handler)) {
            return ReturnValue::NothingToDo;
        }
        guard.push(handler);
        ReturnValue::Success
    }

    fn remove_handler(&self, handler: &Arc<dyn IFunction>) -> ReturnValue {
        for list in [&self.immediate, &self.deferred] {
            let mut guard = list.write();
            if let Some(pos) = guard.iter().position(|h| Arc::ptr_eq(h, handler)) {
                guard.remove(pos);
                return ReturnValue::Success;
            }
        }
        ReturnValue::NothingToDo
    }

    fn has_handlers(&self) -> bool {
        !self.immediate.read().is_empty() || !self.deferred.read().is_empty()
    }

    fn self_arc(&self) -> Option<Arc<dyn IEvent>> {
        self.self_ref.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn recording_handler(order: Arc<RwLock<Vec<&'static str>>>, name: &'static str) -> Arc<dyn IFunction> {
        crate::function::Function::with_callback(Arc::new(move |_| {
            order.write().push(name);
            None
        }))
    }

    #[test]
    fn adding_the_same_handler_twice_is_a_no_op() {
        let event = Event::new();
        let order = Arc::new(RwLock::new(Vec::new()));
        let h = recording_handler(order, "h");
        assert_eq!(event.add_handler(h.clone(), InvokeType::Immediate), ReturnValue::Success);
        assert_eq!(event.add_handler(h.clone(), InvokeType::Immediate), ReturnValue::NothingToDo);
        assert_eq!(event.immediate.read().len(), 1);
    }

    #[test]
    fn remove_handler_removes_exactly_one() {
        let event = Event::new();
        let order = Arc::new(RwLock::new(Vec::new()));
        let h = recording_handler(order, "h");
        event.add_handler(h.clone(), InvokeType::Immediate);
        assert_eq!(event.remove_handler(&h), ReturnValue::Success);
        assert_eq!(event.remove_handler(&h), ReturnValue::NothingToDo);
    }

    #[test]
    fn handlers_fire_in_insertion_order() {
        let event = Event::new();
        let order = Arc::new(RwLock::new(Vec::new()));
        event.add_handler(recording_handler(order.clone(), "first"), InvokeType::Immediate);
        event.add_handler(recording_handler(order.clone(), "second"), InvokeType::Immediate);
        event.add_handler(recording_handler(order.clone(), "third"), InvokeType::Immediate);
        event.call(FnArgs::empty());
        assert_eq!(*order.read(), vec!["first", "second", "third"]);
    }

    #[test]
    fn handler_removing_a_later_handler_mid_dispatch_skips_it() {
        let event = Event::new();
        let order = Arc::new(RwLock::new(Vec::new()));

        let h3 = recording_handler(order.clone(), "h3");
        let h3_for_removal = h3.clone();
        let event_for_removal = event.clone();
        let h2 = crate::function::Function::with_callback({
            let order = order.clone();
            Arc::new(move |_| {
                order.write().push("h2");
                event_for_removal.remove_handler(&h3_for_removal);
                None
            })
        });
        let h1 = recording_handler(order.clone(), "h1");

        event.add_handler(h1, InvokeType::Immediate);
        event.add_handler(h2, InvokeType::Immediate);
        event.add_handler(h3, InvokeType::Immediate);

        event.call(FnArgs::empty());
        assert_eq!(*order.read(), vec!["h1", "h2"]);

        order.write().clear();
        event.call(FnArgs::empty());
        assert_eq!(*order.read(), vec!["h1", "h2"]);
    }

    #[test]
    fn deferred_handler_list_is_not_called_synchronously() {
        let event = Event::new();
        let called = Arc::new(AtomicUsize::new(0));
        let c = called.clone();
        let handler = crate::function::Function::with_callback(Arc::new(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            None
        }));
        event.add_handler(handler, InvokeType::Deferred);
        // No runtime API installed in this test binary: the deferred
        // queue attempt logs and drops, but must not call synchronously.
        event.call(FnArgs::empty());
        assert_eq!(called.load(Ordering::SeqCst), 0);
    }
}
