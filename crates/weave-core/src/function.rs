//! Invocable objects: either a raw native callback or a bound
//! trampoline over an owned context, called synchronously or queued
//! onto the owning instance's deferred task queue.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::any::IAny;
use crate::global::{self, DeferredTask};
use crate::interface::IInterface;
use crate::rc::SelfRef;
use crate::types::InvokeType;
use crate::uid::{type_uid, Uid};

/// A non-owning, bounds-checked view of call arguments.
///
/// Indexing never panics: an out-of-range index returns `None`, not a
/// fault, so a handler written against an older member list degrades
/// gracefully against a newer one.
#[derive(Clone, Copy)]
pub struct FnArgs<'a> {
    items: &'a [Arc<dyn IAny>],
}

impl<'a> FnArgs<'a> {
    pub const fn new(items: &'a [Arc<dyn IAny>]) -> Self {
        Self { items }
    }

    pub const fn empty() -> Self {
        Self { items: &[] }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&'a dyn IAny> {
        self.items.get(index).map(|a| a.as_ref())
    }
}

/// A native callback or bound trampoline: `(args) -> Option<result>`.
pub type NativeCallback = Arc<dyn Fn(FnArgs<'_>) -> Option<Arc<dyn IAny>> + Send + Sync>;

/// Invocable object. [`Event`](crate::event::Event) is also an
/// `IFunction` — invoking it dispatches to its handler lists instead
/// of a single callback.
pub trait IFunction: IInterface {
    /// Calls the function synchronously, bypassing any deferral.
    /// `invoke` with [`InvokeType::Immediate`] is just `call`; the
    /// distinction exists so [`crate::event::Event`] can call deferred
    /// handlers' `call` directly from inside its own dispatch loop
    /// without re-deferring them twice.
    fn call(&self, args: FnArgs<'_>) -> Option<Arc<dyn IAny>>;

    /// A strong reference to this function, used to keep it alive for
    /// the duration of a queued deferred task. `None` if the function
    /// was never constructed through something that stamps a
    /// [`SelfRef`], in which case deferred invocation degrades to a
    /// no-op (logged).
    fn self_arc(&self) -> Option<Arc<dyn IFunction>>;

    /// Invokes the function either synchronously or by deferring onto
    /// the instance's task queue.
    fn invoke(&self, args: FnArgs<'_>, invoke_type: InvokeType) -> Option<Arc<dyn IAny>> {
        match invoke_type {
            InvokeType::Immediate => self.call(args),
            InvokeType::Deferred => {
                let Some(me) = self.self_arc() else {
                    tracing::warn!("deferred invoke on a function with no self reference; dropping call");
                    return None;
                };
                let Some(api) = global::runtime_api() else {
                    tracing::warn!("deferred invoke before the runtime API was installed; dropping call");
                    return None;
                };
                let cloned_args = (0..args.len())
                    .filter_map(|i| args.get(i))
                    .map(|a| a.clone_any())
                    .collect();
                api.enqueue_deferred(DeferredTask {
                    function: me,
                    args: cloned_args,
                });
                None
            }
        }
    }
}

/// The built-in `Function` class: an explicit callback takes priority
/// over a bound trampoline when both are set.
pub struct Function {
    explicit_callback: RwLock<Option<NativeCallback>>,
    bound_trampoline: RwLock<Option<NativeCallback>>,
    self_ref: SelfRef<dyn IFunction>,
}

impl Function {
    pub fn new() -> Arc<Self> {
        let arc = Arc::new(Self {
            explicit_callback: RwLock::new(None),
            bound_trampoline: RwLock::new(None),
            self_ref: SelfRef::new(),
        });
        let weak = Arc::downgrade(&(arc.clone() as Arc<dyn IFunction>));
        arc.self_ref.set(weak);
        arc
    }

    pub fn with_callback(cb: NativeCallback) -> Arc<Self> {
        let f = Self::new();
        f.set_invoke_callback(cb);
        f
    }

    /// Sets the explicit callback. Takes priority over a bound
    /// trampoline if one is also set.
    pub fn set_invoke_callback(&self, cb: NativeCallback) {
        *self.explicit_callback.write() = Some(cb);
    }

    /// Sets a bound trampoline. `trampoline` owns whatever context it
    /// closes over; there is no separate context/deleter pair to wire
    /// up, since a Rust closure's captures already are that owned
    /// context.
    pub fn bind(&self, trampoline: NativeCallback) {
        *self.bound_trampoline.write() = Some(trampoline);
    }

    pub fn has_callback(&self) -> bool {
        self.explicit_callback.read().is_some() || self.bound_trampoline.read().is_some()
    }
}

impl IInterface for Function {
    fn class_uid(&self) -> Uid {
        type_uid::<Function>()
    }

    fn get_interface(&self, uid: Uid) -> Option<crate::interface::InterfaceRef<'_>> {
        use crate::interface::{InterfaceId, InterfaceRef};
        if uid == <dyn IFunction as InterfaceId>::UID {
            return Some(InterfaceRef::Function(self));
        }
        None
    }
}

impl IFunction for Function {
    fn call(&self, args: FnArgs<'_>) -> Option<Arc<dyn IAny>> {
        if let Some(cb) = self.explicit_callback.read().clone() {
            return cb(args);
        }
        if let Some(cb) = self.bound_trampoline.read().clone() {
            return cb(args);
        }
        None
    }

    fn self_arc(&self) -> Option<Arc<dyn IFunction>> {
        self.self_ref.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::any::AnyValue;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn fn_args_indexing_is_bounds_checked() {
        let a: Arc<dyn IAny> = AnyValue::new(1i32);
        let items = vec![a];
        let args = FnArgs::new(&items);
        assert!(args.get(0).is_some());
        assert!(args.get(1).is_none());
    }

    #[test]
    fn explicit_callback_wins_over_bound_trampoline() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c1 = calls.clone();
        let c2 = calls.clone();
        let f = Function::new();
        f.bind(Arc::new(move |_| {
            c2.fetch_add(10, Ordering::SeqCst);
            None
        }));
        f.set_invoke_callback(Arc::new(move |_| {
            c1.fetch_add(1, Ordering::SeqCst);
            None
        }));
        f.call(FnArgs::empty());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn immediate_invoke_calls_synchronously() {
        let called = Arc::new(AtomicUsize::new(0));
        let c = called.clone();
        let f = Function::with_callback(Arc::new(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            None
        }));
        f.invoke(FnArgs::empty(), InvokeType::Immediate);
        assert_eq!(called.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn deferred_invoke_without_runtime_api_is_a_dropped_noop() {
        let called = Arc::new(AtomicUsize::new(0));
        let c = called.clone();
        let f = Function::with_callback(Arc::new(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            None
        }));
        f.invoke(FnArgs::empty(), InvokeType::Deferred);
        assert_eq!(called.load(Ordering::SeqCst), 0);
    }
}
