//! Self-referencing capability for Runtime objects.
//!
//! Objects are reference counted with [`std::sync::Arc`]/[`std::sync::
//! Weak`] rather than a hand-rolled atomic pair: `Arc`'s internal
//! allocation already pairs a strong and a weak count in one control
//! block, drops the value at strong == 0 and frees the block only once
//! weak also reaches zero — exactly the lifetime the object model
//! needs (see DESIGN.md, "intrusive refcounting").
//!
//! What `Arc` does not give an object for free is a way to hand out a
//! new strong reference to itself from a plain `&self` — e.g. from
//! inside `get_interface`, where only a borrow is available. [`SelfRef`]
//! closes that gap: the instance registry stamps it once, right after
//! constructing the object, with a weak back-reference to the `Arc` it
//! just allocated.

use std::sync::{Arc, Weak};

/// A once-settable weak back-reference to the `Arc` that owns this
/// object.
///
/// Embed one as a field (typically `self_ref: SelfRef<dyn IInterface>`)
/// and call [`SelfRef::set`] exactly once, immediately after the owning
/// `Arc` is created. Every further call to `set` is ignored.
pub struct SelfRef<T: ?Sized> {
    inner: std::sync::OnceLock<Weak<T>>,
}

impl<T: ?Sized> SelfRef<T> {
    pub const fn new() -> Self {
        Self {
            inner: std::sync::OnceLock::new(),
        }
    }

    /// Stamps the back-reference. Only the first call has any effect.
    pub fn set(&self, weak: Weak<T>) {
        let _ = self.inner.set(weak);
    }

    /// Returns a new strong reference to the owning object, or `None`
    /// if `set` was never called or the object has since been dropped.
    pub fn get(&self) -> Option<Arc<T>> {
        self.inner.get()?.upgrade()
    }
}

impl<T: ?Sized> Default for SelfRef<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> std::fmt::Debug for SelfRef<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelfRef")
            .field("bound", &self.inner.get().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Marker: Send + Sync {}
    struct Thing;
    impl Marker for Thing {}

    #[test]
    fn unset_self_ref_yields_none() {
        let r: SelfRef<dyn Marker> = SelfRef::new();
        assert!(r.get().is_none());
    }

    #[test]
    fn set_self_ref_upgrades_while_strong_refs_remain() {
        let arc: Arc<dyn Marker> = Arc::new(Thing);
        let r: SelfRef<dyn Marker> = SelfRef::new();
        r.set(Arc::downgrade(&arc));
        assert!(r.get().is_some());
        drop(arc);
        assert!(r.get().is_none());
    }

    #[test]
    fn second_set_call_is_ignored() {
        let a: Arc<dyn Marker> = Arc::new(Thing);
        let b: Arc<dyn Marker> = Arc::new(Thing);
        let r: SelfRef<dyn Marker> = SelfRef::new();
        r.set(Arc::downgrade(&a));
        r.set(Arc::downgrade(&b));
        drop(b);
        // still bound to `a`, which is still alive
        assert!(r.get().is_some());
    }
}
