//! Type-erased value containers.
//!
//! An [`IAny`] holds exactly one value of one of a small, fixed set of
//! "compatible" types and exposes it only through byte buffers, so
//! callers on either side of a plugin boundary never need to agree on
//! a concrete Rust type — only on a [`Uid`].

use std::sync::Arc;

use parking_lot::RwLock;

use crate::interface::IInterface;
use crate::types::ReturnValue;
use crate::uid::{type_uid, Uid};

/// Type-erased storage and byte-level accessors for a single value.
///
/// `get_data`/`set_data` are intentionally not synchronized against
/// each other at the object-model level: serializing operations on a
/// single object across threads is the caller's responsibility. The
/// `RwLock` inside [`AnyValue`] exists purely to keep them memory-safe,
/// not to give them any cross-thread ordering guarantee.
pub trait IAny: IInterface {
    /// UIDs this value can be read or written as, most-specific first.
    /// `copy_from` and `set_data` use the first entry in this list that
    /// the other side also advertises.
    fn compatible_types(&self) -> &[Uid];

    /// Size in bytes of the underlying value when represented as
    /// `type_uid`, or `None` if `type_uid` is not compatible.
    fn data_size(&self, type_uid: Uid) -> Option<usize>;

    /// Copies the value into `dst` as `type_uid`.
    ///
    /// Fails with [`ReturnValue::Fail`] if `type_uid` is not compatible
    /// or `dst.len()` does not match [`IAny::data_size`].
    fn get_data(&self, dst: &mut [u8], type_uid: Uid) -> ReturnValue;

    /// Overwrites the value from `src`, interpreted as `type_uid`.
    ///
    /// Returns [`ReturnValue::NothingToDo`] if `src` is byte-identical
    /// to the current value, so callers can distinguish a no-op write
    /// from one that actually changed something (used by
    /// [`crate::property::Property`] to decide whether to fire
    /// `on_changed`).
    fn set_data(&self, src: &[u8], type_uid: Uid) -> ReturnValue;

    /// Copies `other`'s value into `self`, picking the first mutually
    /// compatible type from `self.compatible_types()`.
    fn copy_from(&self, other: &dyn IAny) -> ReturnValue;

    /// Produces a new, independent `IAny` holding a copy of the same
    /// value.
    fn clone_any(&self) -> Arc<dyn IAny>;
}

fn first_shared_type(mine: &[Uid], theirs: &[Uid]) -> Option<Uid> {
    mine.iter().find(|u| theirs.contains(u)).copied()
}

/// Optional capability an [`IAny`] may additionally implement: it
/// fires `on_data_changed` whenever its value changes for a reason
/// other than a direct `set_data`/`set_value` call (e.g. a computed or
/// hardware-backed value). A [`crate::property::Property`] that binds
/// such an Any wires this event to its own `on_changed`.
pub trait IExternalChange: IInterface {
    fn on_data_changed(&self) -> Arc<dyn crate::event::IEvent>;
}

/// An `IAny` holding a single `Copy` value, by far the common case
/// (numbers, bools, small PODs).
pub struct AnyValue<T: bytemuck::Pod + Send + Sync + 'static> {
    value: RwLock<T>,
    compatible: Vec<Uid>,
}

impl<T: bytemuck::Pod + Send + Sync + 'static> AnyValue<T> {
    pub fn new(value: T) -> Arc<Self> {
        Arc::new(Self {
            value: RwLock::new(value),
            compatible: vec![type_uid::<T>()],
        })
    }

    pub fn get(&self) -> T {
        *self.value.read()
    }

    pub fn set(&self, value: T) -> ReturnValue {
        let mut guard = self.value.write();
        if bytemuck::bytes_of(&*guard) == bytemuck::bytes_of(&value) {
            return ReturnValue::NothingToDo;
        }
        *guard = value;
        ReturnValue::Success
    }
}

impl<T: bytemuck::Pod + Send + Sync + 'static> IInterface for AnyValue<T> {
    fn class_uid(&self) -> Uid {
        type_uid::<Self>()
    }

    fn get_interface(&self, uid: Uid) -> Option<crate::interface::InterfaceRef<'_>> {
        use crate::interface::{InterfaceId, InterfaceRef};
        if uid == <dyn IAny as InterfaceId>::UID {
            return Some(InterfaceRef::Any(self));
        }
        None
    }
}

impl<T: bytemuck::Pod + Send + Sync + 'static> IAny for AnyValue<T> {
    fn compatible_types(&self) -> &[Uid] {
        &self.compatible
    }

    fn data_size(&self, type_uid: Uid) -> Option<usize> {
        self.compatible
            .contains(&type_uid)
            .then(|| std::mem::size_of::<T>())
    }

    fn get_data(&self, dst: &mut [u8], type_uid: Uid) -> ReturnValue {
        if !self.compatible.contains(&type_uid) || dst.len() != std::mem::size_of::<T>() {
            return ReturnValue::Fail;
        }
        dst.copy_from_slice(bytemuck::bytes_of(&*self.value.read()));
        ReturnValue::Success
    }

    fn set_data(&self, src: &[u8], type_uid: Uid) -> ReturnValue {
        if !self.compatible.contains(&type_uid) || src.len() != std::mem::size_of::<T>() {
            return ReturnValue::Fail;
        }
        let mut guard = self.value.write();
        if bytemuck::bytes_of(&*guard) == src {
            return ReturnValue::NothingToDo;
        }
        *guard = *bytemuck::from_bytes::<T>(src);
        ReturnValue::Success
    }

    fn copy_from(&self, other: &dyn IAny) -> ReturnValue {
        let Some(shared) = first_shared_type(&self.compatible, other.compatible_types()) else {
            return ReturnValue::Fail;
        };
        let size = other.data_size(shared).unwrap_or(std::mem::size_of::<T>());
        let mut buf = vec![0u8; size];
        let rv = other.get_data(&mut buf, shared);
        if !crate::types::succeeded(rv) {
            return rv;
        }
        self.set_data(&buf, shared)
    }

    fn clone_any(&self) -> Arc<dyn IAny> {
        AnyValue::new(*self.value.read())
    }
}

/// An `IAny` holding a homogeneous run of `Copy` values. Indexing is by
/// byte offset, not by element, so the same `get_data`/`set_data`
/// contract covers both scalar and array values.
pub struct ArrayAny<T: bytemuck::Pod + Send + Sync + 'static> {
    values: RwLock<Vec<T>>,
    compatible: Vec<Uid>,
}

impl<T: bytemuck::Pod + Send + Sync + 'static> ArrayAny<T> {
    pub fn new(values: Vec<T>) -> Arc<Self> {
        Arc::new(Self {
            values: RwLock::new(values),
            compatible: vec![type_uid::<Vec<T>>()],
        })
    }

    pub fn get(&self) -> Vec<T> {
        self.values.read().clone()
    }

    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of elements. Byte-level `data_size`/`get_data`/`set_data`
    /// still operate in bytes; this is the element-count view
    /// `IArrayAny` adds on top.
    pub fn array_size(&self) -> usize {
        self.len()
    }

    /// Reads the element at `index` into `dst`, which must be exactly
    /// `size_of::<T>()` bytes. Fails if `index` is out of range or
    /// `dst` is the wrong size.
    pub fn get_at(&self, index: usize, dst: &mut [u8]) -> ReturnValue {
        if dst.len() != std::mem::size_of::<T>() {
            return ReturnValue::Fail;
        }
        let guard = self.values.read();
        let Some(value) = guard.get(index) else {
            return ReturnValue::Fail;
        };
        dst.copy_from_slice(bytemuck::bytes_of(value));
        ReturnValue::Success
    }

    /// Overwrites the element at `index` from `src`. `NothingToDo` if
    /// the bytes are unchanged, `Fail` if `index` is out of range or
    /// `src` is the wrong size.
    pub fn set_at(&self, index: usize, src: &[u8]) -> ReturnValue {
        if src.len() != std::mem::size_of::<T>() {
            return ReturnValue::Fail;
        }
        let value = *bytemuck::from_bytes::<T>(src);
        let mut guard = self.values.write();
        let Some(slot) = guard.get_mut(index) else {
            return ReturnValue::Fail;
        };
        if bytemuck::bytes_of(slot) == bytemuck::bytes_of(&value) {
            return ReturnValue::NothingToDo;
        }
        *slot = value;
        ReturnValue::Success
    }

    /// Appends `src` as a new element. Fails if `src` is the wrong size.
    pub fn push_back(&self, src: &[u8]) -> ReturnValue {
        if src.len() != std::mem::size_of::<T>() {
            return ReturnValue::Fail;
        }
        self.values.write().push(*bytemuck::from_bytes::<T>(src));
        ReturnValue::Success
    }

    /// Removes the element at `index`, shifting later elements down.
    /// Fails if `index` is out of range.
    pub fn erase_at(&self, index: usize) -> ReturnValue {
        let mut guard = self.values.write();
        if index >= guard.len() {
            return ReturnValue::Fail;
        }
        guard.remove(index);
        ReturnValue::Success
    }

    /// Removes every element.
    pub fn clear_array(&self) {
        self.values.write().clear();
    }

    /// Bulk-replaces the contents from a raw element buffer. `count`
    /// must match `data.len() / size_of::<T>()` and `element_type` must
    /// be this array's element `type_uid`; either mismatch fails.
    pub fn set_from_buffer(&self, data: &[u8], count: usize, element_type: Uid) -> ReturnValue {
        if element_type != type_uid::<T>() || data.len() != count * std::mem::size_of::<T>() {
            return ReturnValue::Fail;
        }
        let incoming: &[T] = bytemuck::cast_slice(data);
        let mut guard = self.values.write();
        if guard.as_slice() == incoming {
            return ReturnValue::NothingToDo;
        }
        guard.clear();
        guard.extend_from_slice(incoming);
        ReturnValue::Success
    }
}

impl<T: bytemuck::Pod + Send + Sync + 'static> IInterface for ArrayAny<T> {
    fn class_uid(&self) -> Uid {
        type_uid::<Self>()
    }

    fn get_interface(&self, uid: Uid) -> Option<crate::interface::InterfaceRef<'_>> {
        use crate::interface::{InterfaceId, InterfaceRef};
        if uid == <dyn IAny as InterfaceId>::UID {
            return Some(InterfaceRef::Any(self));
        }
        None
    }
}

impl<T: bytemuck::Pod + Send + Sync + 'static> IAny for ArrayAny<T> {
    fn compatible_types(&self) -> &[Uid] {
        &self.compatible
    }

    fn data_size(&self, type_uid: Uid) -> Option<usize> {
        self.compatible
            .contains(&type_uid)
            .then(|| self.values.read().len() * std::mem::size_of::<T>())
    }

    fn get_data(&self, dst: &mut [u8], type_uid: Uid) -> ReturnValue {
        if !self.compatible.contains(&type_uid) {
            return ReturnValue::Fail;
        }
        let guard = self.values.read();
        let bytes = bytemuck::cast_slice::<T, u8>(&guard);
        if dst.len() != bytes.len() {
            return ReturnValue::Fail;
        }
        dst.copy_from_slice(bytes);
        ReturnValue::Success
    }

    fn set_data(&self, src: &[u8], type_uid: Uid) -> ReturnValue {
        if !self.compatible.contains(&type_uid) || src.len() % std::mem::size_of::<T>() != 0 {
            return ReturnValue::Fail;
        }
        let incoming: &[T] = bytemuck::cast_slice(src);
        let mut guard = self.values.write();
        if guard.as_slice() == incoming {
            return ReturnValue::NothingToDo;
        }
        guard.clear();
        guard.extend_from_slice(incoming);
        ReturnValue::Success
    }

    fn copy_from(&self, other: &dyn IAny) -> ReturnValue {
        let Some(shared) = first_shared_type(&self.compatible, other.compatible_types()) else {
            return ReturnValue::Fail;
        };
        let Some(size) = other.data_size(shared) else {
            return ReturnValue::Fail;
        };
        let mut buf = vec![0u8; size];
        let rv = other.get_data(&mut buf, shared);
        if !crate::types::succeeded(rv) {
            return rv;
        }
        self.set_data(&buf, shared)
    }

    fn clone_any(&self) -> Arc<dyn IAny> {
        ArrayAny::new(self.values.read().clone())
    }
}
