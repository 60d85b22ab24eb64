//! `Any` for `String`, registered as one of the built-in primitive
//! types. `String` is not `bytemuck::Pod` (it owns a heap allocation),
//! so it cannot use `weave_core::any::AnyValue` and gets a small
//! hand-written `IAny` instead, following the same byte-buffer
//! contract.

use std::sync::Arc;

use parking_lot::RwLock;

use weave_core::prelude::*;

pub struct StringAny {
    value: RwLock<String>,
    compatible: Vec<Uid>,
}

impl StringAny {
    pub fn new(value: String) -> Arc<Self> {
        Arc::new(Self {
            value: RwLock::new(value),
            compatible: vec![type_uid::<String>()],
        })
    }

    pub fn get(&self) -> String {
        self.value.read().clone()
    }
}

impl IInterface for StringAny {
    fn class_uid(&self) -> Uid {
        type_uid::<Self>()
    }

    fn get_interface(&self, uid: Uid) -> Option<InterfaceRef<'_>> {
        if uid == <dyn IAny as InterfaceId>::UID {
            return Some(InterfaceRef::Any(self));
        }
        None
    }
}

impl IAny for StringAny {
    fn compatible_types(&self) -> &[Uid] {
        &self.compatible
    }

    fn data_size(&self, type_uid: Uid) -> Option<usize> {
        self.compatible
            .contains(&type_uid)
            .then(|| self.value.read().len())
    }

    fn get_data(&self, dst: &mut [u8], type_uid: Uid) -> ReturnValue {
        if !self.compatible.contains(&type_uid) {
            return ReturnValue::Fail;
        }
        let guard = self.value.read();
        if dst.len() != guard.len() {
            return ReturnValue::Fail;
        }
        dst.copy_from_slice(guard.as_bytes());
        ReturnValue::Success
    }

    fn set_data(&self, src: &[u8], type_uid: Uid) -> ReturnValue {
        if !self.compatible.contains(&type_uid) {
            return ReturnValue::Fail;
        }
        let Ok(text) = std::str::from_utf8(src) else {
            return ReturnValue::Fail;
        };
        let mut guard = self.value.write();
        if guard.as_str() == text {
            return ReturnValue::NothingToDo;
        }
        *guard = text.to_string();
        ReturnValue::Success
    }

    fn copy_from(&self, other: &dyn IAny) -> ReturnValue {
        let Some(shared) = self
            .compatible
            .iter()
            .find(|u| other.compatible_types().contains(u))
            .copied()
        else {
            return ReturnValue::Fail;
        };
        let Some(size) = other.data_size(shared) else {
            return ReturnValue::Fail;
        };
        let mut buf = vec![0u8; size];
        let rv = other.get_data(&mut buf, shared);
        if !succeeded(rv) {
            return rv;
        }
        self.set_data(&buf, shared)
    }

    fn clone_any(&self) -> Arc<dyn IAny> {
        StringAny::new(self.value.read().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_utf8_text() {
        let any = StringAny::new("hello".to_string());
        let uid = type_uid::<String>();
        let mut buf = vec![0u8; 5];
        assert_eq!(any.get_data(&mut buf, uid), ReturnValue::Success);
        assert_eq!(buf, b"hello");
    }

    #[test]
    fn set_data_rejects_invalid_utf8() {
        let any = StringAny::new(String::new());
        let uid = type_uid::<String>();
        assert_eq!(any.set_data(&[0xff, 0xfe], uid), ReturnValue::Fail);
    }

    #[test]
    fn setting_the_same_text_is_a_no_op() {
        let any = StringAny::new("x".to_string());
        let uid = type_uid::<String>();
        assert_eq!(any.set_data(b"x", uid), ReturnValue::NothingToDo);
        assert_eq!(any.set_data(b"y", uid), ReturnValue::Success);
    }
}
