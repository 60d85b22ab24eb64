//! Plugin identity, the plugin registry, and the shared-library ABI.

use std::cell::Cell;
use std::collections::HashMap;
use std::ffi::c_void;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use weave_core::prelude::*;

use crate::error::{PluginError, PluginResult};
use crate::instance::Instance;

/// A loadable unit of classes. `initialize`/`shutdown` mirror the
/// registry's `register_type`/`unregister_type` pairing: whatever a
/// plugin registers during `initialize` is swept automatically on
/// unload (see [`PluginRegistry::unload_plugin`]).
pub trait Plugin: Send + Sync {
    fn class_uid(&self) -> Uid;
    fn name(&self) -> &str;

    /// Classes this plugin must be loaded after. Empty by default.
    fn depends_on(&self) -> &[Uid] {
        &[]
    }

    fn initialize(&self, instance: &Instance) -> ReturnValue;
    fn shutdown(&self, instance: &Instance);
}

struct PluginEntry {
    plugin: Arc<dyn Plugin>,
    owned_type_ids: RwLock<Vec<Uid>>,
    library: Option<libloading::Library>,
}

thread_local! {
    static CURRENT_PLUGIN: Cell<Option<Uid>> = const { Cell::new(None) };
}

/// Tracks which plugin is loaded, what each one owns, and the shared
/// library handle backing it (if any).
pub struct PluginRegistry {
    entries: RwLock<HashMap<Uid, PluginEntry>>,
    /// Insertion order, for the deterministic unload sweep.
    order: RwLock<Vec<Uid>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            order: RwLock::new(Vec::new()),
        }
    }

    /// Called by `Instance::register_type` right after a successful
    /// insert, so types registered while a plugin's `initialize` is on
    /// the call stack get attributed to that plugin.
    pub(crate) fn attribute_if_loading(&self, class_uid: Uid) {
        let Some(current) = CURRENT_PLUGIN.with(|c| c.get()) else {
            return;
        };
        if let Some(entry) = self.entries.read().get(&current) {
            entry.owned_type_ids.write().push(class_uid);
        }
    }

    pub fn load_plugin(&self, instance: &Instance, plugin: Arc<dyn Plugin>) -> ReturnValue {
        self.load_plugin_with_library(instance, plugin, None)
    }

    fn load_plugin_with_library(
        &self,
        instance: &Instance,
        plugin: Arc<dyn Plugin>,
        library: Option<libloading::Library>,
    ) -> ReturnValue {
        let class_uid = plugin.class_uid();
        if self.entries.read().contains_key(&class_uid) {
            return ReturnValue::NothingToDo;
        }

        self.entries.write().insert(
            class_uid,
            PluginEntry {
                plugin: plugin.clone(),
                owned_type_ids: RwLock::new(Vec::new()),
                library,
            },
        );

        let previous = CURRENT_PLUGIN.with(|c| c.replace(Some(class_uid)));
        let result = plugin.initialize(instance);
        CURRENT_PLUGIN.with(|c| c.set(previous));

        if weave_core::types::failed(result) {
            tracing::error!(plugin = plugin.name(), "plugin initialization failed; rolling back");
            if let Some(entry) = self.entries.write().remove(&class_uid) {
                for owned in entry.owned_type_ids.read().iter() {
                    instance.unregister_type(*owned);
                }
            }
            return result;
        }

        self.order.write().push(class_uid);
        tracing::info!(plugin = plugin.name(), "loaded plugin");
        ReturnValue::Success
    }

    /// Opens `path` as a shared library, resolves the well-known export
    /// symbol, and calls it to obtain the plugin. The library is kept
    /// alive in the registry entry until `unload_plugin`; on any
    /// failure before that point the library is closed immediately.
    pub fn load_plugin_from_path(
        &self,
        instance: &Instance,
        path: impl AsRef<Path>,
    ) -> PluginResult<ReturnValue> {
        let path = path.as_ref();
        let library = unsafe { libloading::Library::new(path) }.map_err(|source| PluginError::LibraryLoad {
            path: path.to_path_buf(),
            source,
        })?;

        let entrypoint: libloading::Symbol<unsafe extern "C" fn() -> *mut c_void> =
            unsafe { library.get(PLUGIN_ENTRYPOINT_SYMBOL) }.map_err(|source| PluginError::MissingEntrypoint {
                path: path.to_path_buf(),
                symbol: PLUGIN_ENTRYPOINT_SYMBOL_NAME,
                source,
            })?;

        let handle = unsafe { entrypoint() };
        if handle.is_null() {
            return Err(PluginError::NullEntrypoint);
        }
        let plugin = unsafe { from_entrypoint_handle(handle) };

        let result = self.load_plugin_with_library(instance, plugin, Some(library));
        Ok(result)
    }

    /// Calls `shutdown`, sweeps `owned_type_ids` in insertion order,
    /// drops the plugin, then closes the library handle last.
    pub fn unload_plugin(&self, instance: &Instance, class_uid: Uid) -> ReturnValue {
        let Some(entry) = self.entries.write().remove(&class_uid) else {
            return ReturnValue::NothingToDo;
        };
        self.order.write().retain(|u| *u != class_uid);

        entry.plugin.shutdown(instance);
        for owned in entry.owned_type_ids.read().iter() {
            instance.unregister_type(*owned);
        }
        tracing::info!(plugin = entry.plugin.name(), "unloaded plugin");

        drop(entry.plugin);
        drop(entry.library);
        ReturnValue::Success
    }

    pub fn is_loaded(&self, class_uid: Uid) -> bool {
        self.entries.read().contains_key(&class_uid)
    }

    /// Plugin load order, oldest first — the order `unload_plugin`
    /// sweeps `owned_type_ids` follows this same order per plugin.
    pub fn load_order(&self) -> Vec<Uid> {
        self.order.read().clone()
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The shared-library export symbol every plugin dylib must provide.
pub const PLUGIN_ENTRYPOINT_SYMBOL_NAME: &str = "weave_plugin_entrypoint";
pub const PLUGIN_ENTRYPOINT_SYMBOL: &[u8] = b"weave_plugin_entrypoint\0";

/// Boxes `plugin` behind an opaque handle suitable for returning from
/// an `extern "C"` entrypoint. Pairs with [`from_entrypoint_handle`].
pub fn into_entrypoint_handle(plugin: Arc<dyn Plugin>) -> *mut c_void {
    Box::into_raw(Box::new(plugin)) as *mut c_void
}

/// Reconstructs the `Arc<dyn Plugin>` boxed by [`into_entrypoint_handle`].
///
/// # Safety
/// `handle` must be a non-null pointer produced by
/// `into_entrypoint_handle` (directly, or via a `weave_plugin!`-generated
/// entrypoint) and not already reconstructed.
pub unsafe fn from_entrypoint_handle(handle: *mut c_void) -> Arc<dyn Plugin> {
    *Box::from_raw(handle as *mut Arc<dyn Plugin>)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::ObjectFactory;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct NilObject(Uid);
    impl IInterface for NilObject {
        fn class_uid(&self) -> Uid {
            self.0
        }
        fn get_interface(&self, _uid: Uid) -> Option<InterfaceRef<'_>> {
            None
        }
    }

    struct NilFactory {
        info: &'static ClassInfo,
    }

    impl NilFactory {
        fn new(uid: Uid) -> Self {
            let info: &'static ClassInfo = Box::leak(Box::new(ClassInfo {
                class_uid: uid,
                name: "nil",
                members: &[],
            }));
            Self { info }
        }
    }

    impl ObjectFactory for NilFactory {
        fn class_info(&self) -> &'static ClassInfo {
            self.info
        }

        fn create_instance(&self, _flags: ObjectFlags) -> Arc<dyn IInterface> {
            Arc::new(NilObject(self.info.class_uid))
        }
    }

    struct CountingPlugin {
        uid: Uid,
        init_calls: Arc<AtomicUsize>,
        shutdown_calls: Arc<AtomicUsize>,
        fail_init: bool,
        register: Option<Uid>,
    }

    impl Plugin for CountingPlugin {
        fn class_uid(&self) -> Uid {
            self.uid
        }

        fn name(&self) -> &str {
            "counting-plugin"
        }

        fn initialize(&self, instance: &Instance) -> ReturnValue {
            self.init_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(owned_uid) = self.register {
                instance.register_type(Arc::new(NilFactory::new(owned_uid)));
            }
            if self.fail_init {
                ReturnValue::Fail
            } else {
                ReturnValue::Success
            }
        }

        fn shutdown(&self, _instance: &Instance) {
            self.shutdown_calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn loading_the_same_class_uid_twice_is_a_no_op() {
        let instance = Instance::init();
        let uid = make_uid("test::plugin::dup");
        let plugin: Arc<dyn Plugin> = Arc::new(CountingPlugin {
            uid,
            init_calls: Arc::new(AtomicUsize::new(0)),
            shutdown_calls: Arc::new(AtomicUsize::new(0)),
            fail_init: false,
            register: None,
        });
        assert_eq!(instance.plugins().load_plugin(&instance, plugin.clone()), ReturnValue::Success);
        assert_eq!(instance.plugins().load_plugin(&instance, plugin), ReturnValue::NothingToDo);
    }

    #[test]
    fn unload_calls_shutdown_and_sweeps_owned_types() {
        let instance = Instance::init();
        let plugin_uid = make_uid("test::plugin::sweep");
        let owned_uid = make_uid("test::plugin::sweep::widget");
        let shutdown_calls = Arc::new(AtomicUsize::new(0));
        let plugin: Arc<dyn Plugin> = Arc::new(CountingPlugin {
            uid: plugin_uid,
            init_calls: Arc::new(AtomicUsize::new(0)),
            shutdown_calls: shutdown_calls.clone(),
            fail_init: false,
            register: Some(owned_uid),
        });
        instance.plugins().load_plugin(&instance, plugin);
        assert!(instance.create(owned_uid, ObjectFlags::NONE).is_some());

        assert_eq!(instance.plugins().unload_plugin(&instance, plugin_uid), ReturnValue::Success);
        assert_eq!(shutdown_calls.load(Ordering::SeqCst), 1);
        assert!(instance.create(owned_uid, ObjectFlags::NONE).is_none());
    }

    #[test]
    fn load_plugin_from_path_rejects_a_file_that_is_not_a_shared_library() {
        let instance = Instance::init();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not_a_library.so");
        std::fs::write(&path, b"not an ELF/Mach-O/PE image").unwrap();

        let err = instance
            .plugins()
            .load_plugin_from_path(&instance, &path)
            .expect_err("garbage file must not load as a shared library");
        assert!(matches!(err, PluginError::LibraryLoad { .. }));
    }

    #[test]
    fn failed_init_rolls_back_attributed_types() {
        let instance = Instance::init();
        let plugin_uid = make_uid("test::plugin::rollback");
        let owned_uid = make_uid("test::plugin::rollback::widget");
        let plugin: Arc<dyn Plugin> = Arc::new(CountingPlugin {
            uid: plugin_uid,
            init_calls: Arc::new(AtomicUsize::new(0)),
            shutdown_calls: Arc::new(AtomicUsize::new(0)),
            fail_init: true,
            register: Some(owned_uid),
        });
        let rv = instance.plugins().load_plugin(&instance, plugin);
        assert_eq!(rv, ReturnValue::Fail);
        assert!(!instance.plugins().is_loaded(plugin_uid));
        assert!(instance.create(owned_uid, ObjectFlags::NONE).is_none());
    }
}
