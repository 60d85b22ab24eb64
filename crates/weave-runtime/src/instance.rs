//! The registry: class factories, Any factories, the deferred queue,
//! and the plugin registry, all owned by one `Instance`.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use weave_core::prelude::*;

use crate::deferred::DeferredQueue;
use crate::logging::Logger;
use crate::plugin::PluginRegistry;

/// Produces fresh instances of one registered class.
///
/// The original object model also exposes placement-construction hooks
/// (`get_instance_size`/`construct_in_place`/...) so factories can be
/// used with hive/pool allocators. There is no safe idiomatic Rust
/// equivalent to placement-new into caller-supplied memory behind a
/// trait object, and nothing in this workspace needs one, so `create_instance`
/// simply returns a freshly heap-allocated `Arc`.
pub trait ObjectFactory: Send + Sync {
    fn class_info(&self) -> &'static ClassInfo;
    fn create_instance(&self, flags: ObjectFlags) -> Arc<dyn IInterface>;
}

type AnyFactoryFn = Arc<dyn Fn() -> Arc<dyn IAny> + Send + Sync>;

macro_rules! builtin_factory {
    ($factory:ident, $class:ty, $name:literal) => {
        struct $factory {
            info: &'static ClassInfo,
        }

        impl $factory {
            fn new() -> Self {
                static CLASS: std::sync::OnceLock<ClassInfo> = std::sync::OnceLock::new();
                let info = CLASS.get_or_init(|| ClassInfo {
                    class_uid: type_uid::<$class>(),
                    name: $name,
                    members: &[],
                });
                Self { info }
            }
        }

        impl ObjectFactory for $factory {
            fn class_info(&self) -> &'static ClassInfo {
                self.info
            }

            fn create_instance(&self, _flags: ObjectFlags) -> Arc<dyn IInterface> {
                <$class>::new() as Arc<dyn IInterface>
            }
        }
    };
}

builtin_factory!(PropertyFactory, Property, "Property");
builtin_factory!(EventFactory, Event, "Event");
builtin_factory!(FunctionFactory, Function, "Function");

/// The registry and the single entry point for creating runtime
/// objects. One `Instance` per process is the expected shape; nothing
/// prevents constructing more, but only the one installed via
/// [`Instance::init`] is reachable from `weave-core`'s `Function`/
/// `Event`/`Property` deferred-invoke and lazy-metadata paths.
pub struct Instance {
    types: RwLock<HashMap<Uid, Arc<dyn ObjectFactory>>>,
    any_factories: RwLock<HashMap<Uid, AnyFactoryFn>>,
    deferred: DeferredQueue,
    plugins: PluginRegistry,
    logger: Logger,
}

impl Instance {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            types: RwLock::new(HashMap::new()),
            any_factories: RwLock::new(HashMap::new()),
            deferred: DeferredQueue::new(),
            plugins: PluginRegistry::new(),
            logger: Logger::new(),
        })
    }

    /// Builds an `Instance`, registers the built-in classes and
    /// primitive `Any` factories, and installs it as the process-wide
    /// `weave_core::global::RuntimeApi`. Call once per process, before
    /// constructing any object or loading any plugin.
    pub fn init() -> Arc<Self> {
        let instance = Self::new();
        instance.register_builtin_any_factories();
        instance.register_builtin_types();
        weave_core::global::set_runtime_api(instance.clone() as Arc<dyn RuntimeApi>);
        instance
    }

    /// Registers `Property`, `Event` and `Function` as ordinary classes
    /// in the type registry, under their own class UIDs, so they're
    /// reachable through [`Instance::create`] exactly like any other
    /// class — the reflection layer's lazy property/event/function
    /// lookups go through this same path (see
    /// `weave_core::metadata::MetadataContainer`).
    fn register_builtin_types(&self) {
        self.register_type(Arc::new(PropertyFactory::new()));
        self.register_type(Arc::new(EventFactory::new()));
        self.register_type(Arc::new(FunctionFactory::new()));
    }

    fn register_builtin_any_factories(&self) {
        macro_rules! register_pod {
            ($($t:ty),+ $(,)?) => {
                $(
                    self.register_any_factory(type_uid::<$t>(), Arc::new(|| {
                        AnyValue::<$t>::new(<$t>::default()) as Arc<dyn IAny>
                    }));
                    self.register_any_factory(type_uid::<Vec<$t>>(), Arc::new(|| {
                        ArrayAny::<$t>::new(Vec::new()) as Arc<dyn IAny>
                    }));
                )+
            };
        }
        register_pod!(bool, i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, Uid);
        self.register_any_factory(
            type_uid::<String>(),
            Arc::new(|| crate::string_any::StringAny::new(String::new()) as Arc<dyn IAny>),
        );
    }

    fn register_any_factory(&self, type_uid: Uid, factory: AnyFactoryFn) {
        self.any_factories.write().insert(type_uid, factory);
    }

    pub fn register_type(&self, factory: Arc<dyn ObjectFactory>) -> ReturnValue {
        let class_uid = factory.class_info().class_uid;
        let mut guard = self.types.write();
        if guard.contains_key(&class_uid) {
            return ReturnValue::NothingToDo;
        }
        guard.insert(class_uid, factory);
        drop(guard);
        self.plugins.attribute_if_loading(class_uid);
        tracing::debug!(class = %class_uid, "registered type");
        ReturnValue::Success
    }

    pub fn unregister_type(&self, class_uid: Uid) -> ReturnValue {
        if self.types.write().remove(&class_uid).is_some() {
            tracing::debug!(class = %class_uid, "unregistered type");
            ReturnValue::Success
        } else {
            ReturnValue::NothingToDo
        }
    }

    pub fn create(&self, class_uid: Uid, flags: ObjectFlags) -> Option<Arc<dyn IInterface>> {
        let factory = self.types.read().get(&class_uid)?.clone();
        Some(factory.create_instance(flags))
    }

    pub fn create_any(&self, type_uid: Uid) -> Option<Arc<dyn IAny>> {
        let factory = self.any_factories.read().get(&type_uid)?.clone();
        Some(factory())
    }

    pub fn create_property(&self, type_uid: Uid, initial: Option<&dyn IAny>) -> Option<Arc<dyn IProperty>> {
        let any = self.create_any(type_uid)?;
        if let Some(initial) = initial {
            any.copy_from(initial);
        }
        let obj = self.create(weave_core::metadata::property_class_uid(), ObjectFlags::NONE)?;
        let prop = obj
            .get_interface(<dyn IProperty as InterfaceId>::UID)?
            .as_property()?
            .self_arc()?;
        prop.set_any(any);
        Some(prop)
    }

    /// Drains the deferred queue exactly once. Tasks queued while this
    /// call is running (by a handler it invokes) land on the queue for
    /// the *next* `update()`.
    pub fn update(&self) {
        self.deferred.drain_once();
    }

    pub fn log(&self) -> &Logger {
        &self.logger
    }

    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }
}

impl RuntimeApi for Instance {
    fn enqueue_deferred(&self, task: DeferredTask) {
        self.deferred.push(task);
    }

    fn create_any(&self, type_uid: Uid) -> Option<Arc<dyn IAny>> {
        Instance::create_any(self, type_uid)
    }

    fn create(&self, class_uid: Uid) -> Option<Arc<dyn IInterface>> {
        Instance::create(self, class_uid, ObjectFlags::NONE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestWidget {
        self_ref: SelfRef<dyn IInterface>,
    }

    fn widget_class_info() -> &'static ClassInfo {
        use std::sync::OnceLock;
        static CLASS: OnceLock<ClassInfo> = OnceLock::new();
        CLASS.get_or_init(|| ClassInfo {
            class_uid: type_uid::<TestWidget>(),
            name: "TestWidget",
            members: &[],
        })
    }

    struct WidgetFactory;
    impl ObjectFactory for WidgetFactory {
        fn class_info(&self) -> &'static ClassInfo {
            widget_class_info()
        }

        fn create_instance(&self, _flags: ObjectFlags) -> Arc<dyn IInterface> {
            let arc = Arc::new(TestWidget {
                self_ref: SelfRef::new(),
            });
            let weak = Arc::downgrade(&(arc.clone() as Arc<dyn IInterface>));
            arc.self_ref.set(weak);
            arc
        }
    }

    impl IInterface for TestWidget {
        fn class_uid(&self) -> Uid {
            type_uid::<TestWidget>()
        }

        fn get_interface(&self, _uid: Uid) -> Option<InterfaceRef<'_>> {
            None
        }
    }

    #[test]
    fn register_type_then_create_round_trips() {
        let instance = Instance::new();
        let class_uid = widget_class_info().class_uid;
        assert_eq!(instance.register_type(Arc::new(WidgetFactory)), ReturnValue::Success);
        assert_eq!(instance.register_type(Arc::new(WidgetFactory)), ReturnValue::NothingToDo);

        let obj = instance.create(class_uid, ObjectFlags::NONE);
        assert!(obj.is_some());
        assert_eq!(obj.unwrap().class_uid(), class_uid);
    }

    #[test]
    fn create_with_unregistered_uid_is_none() {
        let instance = Instance::new();
        assert!(instance.create(Uid::NIL, ObjectFlags::NONE).is_none());
    }

    #[test]
    fn unregister_missing_type_is_nothing_to_do() {
        let instance = Instance::new();
        assert_eq!(instance.unregister_type(Uid::NIL), ReturnValue::NothingToDo);
    }

    #[test]
    fn create_any_uses_builtin_primitive_factories() {
        let instance = Instance::new();
        instance.register_builtin_any_factories();
        let any = instance.create_any(type_uid::<i32>()).expect("i32 factory registered");
        assert_eq!(any.compatible_types(), &[type_uid::<i32>()]);
    }

    #[test]
    fn create_property_binds_and_copies_initial_value() {
        let instance = Instance::new();
        instance.register_builtin_any_factories();
        instance.register_builtin_types();
        let seed = AnyValue::new(42i32);
        let prop = instance
            .create_property(type_uid::<i32>(), Some(&*seed))
            .expect("i32 property");
        assert!(prop.is_bound());
    }

    #[test]
    fn builtin_property_event_function_are_registered_classes() {
        let instance = Instance::new();
        instance.register_builtin_types();

        let prop = instance
            .create(weave_core::metadata::property_class_uid(), ObjectFlags::NONE)
            .expect("Property must be registered as a built-in class");
        assert!(prop.get_interface(<dyn IProperty as InterfaceId>::UID).is_some());

        let event = instance
            .create(weave_core::metadata::event_class_uid(), ObjectFlags::NONE)
            .expect("Event must be registered as a built-in class");
        assert!(event.get_interface(<dyn IEvent as InterfaceId>::UID).is_some());

        let function = instance
            .create(weave_core::metadata::function_class_uid(), ObjectFlags::NONE)
            .expect("Function must be registered as a built-in class");
        assert!(function.get_interface(<dyn IFunction as InterfaceId>::UID).is_some());
    }
}
