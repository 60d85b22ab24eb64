//! A loadable demo plugin: a `Counter` widget (one property, one
//! function, one event) plus a second, in-process plugin that the
//! host plugin loads from inside its own `initialize`, exercising the
//! nested-load/ownership-sweep path of the plugin registry.

use std::sync::Arc;

use weave_core::prelude::*;
use weave_macros::{weave_plugin, Interfaces};
use weave_runtime::instance::{Instance, ObjectFactory};
use weave_runtime::plugin::Plugin;

/// `count`: the current value. `increment`: adds one and fires
/// `incremented`. `incremented` is just `count`'s own `on_changed`
/// event, not a separate notification.
///
/// The `count`/`incremented`/`increment` fields below are unused at
/// runtime; their only job is telling `#[derive(Interfaces)]` each
/// member's name and value type for the generated `ClassInfo`. The
/// live state lives in `count_any`/`count_property`/`increment_fn`.
#[derive(Interfaces)]
#[interfaces(IMetadata)]
pub struct Counter {
    #[member(property)]
    #[allow(dead_code)]
    count: i32,
    #[member(event)]
    #[allow(dead_code)]
    incremented: (),
    #[member(function)]
    #[allow(dead_code)]
    increment: (),

    count_any: Arc<AnyValue<i32>>,
    count_property: Arc<Property>,
    increment_fn: Arc<Function>,
}

impl Counter {
    fn new() -> Arc<Self> {
        let count_any = AnyValue::new(0i32);
        let count_property = Property::bound(count_any.clone() as Arc<dyn IAny>);
        let increment_fn = Function::new();

        let any_for_callback = count_any.clone();
        let property_for_callback = count_property.clone();
        increment_fn.set_invoke_callback(Arc::new(move |_args| {
            let next = any_for_callback.get() + 1;
            property_for_callback.set_value(&*AnyValue::new(next));
            None
        }));

        Arc::new(Self {
            count: 0,
            incremented: (),
            increment: (),
            count_any,
            count_property,
            increment_fn,
        })
    }
}

impl IMetadata for Counter {
    fn class_info(&self) -> &'static ClassInfo {
        Self::class_info()
    }

    fn get_property(&self, name: &str) -> Option<Arc<dyn IProperty>> {
        (name == "count").then(|| self.count_property.clone() as Arc<dyn IProperty>)
    }

    fn get_event(&self, name: &str) -> Option<Arc<dyn IEvent>> {
        (name == "incremented").then(|| self.count_property.on_changed())
    }

    fn get_function(&self, name: &str) -> Option<Arc<dyn IFunction>> {
        (name == "increment").then(|| self.increment_fn.clone() as Arc<dyn IFunction>)
    }
}

struct CounterFactory;

impl ObjectFactory for CounterFactory {
    fn class_info(&self) -> &'static ClassInfo {
        Counter::class_info()
    }

    fn create_instance(&self, _flags: ObjectFlags) -> Arc<dyn IInterface> {
        Counter::new()
    }
}

/// Registered by [`TickerPlugin`], loaded from inside [`CounterPlugin::initialize`]
/// rather than by the host. Has no members of its own; it exists to
/// exercise a plugin loading another plugin and the deterministic
/// unload sweep that follows.
struct Ticker;

impl IInterface for Ticker {
    fn class_uid(&self) -> Uid {
        type_uid::<Ticker>()
    }

    fn get_interface(&self, _uid: Uid) -> Option<InterfaceRef<'_>> {
        None
    }
}

struct TickerFactory;

impl ObjectFactory for TickerFactory {
    fn class_info(&self) -> &'static ClassInfo {
        use std::sync::OnceLock;
        static CLASS: OnceLock<ClassInfo> = OnceLock::new();
        CLASS.get_or_init(|| ClassInfo {
            class_uid: type_uid::<Ticker>(),
            name: "Ticker",
            members: &[],
        })
    }

    fn create_instance(&self, _flags: ObjectFlags) -> Arc<dyn IInterface> {
        Arc::new(Ticker)
    }
}

pub struct TickerPlugin;

impl Plugin for TickerPlugin {
    fn class_uid(&self) -> Uid {
        make_uid("demo::counter_plugin::TickerPlugin")
    }

    fn name(&self) -> &str {
        "ticker-plugin"
    }

    fn initialize(&self, instance: &Instance) -> ReturnValue {
        instance.register_type(Arc::new(TickerFactory))
    }

    fn shutdown(&self, _instance: &Instance) {
        tracing::debug!("ticker plugin shutting down");
    }
}

/// Host plugin for this shared library. Registers `Counter`, then
/// loads [`TickerPlugin`] as a nested plugin from inside its own
/// `initialize` — types `TickerPlugin` registers while this call is
/// still on the stack are attributed to it, not to `CounterPlugin`.
pub struct CounterPlugin;

impl CounterPlugin {
    pub fn new() -> Self {
        Self
    }

    fn ticker_uid(&self) -> Uid {
        TickerPlugin.class_uid()
    }
}

impl Default for CounterPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for CounterPlugin {
    fn class_uid(&self) -> Uid {
        make_uid("demo::counter_plugin::CounterPlugin")
    }

    fn name(&self) -> &str {
        "counter-plugin"
    }

    fn initialize(&self, instance: &Instance) -> ReturnValue {
        let rv = instance.register_type(Arc::new(CounterFactory));
        if failed(rv) {
            return rv;
        }
        instance.plugins().load_plugin(instance, Arc::new(TickerPlugin))
    }

    fn shutdown(&self, instance: &Instance) {
        instance.plugins().unload_plugin(instance, self.ticker_uid());
    }
}

weave_plugin!(CounterPlugin::new());

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increment_bumps_count_and_fires_incremented() {
        let instance = Instance::init();
        assert_eq!(CounterPlugin::new().initialize(&instance), ReturnValue::Success);

        let counter = instance
            .create(Counter::class_info().class_uid, ObjectFlags::NONE)
            .expect("Counter registered");
        let metadata = match counter.get_interface(<dyn IMetadata as InterfaceId>::UID) {
            Some(InterfaceRef::Metadata(m)) => m,
            _ => panic!("Counter exposes IMetadata"),
        };

        let increment = metadata.get_function("increment").expect("increment function");
        let count = metadata.get_property("count").expect("count property");
        let incremented = metadata.get_event("incremented").expect("incremented event");

        let fired = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let fired_in_handler = fired.clone();
        incremented.add_handler(
            Function::with_callback(Arc::new(move |_| {
                fired_in_handler.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                None
            })),
            InvokeType::Immediate,
        );

        increment.invoke(FnArgs::empty(), InvokeType::Immediate);
        let any = count.backing().expect("bound");
        let mut buf = [0u8; 4];
        any.get_data(&mut buf, type_uid::<i32>());
        assert_eq!(i32::from_ne_bytes(buf), 1);
        assert_eq!(fired.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn host_plugin_loads_and_unloads_its_nested_ticker() {
        let instance = Instance::init();
        let plugin = CounterPlugin::new();
        let ticker_uid = plugin.ticker_uid();

        assert_eq!(plugin.initialize(&instance), ReturnValue::Success);
        assert!(instance.plugins().is_loaded(ticker_uid));
        assert!(instance.create(ticker_uid, ObjectFlags::NONE).is_some());

        plugin.shutdown(&instance);
        assert!(!instance.plugins().is_loaded(ticker_uid));
        assert!(instance.create(ticker_uid, ObjectFlags::NONE).is_none());
    }
}
