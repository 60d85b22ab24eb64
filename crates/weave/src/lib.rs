//! # weave
//!
//! A reflected, dynamically typed, event-driven component-object runtime.
//!
//! ## Overview
//!
//! Every object in weave is reached through a small, closed set of
//! interfaces (`IAny`, `IFunction`, `IEvent`, `IProperty`, `IMetadata`)
//! looked up by UID, never by Rust's own `TypeId`. This lets host
//! applications load plugin shared libraries that define new classes
//! at runtime and have them interoperate with classes compiled
//! directly into the host, without either side sharing a `dyn Any`
//! vtable.
//!
//! ```text
//! ┌───────────┐     ┌────────────────┐     ┌─────────────┐
//! │  Instance │────▶│ PluginRegistry │────▶│   Plugin     │──▶ classes
//! │ (registry)│     │                │     │ (cdylib)     │
//! └───────────┘     └────────────────┘     └─────────────┘
//! ```
//!
//! - **Instance**: owns the class/Any factory tables, the deferred
//!   task queue, and the plugin registry.
//! - **Plugin**: a loadable unit of classes, in-process or a shared
//!   library resolved through the `weave_plugin_entrypoint` ABI.
//! - **Property/Event/Function**: the reflected member kinds every
//!   class exposes through `IMetadata`.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use weave::prelude::*;
//!
//! let instance = Instance::init();
//! let counter = AnyValue::new(0i32);
//! let property = Property::bound(counter);
//! property.on_changed().add_handler(
//!     Function::with_callback(std::sync::Arc::new(|args| {
//!         println!("changed: {:?}", args.get(0));
//!         None
//!     })),
//!     InvokeType::Immediate,
//! );
//! property.set_value(&*AnyValue::new(1i32));
//! ```
//!
//! ## Features
//!
//! - `toml-config`/`yaml-config`: host configuration file formats,
//!   passed through to `weave-runtime`.
//! - `json-log`: JSON-formatted log output, passed through to
//!   `weave-runtime`.

pub use weave_core;
pub use weave_macros;
pub use weave_runtime;

/// Convenience re-export of the commonly used names from `weave-core`
/// and `weave-runtime`.
pub mod prelude {
    pub use weave_core::prelude::*;
    pub use weave_macros::{weave_plugin, Interfaces};
    pub use weave_runtime::prelude::*;
}
