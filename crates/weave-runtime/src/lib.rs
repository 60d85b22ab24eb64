//! Registry, deferred task queue, plugin loader and host-embedding
//! ambient stack for the weave component runtime.
//!
//! [`instance::Instance`] is the single entry point: construct it with
//! [`instance::Instance::init`] once per process, register classes,
//! create objects, drain the deferred queue each frame/tick with
//! `update()`, and load plugins through [`instance::Instance::plugins`].

pub mod config;
pub mod deferred;
pub mod error;
pub mod instance;
pub mod logging;
pub mod plugin;
mod string_any;

pub mod prelude {
    pub use crate::config::RuntimeConfig;
    pub use crate::error::{ConfigError, PluginError};
    pub use crate::instance::{Instance, ObjectFactory};
    pub use crate::logging::{LogSink, Logger};
    pub use crate::plugin::{Plugin, PluginRegistry};
}
