//! The single process-wide accessor through which the object model
//! reaches the instance registry, without `weave-core` depending on
//! `weave-runtime`.
//!
//! This mirrors how `tracing` separates its subscriber trait from the
//! single global dispatcher installed once at process start: the
//! trait lives with the callers (here, `Function`/`Event`), the
//! concrete implementation lives with the registry crate, and a
//! `OnceLock` wires them together at `weave_runtime::Instance::init()`
//! time. See the design note on the global singleton in DESIGN.md.

use std::sync::{Arc, OnceLock};

use crate::any::IAny;
use crate::function::IFunction;
use crate::interface::IInterface;
use crate::uid::Uid;

/// One pending deferred call: a strong ref to the function (keeping
/// it alive for the duration of the queued task) plus its cloned
/// arguments.
pub struct DeferredTask {
    pub function: Arc<dyn IFunction>,
    pub args: Vec<Arc<dyn IAny>>,
}

/// The subset of the instance registry that `weave-core`'s invocation
/// primitives need to reach.
pub trait RuntimeApi: Send + Sync {
    /// Appends a deferred call to the instance's task queue.
    fn enqueue_deferred(&self, task: DeferredTask);

    /// Creates a fresh `Any` for `type_uid` using whichever Any
    /// factory the registry has on file for it, or `None` if none is
    /// registered. Used by [`crate::metadata::MetadataContainer`] to
    /// materialize a property member's backing Any on first access.
    fn create_any(&self, type_uid: Uid) -> Option<Arc<dyn IAny>>;

    /// Creates a fresh instance of the class registered under
    /// `class_uid`, or `None` if nothing is registered for it. Used by
    /// [`crate::metadata::MetadataContainer`] to materialize
    /// `Property`/`Event`/`Function` members through the same registry
    /// path every other class goes through, rather than constructing
    /// the built-ins directly.
    fn create(&self, class_uid: Uid) -> Option<Arc<dyn IInterface>>;
}

static RUNTIME: OnceLock<Arc<dyn RuntimeApi>> = OnceLock::new();

/// Installs the process-wide runtime hook. Called exactly once, by
/// `weave_runtime::Instance::init()`. Further calls are ignored —
/// there is no lazy re-initialization or replacement of an already
/// installed global singleton.
pub fn set_runtime_api(api: Arc<dyn RuntimeApi>) {
    if RUNTIME.set(api).is_err() {
        tracing::warn!("weave runtime API installed more than once; ignoring the second call");
    }
}

pub fn runtime_api() -> Option<Arc<dyn RuntimeApi>> {
    RUNTIME.get().cloned()
}
