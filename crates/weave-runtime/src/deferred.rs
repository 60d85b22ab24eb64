//! The deferred task queue: a FIFO of pending function invocations,
//! drained exactly once per `Instance::update()`.

use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};

use parking_lot::Mutex;

use weave_core::global::DeferredTask;
use weave_core::prelude::FnArgs;

/// Pending deferred calls queued from any thread, drained on whichever
/// thread calls [`DeferredQueue::drain_once`].
#[derive(Default)]
pub struct DeferredQueue {
    tasks: Mutex<VecDeque<DeferredTask>>,
}

impl DeferredQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, task: DeferredTask) {
        self.tasks.lock().push_back(task);
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drains exactly the tasks present at the moment this call
    /// starts. Tasks queued by a running handler (including one queued
    /// by the handler it is itself running) land on the *next*
    /// `drain_once`, never this one.
    pub fn drain_once(&self) {
        let batch: Vec<DeferredTask> = {
            let mut guard = self.tasks.lock();
            guard.drain(..).collect()
        };
        for task in batch {
            let args: Vec<_> = task.args;
            let result = catch_unwind(AssertUnwindSafe(|| {
                task.function.call(FnArgs::new(&args));
            }));
            if result.is_err() {
                tracing::error!("deferred task handler panicked; remaining queued tasks still run");
            }
        }
    }
}
