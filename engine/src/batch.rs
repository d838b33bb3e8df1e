//! Sequential execution of a group of write operations.
//!
//! A [`Batch`] runs its operations one after another against a proxy, in
//! create, update, destroy order, and reports progress through
//! [`BatchListeners`]. With `pause_on_exception` the batch stops after a
//! failed operation until the application calls [`Batch::retry`] or
//! [`Batch::resume`].

use crate::{Action, Operation, OperationOptions, Proxy, Record};
use parking_lot::Mutex;
use std::sync::Arc;

/// Hook invoked with the batch and the operation it concerns.
pub type BatchHook = Arc<dyn Fn(&Batch, &Operation) + Send + Sync>;

/// Hook invoked once a batch finishes, with its last operation. An empty
/// batch finishes with `None`.
pub type BatchCompleteHook = Arc<dyn Fn(&Batch, Option<&Operation>) + Send + Sync>;

/// The record sets a sync hands to [`Proxy::batch`].
///
/// A key is present only when its set is non-empty.
#[derive(Clone, Default)]
pub struct BatchOptions {
    pub create: Option<Vec<Record>>,
    pub update: Option<Vec<Record>>,
    pub destroy: Option<Vec<Record>>,
    /// Stop after a failed operation until retried or resumed
    pub pause_on_exception: bool,
}

impl BatchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build options from the three record sets, dropping empty ones.
    pub fn from_sets(create: Vec<Record>, update: Vec<Record>, destroy: Vec<Record>) -> Self {
        let non_empty = |records: Vec<Record>| (!records.is_empty()).then_some(records);
        Self {
            create: non_empty(create),
            update: non_empty(update),
            destroy: non_empty(destroy),
            pause_on_exception: false,
        }
    }

    pub fn pause_on_exception(mut self, pause: bool) -> Self {
        self.pause_on_exception = pause;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.create.is_none() && self.update.is_none() && self.destroy.is_none()
    }

    /// One operation per present set, in execution order.
    pub fn operations(&self) -> Vec<Operation> {
        [
            (Action::Create, &self.create),
            (Action::Update, &self.update),
            (Action::Destroy, &self.destroy),
        ]
        .into_iter()
        .filter_map(|(action, records)| {
            records.as_ref().map(|records| {
                Operation::from_options(OperationOptions::new(action).records(records.clone()))
            })
        })
        .collect()
    }
}

impl std::fmt::Debug for BatchOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchOptions")
            .field("create", &self.create.as_ref().map(Vec::len))
            .field("update", &self.update.as_ref().map(Vec::len))
            .field("destroy", &self.destroy.as_ref().map(Vec::len))
            .field("pause_on_exception", &self.pause_on_exception)
            .finish()
    }
}

/// Progress hooks for a batch.
#[derive(Clone, Default)]
pub struct BatchListeners {
    /// After every operation, successful or not
    pub operation_complete: Option<BatchHook>,
    /// Once, after the last operation, with that operation
    pub complete: Option<BatchCompleteHook>,
    /// After every failed operation
    pub exception: Option<BatchHook>,
}

impl BatchListeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_operation_complete(
        mut self,
        hook: impl Fn(&Batch, &Operation) + Send + Sync + 'static,
    ) -> Self {
        self.operation_complete = Some(Arc::new(hook));
        self
    }

    pub fn on_complete(
        mut self,
        hook: impl Fn(&Batch, Option<&Operation>) + Send + Sync + 'static,
    ) -> Self {
        self.complete = Some(Arc::new(hook));
        self
    }

    pub fn on_exception(mut self, hook: impl Fn(&Batch, &Operation) + Send + Sync + 'static) -> Self {
        self.exception = Some(Arc::new(hook));
        self
    }
}

impl std::fmt::Debug for BatchListeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchListeners")
            .field("operation_complete", &self.operation_complete.is_some())
            .field("complete", &self.complete.is_some())
            .field("exception", &self.exception.is_some())
            .finish()
    }
}

#[derive(Debug, Default)]
struct BatchState {
    operations: Vec<Operation>,
    current: usize,
    running: bool,
    paused: bool,
    complete: bool,
    exceptions: Vec<Operation>,
}

struct BatchInner {
    proxy: Arc<dyn Proxy>,
    listeners: BatchListeners,
    pause_on_exception: bool,
    state: Mutex<BatchState>,
}

/// A running or finished group of operations. Cheap to clone.
#[derive(Clone)]
pub struct Batch {
    inner: Arc<BatchInner>,
}

impl Batch {
    /// Build a batch for `options` without starting it.
    pub fn new(proxy: Arc<dyn Proxy>, options: &BatchOptions, listeners: BatchListeners) -> Self {
        Self {
            inner: Arc::new(BatchInner {
                proxy,
                listeners,
                pause_on_exception: options.pause_on_exception,
                state: Mutex::new(BatchState {
                    operations: options.operations(),
                    ..BatchState::default()
                }),
            }),
        }
    }

    /// Build a batch for `options` and start it.
    pub fn run(proxy: Arc<dyn Proxy>, options: BatchOptions, listeners: BatchListeners) -> Self {
        let batch = Self::new(proxy, &options, listeners);
        batch.start();
        batch
    }

    /// Append an operation. Ignored once the batch has started.
    pub fn add(&self, operation: Operation) {
        let mut state = self.inner.state.lock();
        if !state.running && !state.complete {
            state.operations.push(operation);
        }
    }

    /// Start executing from the first operation. Does nothing if already
    /// running or complete.
    pub fn start(&self) {
        {
            let state = self.inner.state.lock();
            if state.running || state.complete {
                return;
            }
        }
        self.run_from(0);
    }

    /// Re-issue the failed operation the batch paused on.
    pub fn retry(&self) {
        let index = {
            let mut state = self.inner.state.lock();
            if !state.paused {
                return;
            }
            state.paused = false;
            let index = state.current;
            if let Some(op) = state.operations.get(index) {
                let id = op.id().clone();
                state.exceptions.retain(|e| e.id() != &id);
            }
            index
        };
        tracing::debug!(index, "retrying batch operation");
        self.run_from(index);
    }

    /// Skip the failed operation the batch paused on and continue.
    pub fn resume(&self) {
        let index = {
            let mut state = self.inner.state.lock();
            if !state.paused {
                return;
            }
            state.paused = false;
            state.current + 1
        };
        self.run_from(index);
    }

    /// Snapshot of the operations in execution order.
    pub fn operations(&self) -> Vec<Operation> {
        self.inner.state.lock().operations.clone()
    }

    /// Failed operations not since retried.
    pub fn exceptions(&self) -> Vec<Operation> {
        self.inner.state.lock().exceptions.clone()
    }

    pub fn has_exception(&self) -> bool {
        !self.inner.state.lock().exceptions.is_empty()
    }

    pub fn total(&self) -> usize {
        self.inner.state.lock().operations.len()
    }

    pub fn is_running(&self) -> bool {
        self.inner.state.lock().running
    }

    pub fn is_paused(&self) -> bool {
        self.inner.state.lock().paused
    }

    pub fn is_complete(&self) -> bool {
        self.inner.state.lock().complete
    }

    fn run_from(&self, index: usize) {
        let next = {
            let mut state = self.inner.state.lock();
            match state.operations.get_mut(index) {
                Some(op) => {
                    op.reset();
                    op.set_started();
                    let op = op.clone();
                    state.current = index;
                    state.running = true;
                    Some(op)
                }
                None => {
                    state.running = false;
                    state.complete = true;
                    None
                }
            }
        };

        match next {
            Some(op) => {
                tracing::debug!(index, action = %op.action(), records = op.records().len(), "running batch operation");
                let batch = self.clone();
                self.inner
                    .proxy
                    .execute(op, Box::new(move |op| batch.on_operation_complete(index, op)));
            }
            None => self.finish(),
        }
    }

    fn on_operation_complete(&self, index: usize, operation: Operation) {
        let failed = operation.has_exception();
        let pause = failed && self.inner.pause_on_exception;
        {
            let mut state = self.inner.state.lock();
            if let Some(slot) = state.operations.get_mut(index) {
                *slot = operation.clone();
            }
            if failed {
                state.exceptions.push(operation.clone());
            }
            if pause {
                state.paused = true;
                state.running = false;
            }
        }

        if let Some(hook) = &self.inner.listeners.operation_complete {
            hook(self, &operation);
        }
        if failed {
            tracing::warn!(
                action = %operation.action(),
                error = operation.error().unwrap_or_default(),
                "batch operation failed"
            );
            if let Some(hook) = &self.inner.listeners.exception {
                hook(self, &operation);
            }
        }

        if !pause {
            self.run_from(index + 1);
        }
    }

    fn finish(&self) {
        let last = self.inner.state.lock().operations.last().cloned();
        tracing::debug!(total = self.total(), "batch complete");
        if let Some(hook) = &self.inner.listeners.complete {
            hook(self, last.as_ref());
        }
    }
}

impl std::fmt::Debug for Batch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Batch")
            .field("operations", &state.operations.len())
            .field("current", &state.current)
            .field("running", &state.running)
            .field("paused", &state.paused)
            .field("complete", &state.complete)
            .field("exceptions", &state.exceptions.len())
            .finish()
    }
}
