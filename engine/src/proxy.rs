//! The backend boundary.
//!
//! A proxy executes one [`Operation`] and hands it back, completed, through
//! the [`Completion`] it was given. Completions may run before the call
//! returns or on any later turn; the store never blocks on them.

use crate::{Action, Batch, BatchListeners, BatchOptions, Operation};
use std::sync::Arc;

/// Receives an operation once the proxy has marked its outcome.
pub type Completion = Box<dyn FnOnce(Operation) + Send>;

/// Executes operations against a persistence backend.
pub trait Proxy: Send + Sync {
    fn read(&self, operation: Operation, done: Completion);

    fn create(&self, operation: Operation, done: Completion);

    fn update(&self, operation: Operation, done: Completion);

    fn destroy(&self, operation: Operation, done: Completion);

    /// Run `operation` through the entry point matching its action.
    fn execute(&self, operation: Operation, done: Completion) {
        match operation.action() {
            Action::Read => self.read(operation, done),
            Action::Create => self.create(operation, done),
            Action::Update => self.update(operation, done),
            Action::Destroy => self.destroy(operation, done),
        }
    }

    /// Run the create, update and destroy sets in `options` as one batch.
    ///
    /// Implementations without their own batching write
    /// `Batch::run(self, options, listeners)`.
    fn batch(self: Arc<Self>, options: BatchOptions, listeners: BatchListeners) -> Batch;
}
