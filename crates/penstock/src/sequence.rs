//! Sequencing of dependent asynchronous steps.
//!
//! The typical shape: dispatch an action, wait for a store to conclude,
//! branch on success/failure, continue or halt. Without this the call
//! sites degrade into nested handler trees.

use std::future::Future;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::result::{Concluded, Failure};

type StepFn = Box<dyn FnOnce() -> BoxFuture<'static, bool> + Send>;

struct Step {
    run: StepFn,
    halt_on_failure: bool,
}

/// A linear pipeline of asynchronous steps with success/failure branching
/// and a single completion hook.
///
/// Steps run strictly in registration order, one at a time; nothing is
/// retried. Each step owns its own result type, so a sequence can walk
/// through stores with unrelated state slices.
#[must_use = "a sequence does nothing until `run`"]
pub struct SequenceBuilder {
    steps: Vec<Step>,
    finally_hook: Option<Box<dyn FnOnce() + Send>>,
}

impl SequenceBuilder {
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            finally_hook: None,
        }
    }

    /// Append a step. A `Failure` outcome stops the sequence after its
    /// `on_failure` handler ran.
    pub fn next<T, O, Fut, FS, FF>(self, origin: O, on_success: FS, on_failure: FF) -> Self
    where
        T: Send + 'static,
        O: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Concluded<T>> + Send + 'static,
        FS: FnOnce(T) + Send + 'static,
        FF: FnOnce(Failure<T>) + Send + 'static,
    {
        self.push(origin, on_success, on_failure, true)
    }

    /// Append a step whose failure does not stop the sequence.
    pub fn next_non_halting<T, O, Fut, FS, FF>(
        self,
        origin: O,
        on_success: FS,
        on_failure: FF,
    ) -> Self
    where
        T: Send + 'static,
        O: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Concluded<T>> + Send + 'static,
        FS: FnOnce(T) + Send + 'static,
        FF: FnOnce(Failure<T>) + Send + 'static,
    {
        self.push(origin, on_success, on_failure, false)
    }

    /// Completion hook; runs exactly once, after the last executed step,
    /// on both completion and early halt.
    pub fn on_finally(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.finally_hook = Some(Box::new(hook));
        self
    }

    fn push<T, O, Fut, FS, FF>(
        mut self,
        origin: O,
        on_success: FS,
        on_failure: FF,
        halt_on_failure: bool,
    ) -> Self
    where
        T: Send + 'static,
        O: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Concluded<T>> + Send + 'static,
        FS: FnOnce(T) + Send + 'static,
        FF: FnOnce(Failure<T>) + Send + 'static,
    {
        let run: StepFn = Box::new(move || {
            async move {
                match origin().await {
                    Concluded::Success(value) => {
                        on_success(value);
                        true
                    }
                    Concluded::Failure(failure) => {
                        on_failure(failure);
                        false
                    }
                }
            }
            .boxed()
        });
        self.steps.push(Step {
            run,
            halt_on_failure,
        });
        self
    }

    /// Execute the steps strictly in registration order, awaiting each
    /// origin to completion before starting the next.
    pub async fn run(self) {
        for step in self.steps {
            let succeeded = (step.run)().await;
            if !succeeded && step.halt_on_failure {
                break;
            }
        }
        if let Some(hook) = self.finally_hook {
            hook();
        }
    }
}

impl Default for SequenceBuilder {
    fn default() -> Self {
        Self::new()
    }
}
