//! Pipeline engine: ordered steps, short-circuit on failure, finalizer always.

use crate::error::{ReleaseError, Result};
use futures_util::FutureExt;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

pub use futures_util::future::BoxFuture;

/// One named unit of work in a pipeline.
///
/// `Ok(0)` continues the run, `Ok(code)` aborts it with `code`, and `Err`
/// faults it. All three paths still reach the finalizer.
pub trait PipelineStep<C>: Send + Sync {
    /// Step name used in logs
    fn name(&self) -> &str;

    /// Execute the step against the shared context
    fn run<'a>(&'a self, ctx: &'a mut C) -> BoxFuture<'a, Result<i32>>;
}

/// Cleanup that runs once per pipeline run, whatever the outcome
pub trait PipelineFinalizer<C>: Send + Sync {
    /// Release whatever the steps acquired
    fn finalize<'a>(&'a self, ctx: &'a mut C) -> BoxFuture<'a, Result<()>>;
}

/// Lifecycle of a single pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineState {
    /// Not started
    Pending,
    /// Executing the step at `index`
    Running {
        /// Position in registration order
        index: usize,
        /// Step name
        step: String,
    },
    /// A step returned a non-zero code
    Aborted(i32),
    /// A step returned an error or panicked
    Faulted,
    /// Finalizer is running
    Finalizing,
    /// Terminal state; `None` means the run faulted
    Done(Option<i32>),
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Pending => write!(f, "pending"),
            PipelineState::Running { index, step } => write!(f, "running #{index} ({step})"),
            PipelineState::Aborted(code) => write!(f, "aborted ({code})"),
            PipelineState::Faulted => write!(f, "faulted"),
            PipelineState::Finalizing => write!(f, "finalizing"),
            PipelineState::Done(Some(code)) => write!(f, "done ({code})"),
            PipelineState::Done(None) => write!(f, "done (fault)"),
        }
    }
}

/// How the step sequence ended, before finalization
enum StepsOutcome {
    Completed,
    Aborted(i32),
    Failed(ReleaseError),
    Panicked(Box<dyn Any + Send>),
}

/// Ordered sequence of steps plus an optional finalizer
pub struct Pipeline<C> {
    name: String,
    steps: Vec<Box<dyn PipelineStep<C>>>,
    finalizer: Option<Box<dyn PipelineFinalizer<C>>>,
}

impl<C: Send> Pipeline<C> {
    /// Create an empty pipeline
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
            finalizer: None,
        }
    }

    /// Append a step; steps run in registration order
    pub fn add_step(mut self, step: impl PipelineStep<C> + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Register the finalizer, replacing any previous one
    pub fn with_finalizer(mut self, finalizer: impl PipelineFinalizer<C> + 'static) -> Self {
        self.finalizer = Some(Box::new(finalizer));
        self
    }

    /// Step names in execution order
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Run every step in order, then the finalizer.
    ///
    /// Returns the first non-zero step code, or 0. A step error is returned
    /// after finalization; a step panic resumes after finalization. Finalizer
    /// failures are logged and never replace the step outcome.
    pub async fn run(&self, ctx: &mut C) -> Result<i32> {
        let mut state = PipelineState::Pending;
        let mut outcome = StepsOutcome::Completed;

        for (index, step) in self.steps.iter().enumerate() {
            self.transition(
                &mut state,
                PipelineState::Running {
                    index,
                    step: step.name().to_string(),
                },
            );

            match AssertUnwindSafe(step.run(ctx)).catch_unwind().await {
                Ok(Ok(0)) => {}
                Ok(Ok(code)) => {
                    log::error!("{} aborted in step '{}' with code {code}", self.name, step.name());
                    self.transition(&mut state, PipelineState::Aborted(code));
                    outcome = StepsOutcome::Aborted(code);
                    break;
                }
                Ok(Err(e)) => {
                    log::error!("{} faulted in step '{}': {e}", self.name, step.name());
                    self.transition(&mut state, PipelineState::Faulted);
                    outcome = StepsOutcome::Failed(e);
                    break;
                }
                Err(payload) => {
                    log::error!(
                        "{} panicked in step '{}': {}",
                        self.name,
                        step.name(),
                        panic_message(payload.as_ref())
                    );
                    self.transition(&mut state, PipelineState::Faulted);
                    outcome = StepsOutcome::Panicked(payload);
                    break;
                }
            }
        }

        self.transition(&mut state, PipelineState::Finalizing);
        if let Some(finalizer) = &self.finalizer {
            match AssertUnwindSafe(finalizer.finalize(ctx)).catch_unwind().await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => log::error!("{} finalizer failed: {e}", self.name),
                Err(payload) => log::error!(
                    "{} finalizer panicked: {}",
                    self.name,
                    panic_message(payload.as_ref())
                ),
            }
        }

        match outcome {
            StepsOutcome::Completed => {
                self.transition(&mut state, PipelineState::Done(Some(0)));
                Ok(0)
            }
            StepsOutcome::Aborted(code) => {
                self.transition(&mut state, PipelineState::Done(Some(code)));
                Ok(code)
            }
            StepsOutcome::Failed(e) => {
                self.transition(&mut state, PipelineState::Done(None));
                Err(e)
            }
            StepsOutcome::Panicked(payload) => {
                self.transition(&mut state, PipelineState::Done(None));
                panic::resume_unwind(payload)
            }
        }
    }

    fn transition(&self, state: &mut PipelineState, next: PipelineState) {
        log::trace!("{}: {state} -> {next}", self.name);
        *state = next;
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
