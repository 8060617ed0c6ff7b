//! Ordered, short-circuiting step execution with a guaranteed finalizer.
//!
//! A [`Pipeline`] runs its steps one at a time against a shared context.
//! The first non-zero status code stops the run; a fault (error or panic)
//! stops it too. Either way the registered finalizer runs exactly once
//! before the result is handed back. Steps fan out internally through
//! [`ParallelRunner`].

mod engine;
mod runner;

pub use engine::{BoxFuture, Pipeline, PipelineFinalizer, PipelineState, PipelineStep};
pub use runner::{ParallelRunner, sum_codes};

/// Status code for a successful step or run
pub const SUCCESS: i32 = 0;

/// Status code for precondition and resolution failures
pub const PRECONDITION_FAILED: i32 = 400;
