//! Job executor abstraction trait.
//!
//! Lets the gateway run jobs without knowing how they are isolated, and lets
//! tests substitute a scripted executor.

use async_trait::async_trait;

use crate::job::{ExecutionOutcome, Job};

/// Runs a [`Job`] to completion.
///
/// Implementations must be `Send + Sync` to allow use across async tasks.
/// Every failure is folded into the returned [`ExecutionOutcome`]; nothing
/// escapes as an error, and temporary artifacts are gone by the time the
/// future resolves.
#[async_trait]
pub trait JobExecutor: Send + Sync {
    /// Executes `job` and reports what happened.
    async fn run(&self, job: Job) -> ExecutionOutcome;
}
