//! Process sandbox. Runs each job in a child process under a scratch directory.
//!
//! Every run gets a fresh directory named after its [`JobId`]. Source text or
//! the serialized callable is written there, the child runs with that
//! directory as its working directory, and the directory is removed when the
//! run ends, whichever way it ends.

use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tempfile::TempDir;

use crate::backend::JobExecutor;
use crate::handle::JobProcess;
use crate::job::{ExecutionOutcome, Job, JobId, JobStatus};
use crate::{ExecutorError, SandboxConfig};

const INPUT_FILE: &str = "call.json";
const OUTPUT_FILE: &str = "result.json";

/// Runs jobs as local child processes.
///
/// Stateless and reentrant: concurrent calls run concurrently. Serializing
/// access to the accelerator is the caller's job.
///
/// # Cancel Safety
/// Cancel safe. Dropping a run future kills the job's whole process group
/// and removes the scratch directory.
#[derive(Debug, Clone, Default)]
pub struct ProcessSandbox {
    config: SandboxConfig,
}

impl ProcessSandbox {
    #[must_use]
    pub fn new(config: SandboxConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Runs `text` with the configured interpreter.
    pub async fn run_source(&self, text: &str) -> ExecutionOutcome {
        let job_id = JobId::new();
        let started = Instant::now();
        tracing::info!(%job_id, bytes = text.len(), "starting source job");

        let outcome = match self.try_run_source(job_id, text, started).await {
            Ok(outcome) => outcome,
            Err(e) => internal_error(job_id, &e, started.elapsed()),
        };
        log_outcome(&outcome);
        outcome
    }

    /// Runs a serialized [`RemoteCall`](crate::RemoteCall) through the runner.
    pub async fn run_callable(&self, bytes: &[u8]) -> ExecutionOutcome {
        let job_id = JobId::new();
        let started = Instant::now();
        tracing::info!(%job_id, bytes = bytes.len(), "starting callable job");

        let outcome = match self.try_run_callable(job_id, bytes, started).await {
            Ok(outcome) => outcome,
            Err(e) => internal_error(job_id, &e, started.elapsed()),
        };
        log_outcome(&outcome);
        outcome
    }

    async fn try_run_source(
        &self,
        job_id: JobId,
        text: &str,
        started: Instant,
    ) -> Result<ExecutionOutcome, ExecutorError> {
        let scratch = self.scratch_dir(job_id)?;
        let source_path = scratch
            .path()
            .join(format!("job.{}", self.config.source_extension));
        tokio::fs::write(&source_path, text).await?;

        let process = JobProcess::spawn(&self.config.interpreter, &[source_path.as_path()], scratch.path())?;
        let outcome = match process.wait_with_timeout(self.config.timeout).await? {
            Some(done) => ExecutionOutcome::finished(
                job_id,
                &done.stdout,
                &done.stderr,
                done.status.code(),
                started.elapsed(),
            ),
            None => ExecutionOutcome::timed_out(job_id, self.config.timeout, started.elapsed()),
        };
        close_scratch(scratch);
        Ok(outcome)
    }

    async fn try_run_callable(
        &self,
        job_id: JobId,
        bytes: &[u8],
        started: Instant,
    ) -> Result<ExecutionOutcome, ExecutorError> {
        let scratch = self.scratch_dir(job_id)?;
        let input_path = scratch.path().join(INPUT_FILE);
        let output_path = scratch.path().join(OUTPUT_FILE);
        tokio::fs::write(&input_path, bytes).await?;

        let process = JobProcess::spawn(
            &self.config.runner_path,
            &[input_path.as_path(), output_path.as_path()],
            scratch.path(),
        )?;
        let Some(done) = process.wait_with_timeout(self.config.timeout).await? else {
            close_scratch(scratch);
            return Ok(ExecutionOutcome::timed_out(job_id, self.config.timeout, started.elapsed()));
        };

        let mut outcome = ExecutionOutcome::finished(
            job_id,
            &done.stdout,
            &done.stderr,
            done.status.code(),
            started.elapsed(),
        );

        if outcome.status == JobStatus::Success {
            outcome = match read_if_exists(&output_path).await? {
                Some(result) => outcome.with_result(&result),
                None => {
                    outcome.status = JobStatus::Error;
                    outcome.stderr = "no output file produced".to_owned();
                    outcome
                }
            };
        } else if outcome.stderr.is_empty() {
            outcome.stderr = "unknown error".to_owned();
        }

        close_scratch(scratch);
        Ok(outcome)
    }

    fn scratch_dir(&self, job_id: JobId) -> Result<TempDir, ExecutorError> {
        Ok(tempfile::Builder::new()
            .prefix(&format!("gpuhost-{job_id}-"))
            .tempdir_in(&self.config.scratch_dir)?)
    }
}

#[async_trait]
impl JobExecutor for ProcessSandbox {
    async fn run(&self, job: Job) -> ExecutionOutcome {
        match job {
            Job::Source { text } => self.run_source(&text).await,
            Job::Callable { bytes } => self.run_callable(&bytes).await,
        }
    }
}

async fn read_if_exists(path: &Path) -> Result<Option<Vec<u8>>, ExecutorError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Removes the scratch directory now, logging rather than failing on error.
/// Error paths rely on `TempDir`'s drop instead.
fn close_scratch(scratch: TempDir) {
    let path = scratch.path().to_owned();
    if let Err(e) = scratch.close() {
        tracing::warn!(path = %path.display(), error = %e, "failed to remove job scratch directory");
    }
}

fn internal_error(job_id: JobId, err: &ExecutorError, elapsed: Duration) -> ExecutionOutcome {
    tracing::error!(%job_id, error = %err, "job failed on host side");
    ExecutionOutcome::internal(job_id, err.to_string(), elapsed)
}

fn log_outcome(outcome: &ExecutionOutcome) {
    tracing::info!(
        job_id = %outcome.job_id,
        status = ?outcome.status,
        return_code = outcome.return_code,
        elapsed_ms = outcome.duration_ms,
        "job finished"
    );
}
