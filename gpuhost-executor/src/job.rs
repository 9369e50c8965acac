//! Jobs submitted to the sandbox and the outcomes it reports.

use std::fmt;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// A unit of work for the sandbox.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Job {
    /// Program text, run by the configured interpreter.
    Source { text: String },
    /// A serialized [`RemoteCall`](crate::RemoteCall), run by the callable runner.
    Callable { bytes: Vec<u8> },
}

/// Identifies a single sandbox run. Also names its scratch directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[non_exhaustive]
pub struct JobId(pub Uuid);

impl JobId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a job ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum JobStatus {
    /// Exited zero (and, for callables, produced a result).
    Success,
    /// Ran and exited non-zero, or the runner produced no result.
    Error,
    /// Exceeded the wall-clock budget and was killed.
    Timeout,
    /// The host failed to prepare, launch, or collect the job.
    InternalError,
}

/// Everything captured from one sandbox run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct ExecutionOutcome {
    pub job_id: JobId,
    pub status: JobStatus,
    pub stdout: String,
    pub stderr: String,
    /// Process exit code; `-1` when the process never exited normally.
    pub return_code: i32,
    /// Base64 of the callable's serialized return value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    /// Hex SHA-256 of the raw result bytes, for verifying the transported payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_sha256: Option<String>,
    pub duration_ms: u64,
}

impl ExecutionOutcome {
    pub(crate) fn finished(
        job_id: JobId,
        stdout: &[u8],
        stderr: &[u8],
        return_code: Option<i32>,
        elapsed: Duration,
    ) -> Self {
        let status = if return_code == Some(0) { JobStatus::Success } else { JobStatus::Error };
        Self {
            job_id,
            status,
            stdout: String::from_utf8_lossy(stdout).into_owned(),
            stderr: String::from_utf8_lossy(stderr).into_owned(),
            return_code: return_code.unwrap_or(-1),
            result: None,
            result_sha256: None,
            duration_ms: millis(elapsed),
        }
    }

    pub(crate) fn timed_out(job_id: JobId, limit: Duration, elapsed: Duration) -> Self {
        Self {
            job_id,
            status: JobStatus::Timeout,
            stdout: String::new(),
            stderr: format!("execution timed out ({}s limit)", limit.as_secs()),
            return_code: -1,
            result: None,
            result_sha256: None,
            duration_ms: millis(elapsed),
        }
    }

    pub(crate) fn internal(job_id: JobId, message: String, elapsed: Duration) -> Self {
        Self {
            job_id,
            status: JobStatus::InternalError,
            stdout: String::new(),
            stderr: message,
            return_code: -1,
            result: None,
            result_sha256: None,
            duration_ms: millis(elapsed),
        }
    }

    /// Attaches a callable's raw return bytes.
    pub(crate) fn with_result(mut self, bytes: &[u8]) -> Self {
        self.result = Some(BASE64.encode(bytes));
        self.result_sha256 = Some(sha256_hex(bytes));
        self
    }

    /// Returns `true` if the job finished with [`JobStatus::Success`].
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == JobStatus::Success
    }

    /// Decodes the base64 result back into raw bytes.
    #[must_use]
    pub fn result_bytes(&self) -> Option<Vec<u8>> {
        self.result.as_deref().and_then(|b64| BASE64.decode(b64).ok())
    }
}

/// Hex-encoded SHA-256 of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
