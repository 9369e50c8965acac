//! Error types for the executor crate.

use std::path::PathBuf;

/// Host-side failures while preparing, launching, or collecting a job.
///
/// The sandbox never returns these to callers directly: they become an
/// `internal_error` outcome. The runner binary reports them on stderr.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ExecutorError {
    /// The child process could not be started.
    #[error("failed to spawn {}: {source}", program.display())]
    SpawnFailed {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A callable payload could not be decoded or encoded.
    #[error("invalid callable payload: {0}")]
    InvalidPayload(String),

    /// A remote call ran but did not produce a value.
    #[error("remote call failed: {0}")]
    CallFailed(String),

    /// Underlying I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for ExecutorError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidPayload(err.to_string())
    }
}
