//! Error types for the client crate.

use gpuhost_core::LockError;

/// Failures talking to an agent.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ClientError {
    /// The agent refused the access token, or refused this owner.
    #[error("request forbidden: {message}")]
    Forbidden { message: String },

    /// The agent refused a lock transition.
    #[error(transparent)]
    Lock(#[from] LockError),

    /// The agent answered with an unexpected status.
    #[error("agent returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The request never completed, or the response body was not the
    /// expected JSON.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// A callable could not be serialized for submission.
    #[error(transparent)]
    Payload(#[from] gpuhost_executor::ExecutorError),

    /// A local source file could not be read.
    #[error("failed to read {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
