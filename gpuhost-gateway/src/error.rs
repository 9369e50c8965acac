//! Error types for the gateway crate.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use gpuhost_core::{ClanError, LockError};
use serde_json::json;

/// Errors that can occur during gateway request handling.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum GatewayError {
    /// A lock transition was refused.
    #[error(transparent)]
    Lock(#[from] LockError),

    /// A clan operation was refused.
    #[error(transparent)]
    Clan(#[from] ClanError),

    /// No token was presented, or the token does not grant this route.
    #[error("invalid or missing credential")]
    Forbidden,

    /// A job was submitted while nobody holds the lock.
    #[error("lock must be acquired before submitting work")]
    LockNotHeld,

    /// A job was submitted by someone other than the lock holder.
    #[error("lock is held by another owner, not '{owner_id}'")]
    NotLockHolder { owner_id: String },

    /// The request body is malformed or contains invalid values.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A completion was requested from a clan with no members.
    #[error("no nodes available in clan")]
    NoNodes,
}

impl GatewayError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Lock(LockError::Busy) | Self::NoNodes => StatusCode::SERVICE_UNAVAILABLE,
            Self::Lock(_) | Self::Forbidden | Self::NotLockHolder { .. } => StatusCode::FORBIDDEN,
            Self::Clan(ClanError::Incompatible(_)) | Self::LockNotHeld | Self::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Clan(ClanError::AlreadyFormed { .. } | ClanError::NotFormed) => StatusCode::CONFLICT,
            Self::Clan(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(json!({"error": self.to_string()}))).into_response()
    }
}
