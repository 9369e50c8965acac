//! Typed wrapper over the agent's lock and submit routes.

use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use gpuhost_core::{HardwareDescriptor, LockError, LockStatus};
use gpuhost_executor::{ExecutionOutcome, RemoteCall};
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::error::ClientError;

/// What `GET /info` reports.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AgentInfo {
    pub gpu: HardwareDescriptor,
    pub status: LockStatus,
    pub agent_version: String,
    #[serde(default)]
    pub connection: ConnectionInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ConnectionInfo {
    pub public_url: Option<String>,
}

#[derive(Serialize)]
struct OwnerBody<'a> {
    owner_id: &'a str,
}

#[derive(Serialize)]
struct SubmitBody<'a> {
    owner_id: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<String>,
}

/// One caller's session against one agent.
///
/// Every request carries the access token as a bearer header. Lock, unlock,
/// and submit all act as [`owner_id`](Self::owner_id), a random UUID unless
/// set with [`with_owner_id`](Self::with_owner_id).
#[derive(Debug, Clone)]
pub struct GpuClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    owner_id: String,
}

impl GpuClient {
    #[must_use]
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        let base_url = url.into().trim_end_matches('/').to_owned();
        Self { http: reqwest::Client::new(), base_url, token: token.into(), owner_id: Uuid::new_v4().to_string() }
    }

    /// Acts as `owner_id` instead of the generated one.
    #[must_use]
    pub fn with_owner_id(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = owner_id.into();
        self
    }

    #[must_use]
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// Fetches device telemetry and lock status.
    ///
    /// # Errors
    /// [`ClientError::Forbidden`] if the agent rejects the token.
    pub async fn info(&self) -> Result<AgentInfo, ClientError> {
        let response = self.http.get(self.url("/info")).bearer_auth(&self.token).send().await?;
        Ok(checked(response).await?.json().await?)
    }

    /// Takes the accelerator lock.
    ///
    /// # Errors
    /// [`LockError::Busy`] (as [`ClientError::Lock`]) if anyone already holds it.
    pub async fn lock(&self) -> Result<(), ClientError> {
        let response = self.post("/lock", &OwnerBody { owner_id: &self.owner_id }).await?;
        if response.status() == StatusCode::SERVICE_UNAVAILABLE {
            debug!(owner_id = %self.owner_id, "accelerator busy");
            return Err(LockError::Busy.into());
        }
        checked(response).await?;
        Ok(())
    }

    /// Like [`lock`](Self::lock), but reports a busy accelerator as `Ok(false)`.
    ///
    /// # Errors
    /// Any failure other than [`LockError::Busy`].
    pub async fn try_lock(&self) -> Result<bool, ClientError> {
        match self.lock().await {
            Ok(()) => Ok(true),
            Err(ClientError::Lock(LockError::Busy)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Releases the lock.
    ///
    /// # Errors
    /// [`ClientError::Forbidden`] if this owner does not hold it.
    pub async fn unlock(&self) -> Result<(), ClientError> {
        let response = self.post("/unlock", &OwnerBody { owner_id: &self.owner_id }).await?;
        checked(response).await?;
        Ok(())
    }

    /// Runs program text in the agent's sandbox. The lock must be held.
    ///
    /// A job that fails or times out is still `Ok`; check the outcome's status.
    ///
    /// # Errors
    /// [`ClientError::Status`] (400) if nobody holds the lock,
    /// [`ClientError::Forbidden`] if someone else does.
    pub async fn submit_code(&self, code: &str) -> Result<ExecutionOutcome, ClientError> {
        self.submit(SubmitBody { owner_id: &self.owner_id, kind: "code", code: Some(code), payload: None })
            .await
    }

    /// Runs a [`RemoteCall`] in the agent's callable runner.
    ///
    /// # Errors
    /// As [`submit_code`](Self::submit_code), plus [`ClientError::Payload`] if
    /// the call cannot be serialized.
    pub async fn submit_callable(&self, call: &RemoteCall) -> Result<ExecutionOutcome, ClientError> {
        let payload = BASE64.encode(call.to_bytes()?);
        self.submit(SubmitBody { owner_id: &self.owner_id, kind: "callable", code: None, payload: Some(payload) })
            .await
    }

    /// Reads a local file and submits its contents as code.
    ///
    /// # Errors
    /// [`ClientError::ReadFile`] if the file cannot be read, otherwise as
    /// [`submit_code`](Self::submit_code).
    pub async fn run_file(&self, path: impl AsRef<Path>) -> Result<ExecutionOutcome, ClientError> {
        let path = path.as_ref();
        let code = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ClientError::ReadFile { path: path.display().to_string(), source })?;
        self.submit_code(&code).await
    }

    async fn submit(&self, body: SubmitBody<'_>) -> Result<ExecutionOutcome, ClientError> {
        debug!(owner_id = %self.owner_id, kind = body.kind, "submitting job");
        let response = self.post("/submit", &body).await?;
        Ok(checked(response).await?.json().await?)
    }

    async fn post(&self, path: &str, body: &impl Serialize) -> Result<Response, ClientError> {
        Ok(self.http.post(self.url(path)).bearer_auth(&self.token).json(body).send().await?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

/// Passes success responses through and turns the rest into errors carrying
/// the agent's `error` message.
async fn checked(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_owned))
        .unwrap_or(body);
    if status == StatusCode::FORBIDDEN {
        Err(ClientError::Forbidden { message })
    } else {
        Err(ClientError::Status { status: status.as_u16(), message })
    }
}
