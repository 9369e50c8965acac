//! Axum route handlers for the gpuhost agent API.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use gpuhost_core::{ClanKeys, HardwareDescriptor, LockStatus, Node, NodeId, NodeSpec};
use gpuhost_executor::{ExecutionOutcome, Job};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::{
    auth::{Caller, Scope},
    error::GatewayError,
    state::AppState,
};

// ── Shared state ─────────────────────────────────────────────────────────────

type Shared = Arc<AppState>;

// ── Request / response types ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LockBody {
    pub owner_id: String,
}

/// What a submitted job carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitKind {
    /// Program text in `code`.
    #[default]
    Code,
    /// Base64 of a serialized remote call in `payload`.
    Callable,
}

#[derive(Debug, Deserialize)]
pub struct SubmitBody {
    pub owner_id: String,
    #[serde(rename = "type", default)]
    pub kind: SubmitKind,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub payload: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InfoResponse {
    pub gpu: HardwareDescriptor,
    pub status: LockStatus,
    pub agent_version: &'static str,
    pub connection: Connection,
}

/// How clients reach this agent. The access token is never echoed here.
#[derive(Debug, Serialize)]
pub struct Connection {
    pub public_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ClanCreated {
    pub status: &'static str,
    pub keys: ClanKeys,
    pub host_info: Option<Node>,
}

#[derive(Debug, Deserialize)]
pub struct JoinBody {
    pub name: String,
    pub url: String,
    pub hardware: HardwareDescriptor,
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionBody {
    pub model: String,
    #[serde(default)]
    pub messages: Vec<Value>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

// ── Router ────────────────────────────────────────────────────────────────────

/// Build the application router over the shared agent state.
pub fn create_router(state: Shared) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/info", get(info))
        .route("/lock", post(lock))
        .route("/unlock", post(unlock))
        .route("/submit", post(submit))
        .route("/v2/clan/create", post(clan_create))
        .route("/v2/clan/join", post(clan_join))
        .route("/v2/clan/status", get(clan_status))
        .route("/v1/chat/completions", post(chat_completions))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

// ── Handlers ──────────────────────────────────────────────────────────────────

/// `GET /health`: liveness probe.
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}

/// `GET /info`: local device telemetry plus lock status.
///
/// # Errors
/// Returns [`GatewayError::Forbidden`] for credentials outside the agent scope.
pub async fn info(State(state): State<Shared>, caller: Caller) -> Result<Json<InfoResponse>, GatewayError> {
    caller.require(Scope::Agent)?;
    Ok(Json(InfoResponse {
        gpu: state.telemetry.query(),
        status: state.lock.status(),
        agent_version: env!("CARGO_PKG_VERSION"),
        connection: Connection { public_url: state.public_url.clone() },
    }))
}

/// `POST /lock`: acquire the accelerator for `owner_id`.
///
/// # Errors
/// Returns [`GatewayError::Lock`] (503) if the lock is already held.
pub async fn lock(
    State(state): State<Shared>,
    caller: Caller,
    Json(body): Json<LockBody>,
) -> Result<impl IntoResponse, GatewayError> {
    caller.require(Scope::Agent)?;
    let acquired_at = state.lock.lock(&body.owner_id)?;
    Ok(Json(json!({
        "status": "locked",
        "owner_id": body.owner_id,
        "acquired_at": acquired_at,
    })))
}

/// `POST /unlock`: release the accelerator.
///
/// Releasing a free lock succeeds.
///
/// # Errors
/// Returns [`GatewayError::Lock`] (403) if someone else holds the lock.
pub async fn unlock(
    State(state): State<Shared>,
    caller: Caller,
    Json(body): Json<LockBody>,
) -> Result<impl IntoResponse, GatewayError> {
    caller.require(Scope::Agent)?;
    state.lock.unlock(&body.owner_id)?;
    Ok(Json(json!({"status": "unlocked"})))
}

/// `POST /submit`: run source text or a serialized callable for the lock holder.
///
/// Sandbox failures, timeouts included, are reported in the returned outcome
/// with a 200 status.
///
/// # Errors
/// Returns [`GatewayError::LockNotHeld`] if nobody holds the lock,
/// [`GatewayError::NotLockHolder`] if someone else does, or
/// [`GatewayError::InvalidRequest`] if the field for the chosen type is
/// missing or the payload is not valid base64.
pub async fn submit(
    State(state): State<Shared>,
    caller: Caller,
    Json(body): Json<SubmitBody>,
) -> Result<Json<ExecutionOutcome>, GatewayError> {
    caller.require(Scope::Agent)?;

    let status = state.lock.status();
    match status.owner_id.as_deref() {
        None => return Err(GatewayError::LockNotHeld),
        Some(holder) if holder != body.owner_id => {
            return Err(GatewayError::NotLockHolder { owner_id: body.owner_id });
        }
        Some(_) => {}
    }

    let job = match body.kind {
        SubmitKind::Code => {
            let text = body
                .code
                .filter(|c| !c.is_empty())
                .ok_or_else(|| GatewayError::InvalidRequest("missing code".to_owned()))?;
            Job::Source { text }
        }
        SubmitKind::Callable => {
            let encoded = body
                .payload
                .filter(|p| !p.is_empty())
                .ok_or_else(|| GatewayError::InvalidRequest("missing payload".to_owned()))?;
            let bytes = BASE64
                .decode(encoded.as_bytes())
                .map_err(|e| GatewayError::InvalidRequest(format!("payload is not base64: {e}")))?;
            Job::Callable { bytes }
        }
    };

    tracing::info!(owner_id = %body.owner_id, kind = ?body.kind, "job submitted");
    let outcome = state.executor.run(job).await;
    tracing::info!(job_id = %outcome.job_id, status = ?outcome.status, duration_ms = outcome.duration_ms, "job finished");
    Ok(Json(outcome))
}

/// `POST /v2/clan/create`: form a clan with this agent as host.
///
/// The host node takes the current lock holder's id, or a generated
/// `host-node-<hex>` id when the lock is free.
///
/// # Errors
/// Returns [`GatewayError::Clan`] (409) if a clan already exists.
pub async fn clan_create(State(state): State<Shared>, caller: Caller) -> Result<impl IntoResponse, GatewayError> {
    caller.require(Scope::ClanCreate)?;

    let host_id = state
        .lock
        .status()
        .owner_id
        .map_or_else(|| NodeId::generate("host-node"), NodeId::new);
    let host = NodeSpec::new(state.host_name.clone(), state.advertised_url.clone(), state.telemetry.query());
    let keys = state.clan.form(host_id.clone(), host)?;
    let host_info = state.clan.aggregate().nodes.into_iter().find(|n| n.id == host_id);

    Ok(Json(ClanCreated { status: "formed", keys, host_info }))
}

/// `POST /v2/clan/join`: admit a worker whose hardware matches the host.
///
/// # Errors
/// Returns [`GatewayError::Clan`]: 400 naming the failed check if the
/// hardware is incompatible, 409 if no clan is formed.
pub async fn clan_join(
    State(state): State<Shared>,
    caller: Caller,
    Json(body): Json<JoinBody>,
) -> Result<impl IntoResponse, GatewayError> {
    caller.require(Scope::ClanJoin)?;
    let node_id = state.clan.admit_worker(NodeSpec::new(body.name, body.url, body.hardware))?;
    Ok(Json(json!({"status": "joined", "node_id": node_id})))
}

/// `GET /v2/clan/status`: aggregated clan capacity.
///
/// # Errors
/// Returns [`GatewayError::Forbidden`] unless called with the admin or client key.
pub async fn clan_status(State(state): State<Shared>, caller: Caller) -> Result<impl IntoResponse, GatewayError> {
    caller.require(Scope::ClanRead)?;
    Ok(Json(state.clan.aggregate()))
}

/// `POST /v1/chat/completions`: completion request routed to the clan.
///
/// Answers with a canned completion naming the number of active nodes; no
/// model is run.
///
/// # Errors
/// Returns [`GatewayError::NoNodes`] (503) if the clan has no members.
pub async fn chat_completions(
    State(state): State<Shared>,
    caller: Caller,
    Json(body): Json<ChatCompletionBody>,
) -> Result<impl IntoResponse, GatewayError> {
    caller.require(Scope::ClanRead)?;

    let stats = state.clan.aggregate();
    if stats.active_nodes == 0 {
        return Err(GatewayError::NoNodes);
    }

    let id = Uuid::new_v4().simple().to_string();
    Ok(Json(json!({
        "id": format!("chatcmpl-{}", &id[..8]),
        "object": "chat.completion",
        "created": chrono::Utc::now().timestamp(),
        "model": body.model,
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": format!("Processed by gpuhost clan. [Nodes: {}] [Mock Response]", stats.active_nodes),
            },
            "finish_reason": "stop",
        }],
        "usage": {"prompt_tokens": 10, "completion_tokens": 20, "total_tokens": 30},
    })))
}
