//! Drives a real agent, served on an ephemeral local port, through `GpuClient`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use gpuhost_client::{ClientError, GpuClient};
use gpuhost_core::LockError;
use gpuhost_executor::{
    decode_result, encode_result, sha256_hex, ExecutionOutcome, Job, JobExecutor, JobStatus, ProcessSandbox,
    RemoteCall, SandboxConfig,
};
use gpuhost_gateway::{config::GatewayConfig, routes::create_router, state::AppState, telemetry::MockTelemetry};
use serde_json::json;
use tempfile::TempDir;

const TOKEN: &str = "client-test-token";

/// Runs source jobs under `/bin/sh` and invokes callables in-process.
struct ShellAndInline {
    sandbox: ProcessSandbox,
}

#[async_trait]
impl JobExecutor for ShellAndInline {
    async fn run(&self, job: Job) -> ExecutionOutcome {
        let Job::Callable { bytes } = job else {
            return self.sandbox.run(job).await;
        };
        let call = RemoteCall::from_bytes(&bytes).expect("client must send a valid call");
        let value = call.invoke().expect("call must succeed");
        let encoded = encode_result(&value).expect("value must encode");
        serde_json::from_value(json!({
            "job_id": uuid::Uuid::new_v4(),
            "status": "success",
            "stdout": "",
            "stderr": "",
            "return_code": 0,
            "result": BASE64.encode(&encoded),
            "result_sha256": sha256_hex(&encoded),
            "duration_ms": 0,
        }))
        .expect("outcome must deserialize")
    }
}

/// Serves a fresh agent and returns its base URL plus the scratch directory
/// that must outlive it.
async fn spawn_agent() -> (String, TempDir) {
    let scratch = tempfile::tempdir().expect("scratch dir");
    let sandbox = ProcessSandbox::new(
        SandboxConfig::default()
            .with_interpreter("/bin/sh", "sh")
            .with_scratch_dir(scratch.path())
            .with_timeout(Duration::from_secs(10)),
    );
    let config = GatewayConfig::from_lookup(|var| (var == "GPUHOST_TOKEN").then(|| TOKEN.to_owned()))
        .expect("config must parse");
    let state = Arc::new(AppState::new(&config, Arc::new(ShellAndInline { sandbox }), Arc::new(MockTelemetry)));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move { axum::serve(listener, create_router(state)).await });
    (format!("http://{addr}/"), scratch)
}

#[tokio::test]
async fn info_reports_device_and_rejects_bad_token() {
    let (url, _scratch) = spawn_agent().await;

    let info = GpuClient::new(&url, TOKEN).info().await.expect("info");
    assert_eq!(info.gpu.name, "Mock NVIDIA GPU (Simulated)");
    assert!(!info.status.is_locked);
    assert!(info.connection.public_url.is_none());

    let denied = GpuClient::new(&url, "wrong").info().await;
    assert!(matches!(denied, Err(ClientError::Forbidden { .. })), "got {denied:?}");
}

#[tokio::test]
async fn second_owner_sees_busy_until_unlock() {
    let (url, _scratch) = spawn_agent().await;
    let alice = GpuClient::new(&url, TOKEN);
    let bob = GpuClient::new(&url, TOKEN);

    alice.lock().await.expect("alice locks");
    let info = bob.info().await.expect("info");
    assert_eq!(info.status.owner_id.as_deref(), Some(alice.owner_id()));

    let busy = bob.lock().await;
    assert!(matches!(busy, Err(ClientError::Lock(LockError::Busy))), "got {busy:?}");
    assert!(!bob.try_lock().await.expect("try_lock"));

    let refused = bob.unlock().await;
    assert!(matches!(refused, Err(ClientError::Forbidden { .. })), "got {refused:?}");

    alice.unlock().await.expect("alice unlocks");
    assert!(bob.try_lock().await.expect("try_lock"));
}

#[tokio::test]
async fn submit_code_and_run_file_execute_remotely() {
    let (url, _scratch) = spawn_agent().await;
    let client = GpuClient::new(&url, TOKEN);

    let unlocked = client.submit_code("echo hi").await;
    assert!(matches!(unlocked, Err(ClientError::Status { status: 400, .. })), "got {unlocked:?}");

    client.lock().await.expect("lock");
    let outcome = client.submit_code("echo hi").await.expect("submit");
    assert_eq!(outcome.status, JobStatus::Success);
    assert_eq!(outcome.stdout, "hi\n");

    let dir = tempfile::tempdir().expect("source dir");
    let script = dir.path().join("job.sh");
    std::fs::write(&script, "echo from-file\nexit 3\n").expect("write script");
    let outcome = client.run_file(&script).await.expect("run_file");
    assert_eq!(outcome.status, JobStatus::Error);
    assert_eq!(outcome.stdout, "from-file\n");
    assert_eq!(outcome.return_code, 3);

    let missing = client.run_file(dir.path().join("absent.sh")).await;
    assert!(matches!(missing, Err(ClientError::ReadFile { .. })), "got {missing:?}");
}

#[tokio::test]
async fn submit_callable_returns_decoded_value() {
    let (url, _scratch) = spawn_agent().await;
    let client = GpuClient::new(&url, TOKEN);
    client.lock().await.expect("lock");

    let outcome = client
        .submit_callable(&RemoteCall::constant(json!({"sum": 42})))
        .await
        .expect("submit callable");
    assert!(outcome.is_success());

    let bytes = outcome.result_bytes().expect("result present");
    assert_eq!(outcome.result_sha256.as_deref(), Some(sha256_hex(&bytes).as_str()));
    assert_eq!(decode_result(&bytes).expect("decode"), json!({"sum": 42}));
}
