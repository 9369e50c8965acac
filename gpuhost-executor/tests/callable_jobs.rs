//! Integration tests: callable jobs through the real `gpuhost-runner` binary.

use std::path::{Path, PathBuf};
use std::time::Duration;

use gpuhost_executor::{decode_result, sha256_hex, Job, JobExecutor, JobStatus, ProcessSandbox, RemoteCall, SandboxConfig};
use serde_json::json;

fn runner() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_gpuhost-runner"))
}

fn sandbox(root: &Path, timeout: Duration) -> ProcessSandbox {
    ProcessSandbox::new(
        SandboxConfig::default()
            .with_runner(runner())
            .with_scratch_dir(root)
            .with_timeout(timeout),
    )
}

fn assert_no_leftovers(root: &Path) {
    let leftovers: Vec<_> = std::fs::read_dir(root)
        .expect("list scratch root")
        .filter_map(Result::ok)
        .map(|e| e.path())
        .collect();
    assert!(leftovers.is_empty(), "artifacts left behind: {leftovers:?}");
}

#[tokio::test]
async fn hello_world_round_trips_exactly() {
    let root = tempfile::tempdir().expect("create scratch root");
    let payload = RemoteCall::constant("Hello World").to_bytes().expect("encode call");

    let outcome = sandbox(root.path(), Duration::from_secs(30)).run_callable(&payload).await;

    assert_eq!(outcome.status, JobStatus::Success, "stderr: {}", outcome.stderr);
    let bytes = outcome.result_bytes().expect("result payload present");
    assert_eq!(decode_result(&bytes).expect("decode result"), json!("Hello World"));
    assert_eq!(outcome.result_sha256.as_deref(), Some(sha256_hex(&bytes).as_str()));
    assert_no_leftovers(root.path());
}

#[tokio::test]
async fn structured_value_matches_direct_invocation() {
    let root = tempfile::tempdir().expect("create scratch root");
    let call = RemoteCall::constant(json!({"weights": [0.5, 0.25], "epoch": 3}));
    let direct = call.clone().invoke().expect("direct invoke");

    let outcome = sandbox(root.path(), Duration::from_secs(30))
        .run(Job::Callable { bytes: call.to_bytes().expect("encode call") })
        .await;

    let bytes = outcome.result_bytes().expect("result payload present");
    assert_eq!(decode_result(&bytes).expect("decode result"), direct);
    assert_no_leftovers(root.path());
}

#[tokio::test]
async fn exec_call_returns_program_stdout() {
    let root = tempfile::tempdir().expect("create scratch root");
    let call = RemoteCall::Exec { program: "echo".to_owned(), args: vec!["nvidia-smi-ish".to_owned()] };

    let outcome = sandbox(root.path(), Duration::from_secs(30))
        .run_callable(&call.to_bytes().expect("encode call"))
        .await;

    assert_eq!(outcome.status, JobStatus::Success, "stderr: {}", outcome.stderr);
    let bytes = outcome.result_bytes().expect("result payload present");
    assert_eq!(decode_result(&bytes).expect("decode result"), json!("nvidia-smi-ish\n"));
}

#[tokio::test]
async fn undecodable_payload_surfaces_runner_stderr() {
    let root = tempfile::tempdir().expect("create scratch root");

    let outcome = sandbox(root.path(), Duration::from_secs(30))
        .run_callable(b"\x80\x04\x95not a remote call")
        .await;

    assert_eq!(outcome.status, JobStatus::Error);
    assert_ne!(outcome.return_code, 0);
    assert!(outcome.stderr.contains("invalid callable payload"), "got {}", outcome.stderr);
    assert!(outcome.result.is_none());
    assert_no_leftovers(root.path());
}

#[tokio::test]
async fn failing_exec_is_error_not_crash() {
    let root = tempfile::tempdir().expect("create scratch root");
    let call = RemoteCall::Exec { program: "false".to_owned(), args: vec![] };

    let outcome = sandbox(root.path(), Duration::from_secs(30))
        .run_callable(&call.to_bytes().expect("encode call"))
        .await;

    assert_eq!(outcome.status, JobStatus::Error);
    assert!(outcome.stderr.contains("remote call failed"), "got {}", outcome.stderr);
    assert_no_leftovers(root.path());
}

#[tokio::test]
async fn slow_callable_times_out() {
    let root = tempfile::tempdir().expect("create scratch root");
    let call = RemoteCall::Sleep { millis: 30_000, value: json!(null) };

    let outcome = sandbox(root.path(), Duration::from_secs(1))
        .run_callable(&call.to_bytes().expect("encode call"))
        .await;

    assert_eq!(outcome.status, JobStatus::Timeout);
    assert!(outcome.result.is_none());
    assert_no_leftovers(root.path());
}

#[tokio::test]
async fn missing_runner_is_internal_error() {
    let root = tempfile::tempdir().expect("create scratch root");
    let sandbox = ProcessSandbox::new(
        SandboxConfig::default()
            .with_runner("/nonexistent/gpuhost-runner")
            .with_scratch_dir(root.path()),
    );

    let outcome = sandbox
        .run_callable(&RemoteCall::constant(1).to_bytes().expect("encode call"))
        .await;

    assert_eq!(outcome.status, JobStatus::InternalError);
    assert_no_leftovers(root.path());
}
