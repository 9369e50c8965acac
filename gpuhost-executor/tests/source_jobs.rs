//! Integration tests: source jobs run through `/bin/sh`.
//!
//! Each test gets its own scratch root so artifact cleanup can be checked by
//! listing it after the run.

use std::path::Path;
use std::time::{Duration, Instant};

use gpuhost_executor::{JobStatus, ProcessSandbox, SandboxConfig};

fn scratch_root() -> tempfile::TempDir {
    tempfile::tempdir().expect("create scratch root")
}

fn sandbox(root: &Path, timeout: Duration) -> ProcessSandbox {
    ProcessSandbox::new(
        SandboxConfig::default()
            .with_interpreter("/bin/sh", "sh")
            .with_scratch_dir(root)
            .with_timeout(timeout),
    )
}

fn leftover_entries(root: &Path) -> Vec<String> {
    std::fs::read_dir(root)
        .expect("list scratch root")
        .filter_map(Result::ok)
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect()
}

fn read_pid(path: &Path) -> libc::pid_t {
    std::fs::read_to_string(path)
        .expect("job wrote its pid")
        .trim()
        .parse()
        .expect("pid is numeric")
}

/// `true` while `pid` exists and is not a zombie awaiting its reaper.
fn still_running(pid: libc::pid_t) -> bool {
    // SAFETY: signal 0 only checks that the pid exists.
    if unsafe { libc::kill(pid, 0) } != 0 {
        return false;
    }
    // Orphans are reparented and may linger as zombies until reaped.
    match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        Ok(stat) => stat
            .rsplit_once(')')
            .and_then(|(_, rest)| rest.split_whitespace().next())
            .is_none_or(|state| state != "Z"),
        Err(_) => false,
    }
}

#[tokio::test]
async fn successful_job_captures_output_and_cleans_up() {
    let root = scratch_root();
    let outcome = sandbox(root.path(), Duration::from_secs(30))
        .run_source("echo hello from the gpu\necho warning >&2\n")
        .await;

    assert_eq!(outcome.status, JobStatus::Success, "stderr: {}", outcome.stderr);
    assert_eq!(outcome.return_code, 0);
    assert_eq!(outcome.stdout, "hello from the gpu\n");
    assert_eq!(outcome.stderr, "warning\n");
    assert!(outcome.result.is_none(), "source jobs carry no result payload");
    assert!(leftover_entries(root.path()).is_empty(), "artifacts left behind");
}

#[tokio::test]
async fn failing_job_reports_error_and_cleans_up() {
    let root = scratch_root();
    let outcome = sandbox(root.path(), Duration::from_secs(30))
        .run_source("echo partial\necho 'Traceback: boom' >&2\nexit 3\n")
        .await;

    assert_eq!(outcome.status, JobStatus::Error);
    assert_eq!(outcome.return_code, 3);
    assert_eq!(outcome.stdout, "partial\n");
    assert!(outcome.stderr.contains("boom"));
    assert!(leftover_entries(root.path()).is_empty(), "artifacts left behind");
}

#[tokio::test]
async fn job_past_timeout_is_killed_and_reaped() {
    let root = scratch_root();
    let pid_dir = tempfile::tempdir().expect("create pid dir");
    let pid_file = pid_dir.path().join("pid");

    // The background sleep holds stdout open; the whole group must die for
    // the sandbox to return promptly.
    let script = format!(
        "echo $$ > '{}'\nsleep 30 &\nsleep 30\necho never printed\n",
        pid_file.display()
    );

    let started = Instant::now();
    let outcome = sandbox(root.path(), Duration::from_secs(1)).run_source(&script).await;
    let elapsed = started.elapsed();

    assert_eq!(outcome.status, JobStatus::Timeout);
    assert!(outcome.stdout.is_empty());
    assert!(outcome.stderr.contains("timed out"), "got {}", outcome.stderr);
    assert_eq!(outcome.return_code, -1);
    assert!(elapsed < Duration::from_secs(15), "timeout took {elapsed:?}");
    assert!(leftover_entries(root.path()).is_empty(), "artifacts left behind after timeout");

    let pid = read_pid(&pid_file);
    assert!(!still_running(pid), "job process {pid} still running after timeout");
}

#[tokio::test]
async fn cancelled_run_kills_background_children() {
    let root = scratch_root();
    let pid_dir = tempfile::tempdir().expect("create pid dir");
    let pid_file = pid_dir.path().join("pid");

    let script = format!(
        "sleep 60 >/dev/null 2>&1 &\necho $! > '{}'\nsleep 60\n",
        pid_file.display()
    );

    let sandbox = sandbox(root.path(), Duration::from_secs(600));
    let cancelled = tokio::time::timeout(Duration::from_secs(1), sandbox.run_source(&script)).await;
    assert!(cancelled.is_err(), "job should still be running when its future is dropped");

    let pid = read_pid(&pid_file);
    let deadline = Instant::now() + Duration::from_secs(5);
    while still_running(pid) && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(!still_running(pid), "background process {pid} survived a cancelled run");
    assert!(leftover_entries(root.path()).is_empty(), "artifacts left behind after cancellation");
}

#[tokio::test]
async fn long_job_does_not_block_concurrent_jobs() {
    let root = scratch_root();
    let sandbox = sandbox(root.path(), Duration::from_secs(30));

    let slow = sandbox.run_source("sleep 2\necho slow\n");
    let fast = async {
        let started = Instant::now();
        let outcome = sandbox.run_source("echo fast\n").await;
        (outcome, started.elapsed())
    };
    let (slow, (fast, fast_elapsed)) = tokio::join!(slow, fast);

    assert_eq!(slow.stdout, "slow\n");
    assert_eq!(fast.stdout, "fast\n");
    assert!(fast_elapsed < Duration::from_secs(2), "fast job waited {fast_elapsed:?}");
    assert_ne!(slow.job_id, fast.job_id);
}
