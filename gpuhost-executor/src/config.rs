//! Sandbox configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Default wall-clock budget for a single job: ten minutes, enough to load a model.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// File name of the callable runner binary.
pub const RUNNER_BIN: &str = "gpuhost-runner";

/// How the sandbox launches jobs.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct SandboxConfig {
    /// Program that executes source jobs, given the materialized file as its
    /// only argument.
    pub interpreter: PathBuf,

    /// Extension of the materialized source file (without the dot).
    pub source_extension: String,

    /// Path to the `gpuhost-runner` binary used for callable jobs.
    pub runner_path: PathBuf,

    /// Wall-clock limit after which the job's process group is killed.
    pub timeout: Duration,

    /// Directory under which per-job scratch directories are created.
    pub scratch_dir: PathBuf,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            interpreter: PathBuf::from("python3"),
            source_extension: "py".to_owned(),
            runner_path: default_runner_path(),
            timeout: DEFAULT_TIMEOUT,
            scratch_dir: std::env::temp_dir(),
        }
    }
}

impl SandboxConfig {
    /// Use `interpreter` for source jobs, writing sources with `extension`.
    #[must_use]
    pub fn with_interpreter(mut self, interpreter: impl Into<PathBuf>, extension: &str) -> Self {
        self.interpreter = interpreter.into();
        extension.trim_start_matches('.').clone_into(&mut self.source_extension);
        self
    }

    #[must_use]
    pub fn with_runner(mut self, runner_path: impl Into<PathBuf>) -> Self {
        self.runner_path = runner_path.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_scratch_dir(mut self, scratch_dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = scratch_dir.into();
        self
    }
}

/// The runner shipped next to the current executable, or a bare
/// `gpuhost-runner` resolved through `PATH`.
#[must_use]
pub fn default_runner_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(RUNNER_BIN)))
        .filter(|candidate| candidate.exists())
        .unwrap_or_else(|| PathBuf::from(RUNNER_BIN))
}
