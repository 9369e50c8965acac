//! Out-of-process job execution for the gpuhost agent.
//!
//! Runs submitted source text or serialized callables in child processes
//! with a hard wall-clock limit, captures their output, and removes every
//! temporary artifact afterwards.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod backend;
pub mod callable;
pub mod config;
pub mod error;
mod handle;
pub mod job;
pub mod sandbox;

pub use backend::JobExecutor;
pub use callable::{decode_result, encode_result, RemoteCall};
pub use config::{SandboxConfig, DEFAULT_TIMEOUT};
pub use error::ExecutorError;
pub use job::{sha256_hex, ExecutionOutcome, Job, JobId, JobStatus};
pub use sandbox::ProcessSandbox;
