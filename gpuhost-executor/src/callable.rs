//! Serialized callables: a closed set of typed remote operations.
//!
//! A callable takes no arguments; everything it needs travels in its
//! serialized form. The runner decodes one [`RemoteCall`], invokes it, and
//! writes the JSON encoding of the returned value. `Exec` runs whatever
//! program it names, so the runner trusts its payload exactly as far as the
//! caller holding the accelerator lock is trusted.

use std::process::Command;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ExecutorError;

/// A no-argument operation executed by the callable runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
#[non_exhaustive]
pub enum RemoteCall {
    /// Returns `value` unchanged.
    Constant { value: Value },

    /// Runs `program` with `args` and returns its stdout as a string.
    Exec {
        program: String,
        #[serde(default)]
        args: Vec<String>,
    },

    /// Sleeps for `millis`, then returns `value`.
    Sleep { millis: u64, value: Value },
}

impl RemoteCall {
    /// A callable that returns `value`.
    pub fn constant(value: impl Into<Value>) -> Self {
        Self::Constant { value: value.into() }
    }

    /// Serializes this call into the bytes submitted as a callable job.
    ///
    /// # Errors
    /// Returns [`ExecutorError::InvalidPayload`] if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ExecutorError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decodes a call from its serialized bytes.
    ///
    /// # Errors
    /// Returns [`ExecutorError::InvalidPayload`] if `bytes` is not a valid call.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ExecutorError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Invokes the call on the current thread.
    ///
    /// # Errors
    /// Returns [`ExecutorError::SpawnFailed`] if `Exec` cannot start its
    /// program, or [`ExecutorError::CallFailed`] if the program exits non-zero.
    pub fn invoke(self) -> Result<Value, ExecutorError> {
        match self {
            Self::Constant { value } => Ok(value),
            Self::Sleep { millis, value } => {
                std::thread::sleep(Duration::from_millis(millis));
                Ok(value)
            }
            Self::Exec { program, args } => {
                let output = Command::new(&program)
                    .args(&args)
                    .output()
                    .map_err(|source| ExecutorError::SpawnFailed {
                        program: program.clone().into(),
                        source,
                    })?;
                if !output.status.success() {
                    return Err(ExecutorError::CallFailed(format!(
                        "{program} exited with {}: {}",
                        output.status,
                        String::from_utf8_lossy(&output.stderr).trim_end()
                    )));
                }
                Ok(Value::String(String::from_utf8_lossy(&output.stdout).into_owned()))
            }
        }
    }
}

/// Encodes a callable's return value for the output file.
///
/// # Errors
/// Returns [`ExecutorError::InvalidPayload`] if `value` cannot be serialized.
pub fn encode_result(value: &Value) -> Result<Vec<u8>, ExecutorError> {
    Ok(serde_json::to_vec(value)?)
}

/// Decodes a callable's return value from the bytes the runner wrote.
///
/// # Errors
/// Returns [`ExecutorError::InvalidPayload`] if `bytes` is not valid JSON.
pub fn decode_result(bytes: &[u8]) -> Result<Value, ExecutorError> {
    Ok(serde_json::from_slice(bytes)?)
}
