//! Accelerator descriptor reported by telemetry and exchanged on clan join.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Architecture reported when the device name matches no known family.
pub const UNKNOWN_ARCH: &str = "Unknown";

/// Snapshot of the primary accelerator's identity and memory.
///
/// Regenerated on every telemetry query and never persisted. Fields missing
/// from a JSON payload fall back to zero/unknown values, so a worker that
/// reports a partial descriptor still deserializes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct HardwareDescriptor {
    /// Device name as reported by the driver, e.g. `"NVIDIA GeForce RTX 3050"`.
    #[serde(default)]
    pub name: String,
    /// Architecture family, resolved by [`infer_architecture`].
    #[serde(default = "unknown_arch")]
    pub arch: String,
    /// Compute capability as `"major.minor"`.
    #[serde(default = "zero_capability")]
    pub cuda_capability: String,
    /// Whether the device has tensor cores (capability ≥ 7.0).
    #[serde(default)]
    pub tensor_cores: bool,
    /// Total device memory in bytes.
    #[serde(default)]
    pub memory_total: u64,
    /// Free device memory in bytes.
    #[serde(default)]
    pub memory_free: u64,
    /// Used device memory in bytes.
    #[serde(default)]
    pub memory_used: u64,
    /// Driver version string.
    #[serde(default)]
    pub driver_version: String,
}

fn unknown_arch() -> String {
    UNKNOWN_ARCH.to_owned()
}

fn zero_capability() -> String {
    ComputeCapability::default().to_string()
}

/// Raw memory figures for a device, in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryFigures {
    pub total: u64,
    pub free: u64,
    pub used: u64,
}

impl HardwareDescriptor {
    /// Builds a descriptor from raw device readings, deriving the
    /// architecture family and tensor-core flag.
    #[must_use]
    pub fn from_device(
        name: impl Into<String>,
        capability: ComputeCapability,
        memory: MemoryFigures,
        driver_version: impl Into<String>,
    ) -> Self {
        let name = name.into();
        Self {
            arch: infer_architecture(&name).to_owned(),
            cuda_capability: capability.to_string(),
            tensor_cores: capability.has_tensor_cores(),
            memory_total: memory.total,
            memory_free: memory.free,
            memory_used: memory.used,
            driver_version: driver_version.into(),
            name,
        }
    }

    /// The descriptor reported when no device can be queried.
    #[must_use]
    pub fn fallback() -> Self {
        let memory = 24_000 * 1024 * 1024;
        Self {
            name: "Mock NVIDIA GPU (Simulated)".to_owned(),
            arch: "Ampere (Simulated)".to_owned(),
            cuda_capability: "8.6".to_owned(),
            tensor_cores: true,
            memory_total: memory,
            memory_free: memory,
            memory_used: 0,
            driver_version: "535.00 (Mock)".to_owned(),
        }
    }
}

/// Maps a free-text device name to an architecture family.
///
/// Substring heuristic over common product lines; returns [`UNKNOWN_ARCH`]
/// when nothing matches.
#[must_use]
pub fn infer_architecture(device_name: &str) -> &'static str {
    const FAMILIES: &[(&[&str], &str)] = &[
        (&["RTX 30", "A100"], "Ampere"),
        (&["RTX 40", "H100"], "Lovelace/Hopper"),
        (&["RTX 20", "T4"], "Turing"),
        (&["GTX 10"], "Pascal"),
    ];

    FAMILIES
        .iter()
        .find(|(needles, _)| needles.iter().any(|n| device_name.contains(n)))
        .map_or(UNKNOWN_ARCH, |(_, family)| *family)
}

/// CUDA compute capability, `major.minor`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComputeCapability {
    pub major: u32,
    pub minor: u32,
}

impl ComputeCapability {
    #[must_use]
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Volta (7.0) and later ship tensor cores.
    #[must_use]
    pub fn has_tensor_cores(self) -> bool {
        self.major >= 7
    }
}

impl fmt::Display for ComputeCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for ComputeCapability {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::InvalidCapability { value: s.to_owned() };
        let (major, minor) = s.trim().split_once('.').ok_or_else(invalid)?;
        Ok(Self {
            major: major.parse().map_err(|_| invalid())?,
            minor: minor.parse().map_err(|_| invalid())?,
        })
    }
}
