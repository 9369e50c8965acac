//! Core state for the gpuhost agent.
//!
//! Holds the accelerator lock, the clan membership registry with its
//! hardware compatibility predicate, and the hardware descriptor shared
//! between telemetry and clan admission.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod clan;
pub mod compat;
pub mod error;
pub mod hardware;
pub mod id;
pub mod lock;

pub use clan::{ClanKeys, ClanRegistry, ClanRole, ClanStats, Node, NodeRole, NodeSpec, NodeStatus};
pub use compat::check_compatibility;
pub use error::{ClanError, CoreError, Incompatibility, LockError};
pub use hardware::{infer_architecture, ComputeCapability, HardwareDescriptor, MemoryFigures};
pub use id::{ClanId, Credential, NodeId};
pub use lock::{LockStatus, ResourceLock};
