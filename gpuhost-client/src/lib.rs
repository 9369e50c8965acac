//! Client for a remote gpuhost agent.
//!
//! [`GpuClient`] holds one agent URL, one access token, and a generated
//! owner id. It takes the accelerator lock, submits work while holding it,
//! and releases it again.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod client;
pub mod error;

pub use client::{AgentInfo, ConnectionInfo, GpuClient};
pub use error::ClientError;
