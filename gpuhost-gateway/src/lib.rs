//! HTTP agent for sharing a local accelerator.
//!
//! Exposes the accelerator lock, job submission into the process sandbox,
//! and the clan registry behind bearer-token authorization.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod telemetry;
