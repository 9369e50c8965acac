//! Process-wide agent state shared by every handler.

use std::sync::Arc;

use gpuhost_core::{ClanRegistry, Credential, ResourceLock};
use gpuhost_executor::{JobExecutor, ProcessSandbox};

use crate::auth::Access;
use crate::config::GatewayConfig;
use crate::telemetry::TelemetrySource;

/// Everything a request handler can touch. Built once at startup and shared
/// behind an [`Arc`].
#[non_exhaustive]
pub struct AppState {
    pub lock: ResourceLock,
    pub clan: ClanRegistry,
    pub executor: Arc<dyn JobExecutor>,
    pub telemetry: Arc<dyn TelemetrySource>,
    pub operator_token: Credential,
    pub host_name: String,
    pub public_url: Option<String>,
    pub advertised_url: String,
}

impl AppState {
    /// Builds state with explicit executor and telemetry implementations.
    #[must_use]
    pub fn new(
        config: &GatewayConfig,
        executor: Arc<dyn JobExecutor>,
        telemetry: Arc<dyn TelemetrySource>,
    ) -> Self {
        Self {
            lock: ResourceLock::new(),
            clan: ClanRegistry::new(),
            executor,
            telemetry,
            operator_token: config.operator_token.clone(),
            host_name: config.host_name.clone(),
            public_url: config.public_url.clone(),
            advertised_url: config.advertised_url(),
        }
    }

    /// Builds state backed by the process sandbox and the local device.
    #[must_use]
    pub fn from_config(config: &GatewayConfig) -> Self {
        let executor = Arc::new(ProcessSandbox::new(config.sandbox.clone()));
        Self::new(config, executor, local_telemetry())
    }

    /// Resolves a presented token to the access it grants.
    #[must_use]
    pub fn resolve(&self, token: &str) -> Option<Access> {
        if self.operator_token.matches(token) {
            return Some(Access::Operator);
        }
        self.clan.role_for(token).map(Access::from)
    }
}

#[cfg(feature = "nvml")]
fn local_telemetry() -> Arc<dyn TelemetrySource> {
    Arc::new(crate::telemetry::NvmlTelemetry::new())
}

#[cfg(not(feature = "nvml"))]
fn local_telemetry() -> Arc<dyn TelemetrySource> {
    Arc::new(crate::telemetry::MockTelemetry)
}
