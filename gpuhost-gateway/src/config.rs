//! Agent configuration read from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use gpuhost_core::Credential;
use gpuhost_executor::{config::default_runner_path, SandboxConfig, DEFAULT_TIMEOUT};
use uuid::Uuid;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8848";
const DEFAULT_HOST_NAME: &str = "HostSystem";

/// Startup configuration for the gateway.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct GatewayConfig {
    pub listen_addr: SocketAddr,
    /// Operator token guarding every non-clan route.
    pub operator_token: Credential,
    /// `true` when the token was generated rather than configured.
    pub token_generated: bool,
    /// Address advertised for this host in the clan registry.
    pub public_url: Option<String>,
    /// Display name of the host node when a clan is formed.
    pub host_name: String,
    pub sandbox: SandboxConfig,
}

/// A configuration value could not be parsed.
#[derive(Debug, thiserror::Error)]
#[error("invalid value for {var}: '{value}'")]
pub struct ConfigError {
    var: &'static str,
    value: String,
}

impl GatewayConfig {
    /// Reads `GPUHOST_*` variables, falling back to defaults for unset ones.
    ///
    /// # Errors
    /// Returns [`ConfigError`] if a set variable cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    ///
    /// # Errors
    /// Returns [`ConfigError`] if a present value cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let listen_raw = lookup("GPUHOST_LISTEN_ADDR").unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_owned());
        let listen_addr = listen_raw
            .parse()
            .map_err(|_| ConfigError { var: "GPUHOST_LISTEN_ADDR", value: listen_raw.clone() })?;

        let timeout = match lookup("GPUHOST_JOB_TIMEOUT_SECS") {
            None => DEFAULT_TIMEOUT,
            Some(raw) => raw
                .parse()
                .map(Duration::from_secs)
                .map_err(|_| ConfigError { var: "GPUHOST_JOB_TIMEOUT_SECS", value: raw })?,
        };

        let (operator_token, token_generated) = match lookup("GPUHOST_TOKEN").filter(|t| !t.is_empty()) {
            Some(token) => (Credential::new(token), false),
            None => (generate_operator_token(), true),
        };

        let interpreter = lookup("GPUHOST_INTERPRETER").unwrap_or_else(|| "python3".to_owned());
        let extension = lookup("GPUHOST_SOURCE_EXTENSION").unwrap_or_else(|| "py".to_owned());
        let runner = lookup("GPUHOST_RUNNER").map_or_else(default_runner_path, PathBuf::from);

        Ok(Self {
            listen_addr,
            operator_token,
            token_generated,
            public_url: lookup("GPUHOST_PUBLIC_URL").filter(|u| !u.is_empty()),
            host_name: lookup("GPUHOST_HOST_NAME").unwrap_or_else(|| DEFAULT_HOST_NAME.to_owned()),
            sandbox: SandboxConfig::default()
                .with_interpreter(interpreter, &extension)
                .with_runner(runner)
                .with_timeout(timeout),
        })
    }

    /// The URL the host node advertises: the configured public URL, or
    /// `http://localhost:<port>`.
    #[must_use]
    pub fn advertised_url(&self) -> String {
        self.public_url
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}", self.listen_addr.port()))
    }
}

/// An operator token of the form `xxxxxxxx-xxxxxxxx`.
#[must_use]
pub fn generate_operator_token() -> Credential {
    let hex = Uuid::new_v4().simple().to_string();
    Credential::new(format!("{}-{}", &hex[..8], &hex[8..16]))
}
