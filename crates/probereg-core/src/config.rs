//! Configuration types for probe registration
//!
//! The configuration is built once at startup and passed by reference into
//! the registration run. Nothing in the core reads the process environment.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default PSK identity when none is configured
pub const DEFAULT_PSK_IDENTITY: &str = "CommunityProbe";

/// Default template linked to registered probes
pub const DEFAULT_TEMPLATE_NAME: &str = "Template Netvaktin";

/// Default host group registered probes are placed in
pub const DEFAULT_HOST_GROUP_NAME: &str = "Netvaktin Probes";

/// Default per-call timeout against the server API
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Main registration configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrationConfig {
    /// Server API access
    #[serde(default)]
    pub api: ApiConfig,

    /// Identity and credentials of this probe
    #[serde(default)]
    pub probe: ProbeConfig,

    /// Names of the server-side objects the host must reference
    #[serde(default)]
    pub dependencies: DependencyConfig,
}

impl RegistrationConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the parts of the configuration that are present
    ///
    /// Absent values are not errors here; whether an absence means "skip"
    /// or "fail" is decided by the registration preflight.
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.api.validate()?;
        self.dependencies.validate()?;

        if let Some(hostname) = &self.probe.hostname
            && hostname.trim() != hostname
        {
            return Err(crate::Error::config(
                "Hostname must not have leading or trailing whitespace",
            ));
        }

        if self.probe.psk_identity.is_empty() {
            return Err(crate::Error::config("PSK identity cannot be empty"));
        }

        Ok(())
    }
}

/// Server API configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// JSON-RPC endpoint, e.g. `https://monitor.example.net/api_jsonrpc.php`
    #[serde(default)]
    pub url: Option<String>,

    /// API token, attached to every request
    /// ⚠️ NEVER log this value
    #[serde(default)]
    pub token: Option<String>,

    /// Per-call timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("url", &self.url)
            .field("token", &self.token.as_ref().map(|_| "<REDACTED>"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: None,
            token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ApiConfig {
    /// Validate the API configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.timeout_secs == 0 {
            return Err(crate::Error::config("API timeout must be > 0"));
        }

        if let Some(url) = &self.url
            && !url.starts_with("https://")
            && !url.starts_with("http://")
        {
            return Err(crate::Error::config(format!(
                "API URL must use HTTP or HTTPS scheme. Got: {url}"
            )));
        }

        Ok(())
    }

    /// Whether either half of the API access is configured
    pub fn is_requested(&self) -> bool {
        self.url.is_some() || self.token.is_some()
    }

    /// Build the endpoint if both URL and token are present
    pub fn endpoint(&self) -> Option<ApiEndpoint> {
        match (&self.url, &self.token) {
            (Some(url), Some(token)) => Some(ApiEndpoint {
                url: url.clone(),
                token: token.clone(),
                timeout: Duration::from_secs(self.timeout_secs),
            }),
            _ => None,
        }
    }
}

/// A fully specified server endpoint, ready to build a client from
#[derive(Clone, PartialEq, Eq)]
pub struct ApiEndpoint {
    /// JSON-RPC endpoint URL
    pub url: String,
    /// API token
    /// ⚠️ NEVER log this value
    pub token: String,
    /// Per-call timeout
    pub timeout: Duration,
}

impl std::fmt::Debug for ApiEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiEndpoint")
            .field("url", &self.url)
            .field("token", &"<REDACTED>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Probe identity configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Hostname the probe registers under
    #[serde(default)]
    pub hostname: Option<String>,

    /// PSK identity presented during the TLS handshake
    #[serde(default = "default_psk_identity")]
    pub psk_identity: String,

    /// PSK secret (hex)
    /// ⚠️ NEVER log this value
    #[serde(default)]
    pub psk_value: Option<String>,
}

impl std::fmt::Debug for ProbeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeConfig")
            .field("hostname", &self.hostname)
            .field("psk_identity", &self.psk_identity)
            .field("psk_value", &self.psk_value.as_ref().map(|_| "<REDACTED>"))
            .finish()
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            hostname: None,
            psk_identity: default_psk_identity(),
            psk_value: None,
        }
    }
}

impl ProbeConfig {
    /// Create a probe configuration for a hostname and PSK value
    pub fn new(hostname: impl Into<String>, psk_value: impl Into<String>) -> Self {
        Self {
            hostname: Some(hostname.into()),
            psk_identity: default_psk_identity(),
            psk_value: Some(psk_value.into()),
        }
    }

    /// Set the PSK identity
    pub fn with_psk_identity(mut self, psk_identity: impl Into<String>) -> Self {
        self.psk_identity = psk_identity.into();
        self
    }
}

/// Names of the template and host group a registered host references
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyConfig {
    /// Template name (the template's technical `host` name)
    #[serde(default = "default_template_name")]
    pub template_name: String,

    /// Host group name
    #[serde(default = "default_host_group_name")]
    pub host_group_name: String,
}

impl Default for DependencyConfig {
    fn default() -> Self {
        Self {
            template_name: default_template_name(),
            host_group_name: default_host_group_name(),
        }
    }
}

impl DependencyConfig {
    /// Validate the dependency names
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.template_name.is_empty() {
            return Err(crate::Error::config("Template name cannot be empty"));
        }
        if self.host_group_name.is_empty() {
            return Err(crate::Error::config("Host group name cannot be empty"));
        }
        Ok(())
    }
}

fn default_psk_identity() -> String {
    DEFAULT_PSK_IDENTITY.to_string()
}

fn default_template_name() -> String {
    DEFAULT_TEMPLATE_NAME.to_string()
}

fn default_host_group_name() -> String {
    DEFAULT_HOST_GROUP_NAME.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
