// # probereg - Probe Registration
//
// Thin integration layer: reads configuration from the environment, sets up
// logging and a single-threaded runtime, runs one registration and turns the
// outcome into the process exit status. All registration logic lives in
// `probereg-core`.
//
// ## Configuration
//
// All configuration is done via environment variables. Empty values are
// treated as unset.
//
// ### Server API
// - `ZBX_API_URL`: JSON-RPC endpoint (http or https)
// - `ZBX_API_TOKEN`: API token
// - `ZBX_API_TIMEOUT_SECS`: Per-call timeout (default 10)
//
// ### Probe
// - `ZBX_HOSTNAME`: Hostname to register
// - `ZBX_TLSPSKIDENTITY`: PSK identity (default `CommunityProbe`)
// - `ZBX_TLSPSKVALUE`: PSK secret, hex
//
// ### Server objects
// - `ZBX_TEMPLATE_NAME`: Template to link (default `Template Netvaktin`)
// - `ZBX_HOSTGROUP_NAME`: Host group to join (default `Netvaktin Probes`)
//
// ### Logging
// - `PROBEREG_LOG_LEVEL`: trace, debug, info, warn, error (default info)
//
// API, hostname and PSK values are only format-checked when all of them are
// present; a run missing any of them is skipped before they matter.
//
// ## Example
//
// ```bash
// export ZBX_API_URL=https://monitor.example.net/api_jsonrpc.php
// export ZBX_API_TOKEN=your_token
// export ZBX_HOSTNAME=probe-01
// export ZBX_TLSPSKVALUE=$(openssl rand -hex 32)
//
// probereg
// ```

use anyhow::Result;
use probereg_core::config::{
    ApiConfig, DEFAULT_HOST_GROUP_NAME, DEFAULT_PSK_IDENTITY, DEFAULT_TEMPLATE_NAME,
    DEFAULT_TIMEOUT_SECS, DependencyConfig, ProbeConfig, RegistrationConfig,
};
use probereg_core::{Preflight, ReconciliationOutcome, preflight};
use std::process::ExitCode;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for the registration run
///
/// - 0: Host created, PSK synced, or run skipped
/// - 1: Registration failed or configuration invalid
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RegisterExitCode {
    /// Registration succeeded or was legitimately skipped
    Success = 0,
    /// Registration failed, or configuration was rejected
    Failure = 1,
    /// Runtime or logging could not be initialised
    RuntimeError = 2,
}

impl From<RegisterExitCode> for ExitCode {
    fn from(code: RegisterExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

impl From<&ReconciliationOutcome> for RegisterExitCode {
    fn from(outcome: &ReconciliationOutcome) -> Self {
        if outcome.is_failure() {
            RegisterExitCode::Failure
        } else {
            RegisterExitCode::Success
        }
    }
}

/// Application configuration as read from the environment
#[derive(Clone)]
struct EnvConfig {
    api_url: Option<String>,
    api_token: Option<String>,
    api_timeout_secs: u64,
    hostname: Option<String>,
    psk_identity: String,
    psk_value: Option<String>,
    template_name: String,
    host_group_name: String,
    log_level: String,
}

// Custom Debug implementation that hides the API token and PSK
impl std::fmt::Debug for EnvConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvConfig")
            .field("api_url", &self.api_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "<REDACTED>"))
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("hostname", &self.hostname)
            .field("psk_identity", &self.psk_identity)
            .field("psk_value", &self.psk_value.as_ref().map(|_| "<REDACTED>"))
            .field("template_name", &self.template_name)
            .field("host_group_name", &self.host_group_name)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl EnvConfig {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let api_timeout_secs = match var("ZBX_API_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse().map_err(|_| {
                anyhow::anyhow!("ZBX_API_TIMEOUT_SECS must be a whole number of seconds. Got: {raw}")
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            api_url: var("ZBX_API_URL"),
            api_token: var("ZBX_API_TOKEN"),
            api_timeout_secs,
            hostname: var("ZBX_HOSTNAME"),
            psk_identity: var("ZBX_TLSPSKIDENTITY")
                .unwrap_or_else(|| DEFAULT_PSK_IDENTITY.to_string()),
            psk_value: var("ZBX_TLSPSKVALUE"),
            template_name: var("ZBX_TEMPLATE_NAME")
                .unwrap_or_else(|| DEFAULT_TEMPLATE_NAME.to_string()),
            host_group_name: var("ZBX_HOSTGROUP_NAME")
                .unwrap_or_else(|| DEFAULT_HOST_GROUP_NAME.to_string()),
            log_level: var("PROBEREG_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration a run of `registration` depends on
    fn validate(&self, registration: &RegistrationConfig) -> Result<()> {
        self.validate_settings()?;
        self.validate_for_run(registration)
    }

    /// Validate process settings that apply to every run
    fn validate_settings(&self) -> Result<()> {
        if !(1..=120).contains(&self.api_timeout_secs) {
            anyhow::bail!(
                "ZBX_API_TIMEOUT_SECS must be between 1 and 120 seconds. Got: {}",
                self.api_timeout_secs
            );
        }

        parse_log_level(&self.log_level)?;

        Ok(())
    }

    /// Validate the registration inputs, but only for a run that will use them
    ///
    /// A run that preflight skips (API not configured, hostname or PSK
    /// absent) exits cleanly whatever the other values look like.
    fn validate_for_run(&self, registration: &RegistrationConfig) -> Result<()> {
        match preflight(registration) {
            Ok(Preflight::Ready(_)) => self.validate_registration_inputs(),
            Ok(Preflight::Skip(_)) | Err(_) => Ok(()),
        }
    }

    /// Format checks on the API settings, hostname and PSK
    fn validate_registration_inputs(&self) -> Result<()> {
        if let Some(ref url) = self.api_url {
            if !url.starts_with("https://") && !url.starts_with("http://") {
                anyhow::bail!("ZBX_API_URL must use HTTP or HTTPS scheme. Got: {}", url);
            }

            if url.starts_with("http://") {
                eprintln!(
                    "WARNING: ZBX_API_URL uses HTTP (not HTTPS). \
                    The API token and PSK will cross the network in clear text."
                );
            }
        }

        if let Some(ref token) = self.api_token {
            let token_lower = token.to_lowercase();
            if token_lower.contains("your_token")
                || token_lower.contains("replace_me")
                || token_lower.contains("changeme")
                || token_lower == "token"
            {
                anyhow::bail!(
                    "ZBX_API_TOKEN appears to be a placeholder. \
                    Use an API token generated on the monitoring server."
                );
            }
        }

        if let Some(ref psk) = self.psk_value {
            validate_psk(psk)?;
        }

        if let Some(ref hostname) = self.hostname
            && hostname.len() > 128
        {
            anyhow::bail!(
                "ZBX_HOSTNAME too long: {} chars (max 128)",
                hostname.len()
            );
        }

        Ok(())
    }

    /// Build the core registration configuration
    fn registration_config(&self) -> RegistrationConfig {
        RegistrationConfig {
            api: ApiConfig {
                url: self.api_url.clone(),
                token: self.api_token.clone(),
                timeout_secs: self.api_timeout_secs,
            },
            probe: ProbeConfig {
                hostname: self.hostname.clone(),
                psk_identity: self.psk_identity.clone(),
                psk_value: self.psk_value.clone(),
            },
            dependencies: DependencyConfig {
                template_name: self.template_name.clone(),
                host_group_name: self.host_group_name.clone(),
            },
        }
    }
}

/// Check a PSK the way the agent will accept it: hex digits, whole bytes,
/// 128 to 2048 bits
fn validate_psk(psk: &str) -> Result<()> {
    if !psk.chars().all(|c| c.is_ascii_hexdigit()) {
        anyhow::bail!("ZBX_TLSPSKVALUE must contain hexadecimal digits only");
    }

    if psk.len() % 2 != 0 {
        anyhow::bail!(
            "ZBX_TLSPSKVALUE must have an even number of hex digits. Got: {}",
            psk.len()
        );
    }

    if !(32..=512).contains(&psk.len()) {
        anyhow::bail!(
            "ZBX_TLSPSKVALUE must be between 32 and 512 hex digits. Got: {}",
            psk.len()
        );
    }

    Ok(())
}

fn parse_log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "PROBEREG_LOG_LEVEL '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            level
        ),
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match EnvConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return RegisterExitCode::Failure.into();
        }
    };

    // Validate configuration
    let registration = config.registration_config();
    if let Err(e) = config.validate(&registration) {
        eprintln!("Configuration validation error: {}", e);
        return RegisterExitCode::Failure.into();
    }

    // Initialize tracing
    let log_level = parse_log_level(&config.log_level).unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return RegisterExitCode::RuntimeError.into();
    }

    // One run, one thread
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return RegisterExitCode::RuntimeError.into();
        }
    };

    let outcome = rt.block_on(run_registration(registration));

    RegisterExitCode::from(&outcome).into()
}

/// Run one registration under the `auto_register` span
#[cfg(feature = "http")]
async fn run_registration(config: RegistrationConfig) -> ReconciliationOutcome {
    use probereg_core::Registrar;
    use probereg_rpc_http::JsonRpcHttpFactory;
    use tracing::Instrument;

    let span = tracing::info_span!("auto_register");
    async move {
        info!("Starting probe registration");
        Registrar::new(config, Box::new(JsonRpcHttpFactory))
            .run()
            .await
    }
    .instrument(span)
    .await
}

/// Without a transport the run cannot reach the server
#[cfg(not(feature = "http"))]
async fn run_registration(_config: RegistrationConfig) -> ReconciliationOutcome {
    let _span = tracing::info_span!("auto_register").entered();
    error!("probereg was built without the `http` feature; no transport available");
    ReconciliationOutcome::Failed(probereg_core::FailureKind::Transport)
}
