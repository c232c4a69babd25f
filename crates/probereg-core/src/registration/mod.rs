//! Registration run
//!
//! The Registrar is responsible for:
//! - Deciding from configuration alone whether a run is skipped
//! - Building the RPC client only when the network is actually needed
//! - Resolving the template and host group before anything is mutated
//! - Handing over to the HostReconciler and reporting its outcome
//!
//! ## Flow
//!
//! ```text
//! RegistrationConfig ──preflight──▶ Skip ─────────────────────────────▶ Skipped
//!                                    │
//!                                  Ready ──connect──▶ Resolver ──▶ HostReconciler
//!                                                       │               │
//!                                                    Failed     Created/Updated/Failed
//! ```
//!
//! Every step runs sequentially on the caller's task; nothing is spawned.

use std::sync::Arc;
use tracing::{debug, error, info};

use crate::config::{ApiEndpoint, RegistrationConfig};
use crate::error::{Error, FailureKind, Result};
use crate::model::{DependencyRef, DesiredProbeIdentity, ReconciliationOutcome};
use crate::reconciler::HostReconciler;
use crate::resolver::{ResourceKind, Resolver};
use crate::traits::{RpcClient, RpcClientFactory};

/// Result of checking configuration before touching the network
#[derive(Debug)]
pub enum Preflight {
    /// Everything needed for a registration is present
    Ready(ReadyRun),
    /// Registration is not enabled or not possible; nothing will be sent
    Skip(String),
}

/// Inputs of a run that will contact the server
#[derive(Debug)]
pub struct ReadyRun {
    /// Server endpoint
    pub endpoint: ApiEndpoint,
    /// Desired host identity and credentials
    pub identity: DesiredProbeIdentity,
    /// Template and host group, unresolved
    pub dependencies: Vec<DependencyRef>,
}

/// Classify a configuration without any I/O
///
/// - Neither API URL nor token → skip (registration not enabled)
/// - Hostname or PSK value absent → skip
/// - Only one of URL and token → `ConfigMissing` error (registration
///   requested but incomplete)
///
/// Skips are decided before anything is validated, so values a skipped
/// run would never use cannot fail it.
pub fn preflight(config: &RegistrationConfig) -> Result<Preflight> {
    if !config.api.is_requested() {
        return Ok(Preflight::Skip(
            "No API token/URL provided, skipping API registration".to_string(),
        ));
    }

    let (Some(hostname), Some(psk_value)) = (&config.probe.hostname, &config.probe.psk_value)
    else {
        return Ok(Preflight::Skip(
            "Missing hostname or PSK, cannot register".to_string(),
        ));
    };

    // A lone URL or token is a broken configuration, not a disabled feature.
    let endpoint = config.api.endpoint().ok_or_else(|| {
        Error::config_missing("API URL and API token must both be set to register")
    })?;

    config.validate()?;

    let identity =
        DesiredProbeIdentity::new(hostname, &config.probe.psk_identity, psk_value.as_str())?;

    let dependencies = vec![
        DependencyRef::new(ResourceKind::Template, &config.dependencies.template_name),
        DependencyRef::new(ResourceKind::HostGroup, &config.dependencies.host_group_name),
    ];

    Ok(Preflight::Ready(ReadyRun {
        endpoint,
        identity,
        dependencies,
    }))
}

/// Drives one registration run from configuration to outcome
pub struct Registrar {
    config: RegistrationConfig,
    factory: Box<dyn RpcClientFactory>,
}

impl Registrar {
    /// Create a registrar
    ///
    /// # Parameters
    ///
    /// - `config`: run configuration
    /// - `factory`: builds the RPC client once a run is known to need it
    pub fn new(config: RegistrationConfig, factory: Box<dyn RpcClientFactory>) -> Self {
        Self { config, factory }
    }

    /// Run the registration and log the terminal status line
    pub async fn run(&self) -> ReconciliationOutcome {
        let outcome = self.run_inner().await;

        if outcome.is_failure() {
            error!("{}", outcome);
        } else {
            info!("{}", outcome);
        }

        outcome
    }

    async fn run_inner(&self) -> ReconciliationOutcome {
        let ready = match preflight(&self.config) {
            Ok(Preflight::Ready(ready)) => ready,
            Ok(Preflight::Skip(reason)) => return ReconciliationOutcome::Skipped(reason),
            Err(e) => {
                error!("{}", e);
                return ReconciliationOutcome::Failed(e.kind());
            }
        };

        let client = match self.factory.connect(&ready.endpoint) {
            Ok(client) => client,
            Err(e) => {
                error!("Failed to build API client: {}", e);
                return ReconciliationOutcome::Failed(FailureKind::Transport);
            }
        };
        debug!(
            "Using {} client for {}",
            client.client_name(),
            ready.endpoint.url
        );

        execute(client, ready).await
    }
}

/// Resolve dependencies, then reconcile the host
///
/// Both dependencies must resolve before the reconciler runs, so a
/// missing template or host group never reaches `host.create`.
pub async fn execute(client: Arc<dyn RpcClient>, ready: ReadyRun) -> ReconciliationOutcome {
    let ReadyRun {
        identity,
        mut dependencies,
        ..
    } = ready;

    if let Some(template) = dependencies
        .iter()
        .find(|d| d.kind == ResourceKind::Template)
    {
        info!("Resolving configuration for '{}'...", template.name);
    }

    let resolver = Resolver::new(Arc::clone(&client));
    let resolved = match resolver.resolve_all(&mut dependencies).await {
        Ok(resolved) => resolved,
        Err(e) => {
            let e = Error::from(e);
            error!("CRITICAL: {}", e);
            return ReconciliationOutcome::Failed(e.kind());
        }
    };

    HostReconciler::new(client)
        .reconcile(&identity, &resolved)
        .await
}
