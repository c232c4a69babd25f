//! Host reconciler
//!
//! Decides whether the probe's host record has to be created or have its
//! credentials re-pushed, and issues that single mutation.
//!
//! ## State Machine
//!
//! ```text
//! LookupHost ──not found──▶ CreateHost ──ok──▶ Created
//!     │                         └──error──▶ Failed
//!     ├──found (hostid)──▶ SyncCredentials ──ok──▶ Updated
//!     │                         └──error──▶ Failed
//!     └──error──▶ Failed
//! ```
//!
//! States only move forward: one lookup, then at most one mutation.
//!
//! ## Credential Drift
//!
//! When the host exists its PSK identity and value are overwritten with the
//! probe's current ones on every run. The server's copy is never read or
//! compared.

use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::model::{
    DesiredProbeIdentity, ReconciliationOutcome, RemoteHostRecord, ResolvedDependencies,
};
use crate::resolver::id_string;
use crate::traits::RpcClient;

/// `tls_connect` / `tls_accept` value meaning "PSK only"
pub const TLS_PSK_ONLY: u8 = 2;

/// Agent interface type
const INTERFACE_TYPE_AGENT: u8 = 1;

/// Address of the placeholder interface; the probe never accepts connections
pub const PLACEHOLDER_INTERFACE_DNS: &str = "0.0.0.0";

/// Port of the placeholder interface
pub const PLACEHOLDER_INTERFACE_PORT: &str = "10050";

const HOST_GET: &str = "host.get";
const HOST_CREATE: &str = "host.create";
const HOST_UPDATE: &str = "host.update";

/// Steps of a single reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileState {
    /// Look for an existing host with the desired hostname
    LookupHost,
    /// No host exists; create one
    CreateHost,
    /// A host exists; overwrite its credentials
    SyncCredentials {
        /// Id of the existing host
        host_id: String,
    },
}

enum Transition {
    Next(ReconcileState),
    Done(ReconciliationOutcome),
}

#[derive(Debug, Serialize)]
struct AgentInterface {
    #[serde(rename = "type")]
    kind: u8,
    main: u8,
    useip: u8,
    ip: &'static str,
    dns: &'static str,
    port: &'static str,
}

impl AgentInterface {
    /// Required by the server schema even though nothing listens on it
    fn placeholder() -> Self {
        Self {
            kind: INTERFACE_TYPE_AGENT,
            main: 1,
            useip: 0,
            ip: "",
            dns: PLACEHOLDER_INTERFACE_DNS,
            port: PLACEHOLDER_INTERFACE_PORT,
        }
    }
}

#[derive(Debug, Serialize)]
struct GroupRef<'a> {
    groupid: &'a str,
}

#[derive(Debug, Serialize)]
struct TemplateRef<'a> {
    templateid: &'a str,
}

#[derive(Debug, Serialize)]
struct HostCreateParams<'a> {
    host: &'a str,
    interfaces: [AgentInterface; 1],
    groups: [GroupRef<'a>; 1],
    templates: [TemplateRef<'a>; 1],
    tls_connect: u8,
    tls_accept: u8,
    tls_psk_identity: &'a str,
    tls_psk: &'a str,
}

#[derive(Debug, Serialize)]
struct HostUpdateParams<'a> {
    hostid: &'a str,
    tls_psk_identity: &'a str,
    tls_psk: &'a str,
}

/// Reconciles one probe's host record against the server
pub struct HostReconciler {
    client: Arc<dyn RpcClient>,
}

impl HostReconciler {
    /// Create a reconciler over an RPC client
    pub fn new(client: Arc<dyn RpcClient>) -> Self {
        Self { client }
    }

    /// Run the state machine to its terminal outcome
    ///
    /// Never returns `Skipped`; missing inputs are caught before a
    /// reconciler is built.
    pub async fn reconcile(
        &self,
        identity: &DesiredProbeIdentity,
        deps: &ResolvedDependencies,
    ) -> ReconciliationOutcome {
        let mut state = ReconcileState::LookupHost;

        loop {
            debug!("Reconciler state: {:?}", state);

            match self.step(state, identity, deps).await {
                Ok(Transition::Next(next)) => state = next,
                Ok(Transition::Done(outcome)) => return outcome,
                Err(e) => {
                    error!("{}", e);
                    return ReconciliationOutcome::Failed(e.kind());
                }
            }
        }
    }

    async fn step(
        &self,
        state: ReconcileState,
        identity: &DesiredProbeIdentity,
        deps: &ResolvedDependencies,
    ) -> Result<Transition> {
        match state {
            ReconcileState::LookupHost => {
                info!("Checking status of '{}'...", identity.hostname());
                let next = match self.lookup_host(identity.hostname()).await? {
                    Some(host) => {
                        info!(
                            "Host exists (ID: {}). Syncing current PSK to server...",
                            host.id
                        );
                        ReconcileState::SyncCredentials { host_id: host.id }
                    }
                    None => ReconcileState::CreateHost,
                };
                Ok(Transition::Next(next))
            }
            ReconcileState::CreateHost => {
                info!("Registering new probe...");
                self.create_host(identity, deps).await.map(Transition::Done)
            }
            ReconcileState::SyncCredentials { host_id } => self
                .sync_credentials(&host_id, identity)
                .await
                .map(Transition::Done),
        }
    }

    /// Fetch the host record for a hostname, if there is one
    pub async fn lookup_host(&self, hostname: &str) -> Result<Option<RemoteHostRecord>> {
        let params = json!({
            "output": ["hostid", "host"],
            "filter": { "host": [hostname] },
        });

        let payload = self
            .client
            .call(HOST_GET, params)
            .await
            .map_err(|e| Error::rpc(HOST_GET, e))?;

        let mut hosts: Vec<RemoteHostRecord> = serde_json::from_value(payload)
            .map_err(|e| Error::unexpected(HOST_GET, e.to_string()))?;

        if hosts.len() > 1 {
            warn!(
                "{} hosts named '{}' on server, using the first",
                hosts.len(),
                hostname
            );
        }

        if hosts.is_empty() {
            Ok(None)
        } else {
            Ok(Some(hosts.swap_remove(0)))
        }
    }

    async fn create_host(
        &self,
        identity: &DesiredProbeIdentity,
        deps: &ResolvedDependencies,
    ) -> Result<ReconciliationOutcome> {
        let params = serde_json::to_value(HostCreateParams {
            host: identity.hostname(),
            interfaces: [AgentInterface::placeholder()],
            groups: [GroupRef {
                groupid: &deps.group_id,
            }],
            templates: [TemplateRef {
                templateid: &deps.template_id,
            }],
            tls_connect: TLS_PSK_ONLY,
            tls_accept: TLS_PSK_ONLY,
            tls_psk_identity: identity.psk_identity(),
            tls_psk: identity.psk_value(),
        })?;

        let result = self
            .client
            .call(HOST_CREATE, params)
            .await
            .map_err(|e| Error::rpc(HOST_CREATE, e))?;

        let host_id = result
            .get("hostids")
            .and_then(|ids| ids.get(0))
            .and_then(id_string)
            .ok_or_else(|| Error::unexpected(HOST_CREATE, "response carries no hostids"))?;

        Ok(ReconciliationOutcome::Created(host_id))
    }

    async fn sync_credentials(
        &self,
        host_id: &str,
        identity: &DesiredProbeIdentity,
    ) -> Result<ReconciliationOutcome> {
        let params = serde_json::to_value(HostUpdateParams {
            hostid: host_id,
            tls_psk_identity: identity.psk_identity(),
            tls_psk: identity.psk_value(),
        })?;

        self.client
            .call(HOST_UPDATE, params)
            .await
            .map_err(|e| Error::rpc(HOST_UPDATE, e))?;

        Ok(ReconciliationOutcome::Updated(host_id.to_string()))
    }
}
