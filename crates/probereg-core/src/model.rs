//! Data model of a registration run

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{Error, FailureKind, Result};
use crate::resolver::{ResourceKind, id_string};

/// What this probe wants the server to know about it
///
/// Immutable once built. The PSK value is never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct DesiredProbeIdentity {
    hostname: String,
    psk_identity: String,
    psk_value: String,
}

impl DesiredProbeIdentity {
    /// Create an identity, rejecting an empty hostname or PSK value
    pub fn new(
        hostname: impl Into<String>,
        psk_identity: impl Into<String>,
        psk_value: impl Into<String>,
    ) -> Result<Self> {
        let hostname = hostname.into();
        let psk_identity = psk_identity.into();
        let psk_value = psk_value.into();

        if hostname.is_empty() {
            return Err(Error::config_missing("hostname"));
        }
        if psk_value.is_empty() {
            return Err(Error::config_missing("PSK value"));
        }
        if psk_identity.is_empty() {
            return Err(Error::config("PSK identity cannot be empty"));
        }

        Ok(Self {
            hostname,
            psk_identity,
            psk_value,
        })
    }

    /// Hostname, the unique key of the host record on the server
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// PSK identity
    pub fn psk_identity(&self) -> &str {
        &self.psk_identity
    }

    /// PSK secret
    /// ⚠️ NEVER log this value
    pub fn psk_value(&self) -> &str {
        &self.psk_value
    }
}

impl std::fmt::Debug for DesiredProbeIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DesiredProbeIdentity")
            .field("hostname", &self.hostname)
            .field("psk_identity", &self.psk_identity)
            .field("psk_value", &"<REDACTED>")
            .finish()
    }
}

/// A named server object the host must reference
///
/// Starts unresolved; the resolver fills in `resolved_id` once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyRef {
    /// Kind of object
    pub kind: ResourceKind,
    /// Name to look up
    pub name: String,
    resolved_id: Option<String>,
}

impl DependencyRef {
    /// Create an unresolved reference
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            resolved_id: None,
        }
    }

    /// Identifier, once resolved
    pub fn resolved_id(&self) -> Option<&str> {
        self.resolved_id.as_deref()
    }

    /// Record the identifier; a second call keeps the first value
    pub(crate) fn set_resolved(&mut self, id: String) -> &str {
        self.resolved_id.get_or_insert(id)
    }
}

/// Identifiers every host creation needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDependencies {
    /// Template to link
    pub template_id: String,
    /// Host group to join
    pub group_id: String,
}

/// The server's view of a host, as returned by `host.get`
///
/// Credentials on the server are write-only from our side and are never
/// read back.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteHostRecord {
    /// Server-assigned host id
    #[serde(rename = "hostid", deserialize_with = "deserialize_id")]
    pub id: String,
    /// Technical host name
    #[serde(rename = "host", default)]
    pub hostname: String,
}

/// Accept an identifier encoded as a non-empty string or a number
fn deserialize_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    id_string(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid identifier: {value}")))
}

/// Terminal result of one registration run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationOutcome {
    /// A new host record was created
    Created(String),
    /// An existing host record had its credentials re-pushed
    Updated(String),
    /// Nothing was sent to the server
    Skipped(String),
    /// The run stopped on an error
    Failed(FailureKind),
}

impl ReconciliationOutcome {
    /// Whether the run ended in failure
    pub fn is_failure(&self) -> bool {
        matches!(self, ReconciliationOutcome::Failed(_))
    }

    /// Host id the server holds for this probe, when known
    pub fn host_id(&self) -> Option<&str> {
        match self {
            ReconciliationOutcome::Created(id) | ReconciliationOutcome::Updated(id) => Some(id),
            _ => None,
        }
    }
}

impl std::fmt::Display for ReconciliationOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReconciliationOutcome::Created(id) => {
                write!(f, "REGISTRATION SUCCESSFUL (host id: {id})")
            }
            ReconciliationOutcome::Updated(id) => {
                write!(f, "PSK SYNCED (host id: {id}), handshake should now recover")
            }
            ReconciliationOutcome::Skipped(reason) => write!(f, "SKIPPED: {reason}"),
            ReconciliationOutcome::Failed(kind) => write!(f, "REGISTRATION FAILED: {kind}"),
        }
    }
}
