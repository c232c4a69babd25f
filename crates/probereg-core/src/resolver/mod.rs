//! Resource resolver
//!
//! Turns the name of a template or host group into the identifier the
//! server uses for it. The two kinds differ only in which method to call
//! and which fields to filter and read; those differences live in one
//! static table indexed by [`ResourceKind`], consumed by a single
//! [`Resolver::resolve`].
//!
//! ## Lookup Table
//!
//! | Kind      | Method          | Filter field | Id field     |
//! |-----------|-----------------|--------------|--------------|
//! | Template  | `template.get`  | `host`       | `templateid` |
//! | HostGroup | `hostgroup.get` | `name`       | `groupid`    |

use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::ResolveError;
use crate::model::{DependencyRef, ResolvedDependencies};
use crate::traits::RpcClient;

/// Kinds of server objects a host can depend on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Monitoring template
    Template = 0,
    /// Host group
    HostGroup = 1,
}

/// How to look up one kind of resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupSpec {
    /// Remote method performing the lookup
    pub method: &'static str,
    /// Field the name filter applies to
    pub filter_field: &'static str,
    /// Field carrying the identifier in each result entry
    pub id_field: &'static str,
}

static LOOKUP_TABLE: [LookupSpec; 2] = [
    LookupSpec {
        method: "template.get",
        filter_field: "host",
        id_field: "templateid",
    },
    LookupSpec {
        method: "hostgroup.get",
        filter_field: "name",
        id_field: "groupid",
    },
];

impl ResourceKind {
    /// Lookup parameters for this kind
    pub fn lookup(self) -> &'static LookupSpec {
        &LOOKUP_TABLE[self as usize]
    }

    /// Human-readable name
    pub const fn label(self) -> &'static str {
        match self {
            ResourceKind::Template => "template",
            ResourceKind::HostGroup => "host group",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Resolves dependency names to server identifiers
///
/// Each resolution is one exact-match lookup. Results are not cached; the
/// server is authoritative and assumed unchanged for the duration of a run,
/// so repeated resolution yields the same identifier.
pub struct Resolver {
    client: Arc<dyn RpcClient>,
}

impl Resolver {
    /// Create a resolver over an RPC client
    pub fn new(client: Arc<dyn RpcClient>) -> Self {
        Self { client }
    }

    /// Resolve one named resource to its identifier
    ///
    /// # Returns
    ///
    /// - `Ok(String)`: identifier of the first exact match
    /// - `Err(ResolveError::NotFound)`: no object carries that name
    /// - `Err(ResolveError::LookupFailed)`: the lookup call failed
    /// - `Err(ResolveError::UnexpectedResponse)`: the result was not a list
    ///   of records carrying the id field
    pub async fn resolve(&self, kind: ResourceKind, name: &str) -> Result<String, ResolveError> {
        let spec = kind.lookup();
        let params = lookup_params(spec, name);

        debug!("Resolving {} '{}' via {}", kind, name, spec.method);

        let payload = self
            .client
            .call(spec.method, params)
            .await
            .map_err(|source| ResolveError::LookupFailed {
                kind,
                name: name.to_string(),
                source,
            })?;

        let unexpected = |detail: &str| ResolveError::UnexpectedResponse {
            kind,
            name: name.to_string(),
            detail: detail.to_string(),
        };

        let entries = payload
            .as_array()
            .ok_or_else(|| unexpected("result is not an array"))?;

        let first = entries.first().ok_or_else(|| ResolveError::NotFound {
            kind,
            name: name.to_string(),
        })?;

        if entries.len() > 1 {
            warn!(
                "{} lookup for '{}' matched {} entries, using the first",
                kind,
                name,
                entries.len()
            );
        }

        let id = first
            .get(spec.id_field)
            .and_then(id_string)
            .ok_or_else(|| unexpected(&format!("entry has no '{}'", spec.id_field)))?;

        debug!("Resolved {} '{}' to {}", kind, name, id);
        Ok(id)
    }

    /// Resolve a dependency reference in place
    ///
    /// An already resolved reference is returned as is without a lookup.
    pub async fn resolve_ref(&self, dep: &mut DependencyRef) -> Result<String, ResolveError> {
        if let Some(id) = dep.resolved_id() {
            return Ok(id.to_string());
        }

        let id = self.resolve(dep.kind, &dep.name).await?;
        Ok(dep.set_resolved(id).to_string())
    }

    /// Resolve every dependency a host creation needs
    ///
    /// Stops at the first failure, so a missing template means the host
    /// group is never looked up and nothing downstream runs.
    pub async fn resolve_all(
        &self,
        deps: &mut [DependencyRef],
    ) -> Result<ResolvedDependencies, ResolveError> {
        for dep in deps.iter_mut() {
            self.resolve_ref(dep).await?;
        }

        let find = |kind: ResourceKind| -> Result<String, ResolveError> {
            deps.iter()
                .find(|d| d.kind == kind)
                .and_then(|d| d.resolved_id().map(str::to_string))
                .ok_or_else(|| ResolveError::NotFound {
                    kind,
                    name: "(not configured)".to_string(),
                })
        };

        Ok(ResolvedDependencies {
            template_id: find(ResourceKind::Template)?,
            group_id: find(ResourceKind::HostGroup)?,
        })
    }
}

/// Build the `<resource>.get` parameters for an exact-name lookup
pub fn lookup_params(spec: &LookupSpec, name: &str) -> Value {
    json!({
        "output": [spec.id_field, spec.filter_field],
        "filter": { spec.filter_field: [name] },
    })
}

/// Read an identifier that may be encoded as a string or a number
pub(crate) fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
