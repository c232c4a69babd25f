//! Error types for probe registration
//!
//! Remote calls fail with [`RpcError`], dependency lookups with
//! [`ResolveError`]. Both fold into the crate-wide [`Error`], whose
//! [`Error::kind`] is what a failed run reports as its outcome.

use crate::resolver::ResourceKind;
use thiserror::Error;

/// Result type alias for registration operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failure of a single remote procedure call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RpcError {
    /// The request never produced a usable JSON-RPC response
    /// (timeout, connection refused, non-2xx status, malformed body)
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a structured JSON-RPC error
    #[error("{}", remote_display(*code, message, data.as_deref()))]
    Remote {
        /// JSON-RPC error code
        code: i64,
        /// Short error message
        message: String,
        /// Detailed reason, where the server explains what went wrong
        data: Option<String>,
    },
}

fn remote_display(code: i64, message: &str, data: Option<&str>) -> String {
    match data {
        Some(data) if !data.is_empty() => format!("remote error {code}: {message} ({data})"),
        _ => format!("remote error {code}: {message}"),
    }
}

impl RpcError {
    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a remote error without detail
    pub fn remote(code: i64, message: impl Into<String>) -> Self {
        Self::Remote {
            code,
            message: message.into(),
            data: None,
        }
    }
}

/// Failure to resolve a named dependency to its identifier
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// Lookup succeeded but nothing carries that name
    #[error("{kind} '{name}' not found on server")]
    NotFound { kind: ResourceKind, name: String },

    /// The lookup call itself failed
    #[error("{kind} lookup for '{name}' failed: {source}")]
    LookupFailed {
        kind: ResourceKind,
        name: String,
        #[source]
        source: RpcError,
    },

    /// The lookup answered with something that is not a list of records
    #[error("{kind} lookup for '{name}' returned an unexpected payload: {detail}")]
    UnexpectedResponse {
        kind: ResourceKind,
        name: String,
        detail: String,
    },
}

/// Coarse classification of a failed run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Configuration required for the requested action is absent
    ConfigMissing,
    /// Configuration is present but unusable
    ConfigInvalid,
    /// A named template or host group does not exist on the server
    DependencyNotFound,
    /// Network, timeout or HTTP-level failure
    Transport,
    /// The server rejected a well-formed request
    Remote,
    /// The server answered with a payload we cannot interpret
    UnexpectedResponse,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FailureKind::ConfigMissing => "config missing",
            FailureKind::ConfigInvalid => "config invalid",
            FailureKind::DependencyNotFound => "dependency not found",
            FailureKind::Transport => "transport error",
            FailureKind::Remote => "remote error",
            FailureKind::UnexpectedResponse => "unexpected response",
        };
        f.write_str(name)
    }
}

/// Core error type for probe registration
#[derive(Error, Debug)]
pub enum Error {
    /// Required configuration absent
    #[error("Configuration missing: {0}")]
    ConfigMissing(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Dependency resolution errors
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// A remote call made by the reconciler failed
    #[error("{method} failed: {source}")]
    Rpc {
        /// Remote method that was called
        method: String,
        #[source]
        source: RpcError,
    },

    /// The server's answer did not have the expected shape
    #[error("Unexpected response from {method}: {detail}")]
    UnexpectedResponse {
        /// Remote method that was called
        method: String,
        /// What was wrong with it
        detail: String,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a missing-configuration error
    pub fn config_missing(msg: impl Into<String>) -> Self {
        Self::ConfigMissing(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Wrap a failed remote call with the method that was called
    pub fn rpc(method: impl Into<String>, source: RpcError) -> Self {
        Self::Rpc {
            method: method.into(),
            source,
        }
    }

    /// Create an unexpected-response error
    pub fn unexpected(method: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::UnexpectedResponse {
            method: method.into(),
            detail: detail.into(),
        }
    }

    /// Classify this error for the run outcome
    pub fn kind(&self) -> FailureKind {
        match self {
            Error::ConfigMissing(_) => FailureKind::ConfigMissing,
            Error::Config(_) => FailureKind::ConfigInvalid,
            Error::Resolve(ResolveError::NotFound { .. }) => FailureKind::DependencyNotFound,
            Error::Resolve(ResolveError::LookupFailed { source, .. }) => rpc_kind(source),
            Error::Resolve(ResolveError::UnexpectedResponse { .. }) => {
                FailureKind::UnexpectedResponse
            }
            Error::Rpc { source, .. } => rpc_kind(source),
            Error::UnexpectedResponse { .. } | Error::Json(_) => FailureKind::UnexpectedResponse,
        }
    }
}

fn rpc_kind(err: &RpcError) -> FailureKind {
    match err {
        RpcError::Transport(_) => FailureKind::Transport,
        RpcError::Remote { .. } => FailureKind::Remote,
    }
}
