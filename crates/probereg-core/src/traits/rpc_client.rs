// # RPC Client Trait
//
// Defines the interface for calling the monitoring server's JSON-RPC API.
//
// ## Implementations
//
// - HTTP: `probereg-rpc-http` crate (JSON-RPC 2.0 over HTTP POST)
// - Tests: scripted clients recording every call
//
// ## Usage
//
// ```rust,ignore
// use probereg_core::RpcClient;
// use serde_json::json;
//
// let hosts = client
//     .call("host.get", json!({ "filter": { "host": ["probe-01"] } }))
//     .await?;
// ```

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::config::ApiEndpoint;
use crate::error::RpcError;

/// Trait for JSON-RPC client implementations
///
/// A client carries its own endpoint and auth credential; callers only
/// name the method and supply parameters.
///
/// # Contract
///
/// - Exactly one network round trip per [`call`](RpcClient::call)
/// - No retries: a failed call returns its error, the caller decides
/// - No state retained between calls
/// - A JSON-RPC `error` member is returned as [`RpcError::Remote`], which
///   callers must treat as an ordinary outcome
/// - Everything that prevents a well-formed response from arriving
///   (timeouts, refused connections, non-2xx statuses, unparseable bodies)
///   is [`RpcError::Transport`]
#[async_trait]
pub trait RpcClient: Send + Sync {
    /// Call a remote method
    ///
    /// # Parameters
    ///
    /// - `method`: `"<resource>.<verb>"`, e.g. `"host.get"`
    /// - `params`: JSON mapping passed verbatim as the request `params`
    ///
    /// # Returns
    ///
    /// - `Ok(Value)`: the response `result`, unchanged
    /// - `Err(RpcError)`: remote or transport failure
    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError>;

    /// Get the client name (for logging/debugging)
    fn client_name(&self) -> &'static str;
}

/// Helper trait for constructing RPC clients from an endpoint
///
/// Construction is deferred until a run is known to need the network, so
/// runs that are skipped never build a client.
pub trait RpcClientFactory: Send + Sync {
    /// Create an RpcClient for the given endpoint
    fn connect(&self, endpoint: &ApiEndpoint) -> Result<Arc<dyn RpcClient>, RpcError>;
}
