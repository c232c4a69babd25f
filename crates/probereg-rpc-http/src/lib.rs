// # JSON-RPC over HTTP Client
//
// This crate provides the HTTP transport for `probereg-core`'s `RpcClient`.
//
// ## Wire Format
//
// Every call is one `POST` of a JSON-RPC 2.0 envelope to the configured
// endpoint:
//
// ```json
// {"jsonrpc": "2.0", "method": "host.get", "params": {...}, "auth": "<token>", "id": 1}
// ```
//
// with `Content-Type: application/json-rpc`. The response carries either
// `result` (returned verbatim) or `error` with `code`, `message` and an
// optional `data` detail (returned as `RpcError::Remote`).
//
// ## Constraints
//
// - One HTTP request per call, no retries
// - Per-call timeout taken from the endpoint configuration
// - Non-2xx statuses and unparseable bodies are transport errors
// - No background tasks
//
// ## Security Requirements
//
// - API token NEVER appears in logs or Debug output
// - Request bodies are never logged (they carry the token and the PSK)

use async_trait::async_trait;
use probereg_core::config::ApiEndpoint;
use probereg_core::error::RpcError;
use probereg_core::traits::{RpcClient, RpcClientFactory};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Content type the server's JSON-RPC endpoint expects
const JSON_RPC_CONTENT_TYPE: &str = "application/json-rpc";

/// Request id; one call is in flight at a time
const REQUEST_ID: u64 = 1;

/// Outgoing JSON-RPC 2.0 request
#[derive(Serialize)]
struct RequestEnvelope<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: &'a Value,
    auth: &'a str,
    id: u64,
}

/// Incoming JSON-RPC 2.0 response
#[derive(Deserialize)]
struct ResponseEnvelope {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RemoteErrorBody>,
}

#[derive(Deserialize)]
struct RemoteErrorBody {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

/// JSON-RPC client speaking to the monitoring server over HTTP(S)
///
/// # Security
///
/// The Debug implementation does NOT expose the API token.
pub struct JsonRpcHttpClient {
    /// JSON-RPC endpoint URL
    url: String,

    /// API token
    /// ⚠️ NEVER log this value
    token: String,

    /// HTTP client with the per-call timeout applied
    client: reqwest::Client,
}

impl std::fmt::Debug for JsonRpcHttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonRpcHttpClient")
            .field("url", &self.url)
            .field("token", &"<REDACTED>")
            .finish()
    }
}

impl JsonRpcHttpClient {
    /// Create a client for `url`, authenticating every call with `token`
    ///
    /// # Errors
    ///
    /// Returns `RpcError::Transport` if the HTTP client cannot be built
    /// (e.g. no TLS backend available).
    pub fn new(
        url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RpcError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcError::transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            url: url.into(),
            token: token.into(),
            client,
        })
    }

    /// Create a client from a configured endpoint
    pub fn from_endpoint(endpoint: &ApiEndpoint) -> Result<Self, RpcError> {
        Self::new(endpoint.url.clone(), endpoint.token.clone(), endpoint.timeout)
    }
}

#[async_trait]
impl RpcClient for JsonRpcHttpClient {
    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        tracing::debug!("JSON-RPC call: {}", method);

        let body = encode_request(method, &params, &self.token)?;

        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, JSON_RPC_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|e| RpcError::transport(format!("{method}: HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(RpcError::transport(format!(
                "{method}: HTTP {status}: {}",
                truncate(&error_text, 200)
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| RpcError::transport(format!("{method}: failed to read response: {e}")))?;

        decode_response(&bytes)
    }

    fn client_name(&self) -> &'static str {
        "json-rpc-http"
    }
}

/// Serialize one request envelope
pub fn encode_request(method: &str, params: &Value, token: &str) -> Result<Vec<u8>, RpcError> {
    serde_json::to_vec(&RequestEnvelope {
        jsonrpc: "2.0",
        method,
        params,
        auth: token,
        id: REQUEST_ID,
    })
    .map_err(|e| RpcError::transport(format!("failed to encode request: {e}")))
}

/// Interpret a response body
///
/// - `result` present: returned unchanged
/// - `error` present: `RpcError::Remote` carrying code, message and data
/// - neither, or not JSON: `RpcError::Transport`
pub fn decode_response(body: &[u8]) -> Result<Value, RpcError> {
    let envelope: ResponseEnvelope = serde_json::from_slice(body)
        .map_err(|e| RpcError::transport(format!("failed to parse response: {e}")))?;

    if let Some(error) = envelope.error {
        let data = match error.data {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s),
            Some(other) => Some(other.to_string()),
        };
        return Err(RpcError::Remote {
            code: error.code,
            message: error.message,
            data,
        });
    }

    envelope
        .result
        .ok_or_else(|| RpcError::transport("response has neither result nor error"))
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Factory for HTTP JSON-RPC clients
pub struct JsonRpcHttpFactory;

impl RpcClientFactory for JsonRpcHttpFactory {
    fn connect(&self, endpoint: &ApiEndpoint) -> Result<Arc<dyn RpcClient>, RpcError> {
        tracing::debug!("Connecting JSON-RPC client to {}", endpoint.url);
        Ok(Arc::new(JsonRpcHttpClient::from_endpoint(endpoint)?))
    }
}
