//! Test doubles and common utilities for registration contract tests
//!
//! The scripted client answers each method with a fixed response and
//! records every call, so tests can assert on exactly which remote
//! procedures a run issued.

#![allow(dead_code)]

use probereg_core::config::{ApiEndpoint, ProbeConfig, RegistrationConfig};
use probereg_core::error::RpcError;
use probereg_core::traits::{RpcClient, RpcClientFactory};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const TEST_HOSTNAME: &str = "probe-01";
pub const TEST_PSK_IDENTITY: &str = "CommunityProbe";
pub const TEST_PSK_VALUE: &str = "6b1d9a0e47c2f3b85a9e0d1c2b3a4f5e";
pub const TEMPLATE_ID: &str = "10001";
pub const GROUP_ID: &str = "22";

/// One call seen by the scripted client
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: String,
    pub params: Value,
}

/// An RpcClient answering from a per-method script
pub struct ScriptedRpcClient {
    responses: Mutex<HashMap<String, Result<Value, RpcError>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedRpcClient {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answer `method` with `response` every time it is called
    pub fn on(self, method: &str, response: Result<Value, RpcError>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(method.to_string(), response);
        self
    }

    /// A server where the default template and host group exist
    pub fn with_dependencies() -> Self {
        Self::new()
            .on(
                "template.get",
                Ok(json!([{ "templateid": TEMPLATE_ID, "host": "Template Netvaktin" }])),
            )
            .on(
                "hostgroup.get",
                Ok(json!([{ "groupid": GROUP_ID, "name": "Netvaktin Probes" }])),
            )
    }

    /// All calls in order
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Methods called, in order
    pub fn methods(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.method).collect()
    }

    /// Calls made to one method
    pub fn calls_to(&self, method: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.method == method)
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl RpcClient for ScriptedRpcClient {
    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        self.calls.lock().unwrap().push(RecordedCall {
            method: method.to_string(),
            params,
        });

        self.responses
            .lock()
            .unwrap()
            .get(method)
            .cloned()
            .unwrap_or_else(|| Err(RpcError::transport(format!("no response scripted for {method}"))))
    }

    fn client_name(&self) -> &'static str {
        "scripted"
    }
}

/// Hands out a shared scripted client and counts how often it was asked to
pub struct SharedClientFactory {
    client: Arc<ScriptedRpcClient>,
    connect_count: Arc<AtomicUsize>,
}

impl SharedClientFactory {
    pub fn new(client: Arc<ScriptedRpcClient>) -> (Self, Arc<AtomicUsize>) {
        let connect_count = Arc::new(AtomicUsize::new(0));
        let factory = Self {
            client,
            connect_count: Arc::clone(&connect_count),
        };
        (factory, connect_count)
    }
}

impl RpcClientFactory for SharedClientFactory {
    fn connect(&self, _endpoint: &ApiEndpoint) -> Result<Arc<dyn RpcClient>, RpcError> {
        self.connect_count.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::clone(&self.client) as Arc<dyn RpcClient>)
    }
}

/// A factory that cannot build a client
pub struct BrokenFactory;

impl RpcClientFactory for BrokenFactory {
    fn connect(&self, _endpoint: &ApiEndpoint) -> Result<Arc<dyn RpcClient>, RpcError> {
        Err(RpcError::transport("TLS backend unavailable"))
    }
}

/// A configuration that is ready to register `probe-01`
pub fn ready_config() -> RegistrationConfig {
    let mut config = RegistrationConfig::new();
    config.api.url = Some("https://monitor.example.net/api_jsonrpc.php".to_string());
    config.api.token = Some("0424bd59b807674191e7d77572075f33".to_string());
    config.probe =
        ProbeConfig::new(TEST_HOSTNAME, TEST_PSK_VALUE).with_psk_identity(TEST_PSK_IDENTITY);
    config
}

/// An existing host as `host.get` reports it
pub fn existing_host(hostid: &str) -> Value {
    json!([{ "hostid": hostid, "host": TEST_HOSTNAME }])
}
