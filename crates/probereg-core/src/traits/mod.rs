//! Capability interfaces consumed by the registration core
//!
//! - [`RpcClient`]: Issue one remote procedure call against the monitoring server

pub mod rpc_client;

pub use rpc_client::{RpcClient, RpcClientFactory};
