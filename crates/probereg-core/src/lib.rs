// # probereg-core
//
// Core library for registering a monitoring probe with its server.
//
// ## Architecture Overview
//
// - **RpcClient**: Trait for one JSON-RPC call against the server API
// - **Resolver**: Looks up template / host group identifiers by name
// - **HostReconciler**: Creates the probe's host or re-pushes its PSK
// - **Registrar**: Preflight, resolution and reconciliation for one run
//
// ## Design Principles
//
// 1. **Capability interfaces**: transport and configuration loading live
//    outside the core and are injected
// 2. **Sequential**: one run is a straight line of remote calls, no tasks
// 3. **No retries**: a failed call fails the run
// 4. **Convergent**: an existing host always gets the current credentials

pub mod config;
pub mod error;
pub mod model;
pub mod reconciler;
pub mod registration;
pub mod resolver;
pub mod traits;

// Re-export core types for convenience
pub use config::{ApiConfig, ApiEndpoint, DependencyConfig, ProbeConfig, RegistrationConfig};
pub use error::{Error, FailureKind, ResolveError, Result, RpcError};
pub use model::{
    DependencyRef, DesiredProbeIdentity, ReconciliationOutcome, RemoteHostRecord,
    ResolvedDependencies,
};
pub use reconciler::HostReconciler;
pub use registration::{Preflight, ReadyRun, Registrar, preflight};
pub use resolver::{ResourceKind, Resolver};
pub use traits::{RpcClient, RpcClientFactory};
