//! Contract Test: Dependency Resolution
//!
//! Constraints verified:
//! - Each kind is looked up through its own method, filter and id field
//! - Resolving the same name twice in a run yields the same identifier
//! - Zero matches is NotFound, a failed call is LookupFailed
//! - resolve_all stops at the first failure

mod common;

use common::*;
use probereg_core::{DependencyRef, ResolveError, ResourceKind, Resolver, RpcError};
use serde_json::json;
use std::sync::Arc;

fn resolver(client: &Arc<ScriptedRpcClient>) -> Resolver {
    Resolver::new(Arc::clone(client) as Arc<dyn probereg_core::RpcClient>)
}

#[tokio::test]
async fn template_lookup_uses_host_field() {
    let client = Arc::new(ScriptedRpcClient::with_dependencies());

    let id = resolver(&client)
        .resolve(ResourceKind::Template, "Template Netvaktin")
        .await
        .unwrap();

    assert_eq!(id, TEMPLATE_ID);
    let call = &client.calls()[0];
    assert_eq!(call.method, "template.get");
    assert_eq!(call.params["filter"], json!({ "host": ["Template Netvaktin"] }));
}

#[tokio::test]
async fn host_group_lookup_uses_name_field() {
    let client = Arc::new(ScriptedRpcClient::with_dependencies());

    let id = resolver(&client)
        .resolve(ResourceKind::HostGroup, "Netvaktin Probes")
        .await
        .unwrap();

    assert_eq!(id, GROUP_ID);
    let call = &client.calls()[0];
    assert_eq!(call.method, "hostgroup.get");
    assert_eq!(call.params["filter"], json!({ "name": ["Netvaktin Probes"] }));
}

#[tokio::test]
async fn repeated_resolution_is_deterministic() {
    let client = Arc::new(ScriptedRpcClient::with_dependencies());
    let resolver = resolver(&client);

    let first = resolver
        .resolve(ResourceKind::Template, "Template Netvaktin")
        .await
        .unwrap();
    let second = resolver
        .resolve(ResourceKind::Template, "Template Netvaktin")
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(client.calls_to("template.get").len(), 2);
}

#[tokio::test]
async fn empty_result_is_not_found() {
    let client = Arc::new(ScriptedRpcClient::new().on("template.get", Ok(json!([]))));

    let err = resolver(&client)
        .resolve(ResourceKind::Template, "Template Netvaktin")
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ResolveError::NotFound {
            kind: ResourceKind::Template,
            name: "Template Netvaktin".to_string(),
        }
    );
}

#[tokio::test]
async fn failed_call_is_lookup_failed() {
    let client = Arc::new(ScriptedRpcClient::new().on(
        "hostgroup.get",
        Err(RpcError::remote(-32602, "Invalid params.")),
    ));

    let err = resolver(&client)
        .resolve(ResourceKind::HostGroup, "Netvaktin Probes")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ResolveError::LookupFailed {
            kind: ResourceKind::HostGroup,
            source: RpcError::Remote { .. },
            ..
        }
    ));
}

#[tokio::test]
async fn numeric_ids_are_normalised() {
    let client = Arc::new(ScriptedRpcClient::new().on("hostgroup.get", Ok(json!([{ "groupid": 22 }]))));

    let id = resolver(&client)
        .resolve(ResourceKind::HostGroup, "Netvaktin Probes")
        .await
        .unwrap();

    assert_eq!(id, "22");
}

#[tokio::test]
async fn malformed_payloads_are_rejected() {
    let client = Arc::new(
        ScriptedRpcClient::new()
            .on("template.get", Ok(json!({ "templateid": "1" })))
            .on("hostgroup.get", Ok(json!([{ "name": "Netvaktin Probes" }]))),
    );
    let resolver = resolver(&client);

    let err = resolver
        .resolve(ResourceKind::Template, "Template Netvaktin")
        .await
        .unwrap_err();
    assert!(matches!(err, ResolveError::UnexpectedResponse { .. }));

    let err = resolver
        .resolve(ResourceKind::HostGroup, "Netvaktin Probes")
        .await
        .unwrap_err();
    assert!(matches!(err, ResolveError::UnexpectedResponse { .. }));
}

#[tokio::test]
async fn dependency_ref_is_resolved_once() {
    let client = Arc::new(ScriptedRpcClient::with_dependencies());
    let resolver = resolver(&client);
    let mut dep = DependencyRef::new(ResourceKind::Template, "Template Netvaktin");

    let first = resolver.resolve_ref(&mut dep).await.unwrap();
    let second = resolver.resolve_ref(&mut dep).await.unwrap();

    assert_eq!(first, TEMPLATE_ID);
    assert_eq!(second, TEMPLATE_ID);
    assert_eq!(dep.resolved_id(), Some(TEMPLATE_ID));
    assert_eq!(client.call_count(), 1);
}

#[tokio::test]
async fn resolve_all_stops_at_first_failure() {
    let client = Arc::new(ScriptedRpcClient::with_dependencies().on("template.get", Ok(json!([]))));
    let mut deps = vec![
        DependencyRef::new(ResourceKind::Template, "Template Netvaktin"),
        DependencyRef::new(ResourceKind::HostGroup, "Netvaktin Probes"),
    ];

    let err = resolver(&client).resolve_all(&mut deps).await.unwrap_err();

    assert!(matches!(err, ResolveError::NotFound { kind: ResourceKind::Template, .. }));
    assert_eq!(client.methods(), vec!["template.get"]);
    assert!(deps.iter().all(|d| d.resolved_id().is_none()));
}

#[tokio::test]
async fn resolve_all_returns_both_ids() {
    let client = Arc::new(ScriptedRpcClient::with_dependencies());
    let mut deps = vec![
        DependencyRef::new(ResourceKind::Template, "Template Netvaktin"),
        DependencyRef::new(ResourceKind::HostGroup, "Netvaktin Probes"),
    ];

    let resolved = resolver(&client).resolve_all(&mut deps).await.unwrap();

    assert_eq!(resolved.template_id, TEMPLATE_ID);
    assert_eq!(resolved.group_id, GROUP_ID);
}
