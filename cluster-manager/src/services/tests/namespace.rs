//! Tests for binding the registry into the management namespace

use shared::NodeId;

use super::fixtures::*;
use crate::core::{ManagementNamespace, ObjectName, TEST_CLUSTER_MANAGER_NAME};
use crate::error::SetupError;
use crate::traits::NodeRegistry;

#[tokio::test]
async fn test_second_bind_fails_and_first_stays_usable() {
    let (namespace, first) = bound_namespace().await;
    first
        .register_node(NodeId::new("n1"), "/srv/n1".into(), None, 1099, 1098)
        .await;

    let second = namespace.create_test_cluster_manager().await;
    match second {
        Err(SetupError::AlreadyBound { name }) => {
            assert_eq!(name, ObjectName::parse(TEST_CLUSTER_MANAGER_NAME).unwrap().to_string());
        }
        other => panic!("expected AlreadyBound, got {other:?}"),
    }

    // Lookups still reach the first registry and its data
    let bound = namespace.test_cluster_manager().await.unwrap();
    assert!(bound.get_node(&NodeId::new("n1")).await.is_some());
    first.unregister_node(&NodeId::new("n1")).await;
    assert!(bound.get_node(&NodeId::new("n1")).await.is_none());
}

#[tokio::test]
async fn test_bind_under_equivalent_name_is_detected() {
    let (namespace, _manager) = bound_namespace().await;
    let reordered = ObjectName::parse("broker:type=TestClusterManager,module=test").unwrap();

    let result = namespace
        .bind(reordered, std::sync::Arc::new(crate::core::TestClusterManager::new()))
        .await;
    assert!(matches!(result, Err(SetupError::AlreadyBound { .. })));
}

#[tokio::test]
async fn test_separate_namespaces_are_independent() {
    let a = ManagementNamespace::new();
    let b = ManagementNamespace::new();

    a.create_test_cluster_manager().await.unwrap();
    assert!(b.create_test_cluster_manager().await.is_ok());
}
