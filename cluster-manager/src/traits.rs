//! Trait definitions with mockall annotations for testing
//!
//! `NodeRegistry` is the seam test harnesses and the launcher program against;
//! `NodeTerminator` lets the management listener ask whoever owns the broker
//! processes to stop one.

use std::path::PathBuf;

use shared::{NodeEntry, NodeId};

/// Directory of broker nodes currently launched
///
/// Every operation is a bounded in-memory mutation or read. Lookups return
/// snapshots; nothing handed out aliases the registry's table.
#[mockall::automock]
#[async_trait::async_trait]
pub trait NodeRegistry: Send + Sync {
    /// Insert or replace the entry for `node_id`
    ///
    /// Re-registering an id replaces the previous entry wholesale. The entry
    /// is visible to every reader once this returns.
    async fn register_node(
        &self,
        node_id: NodeId,
        working_directory: PathBuf,
        config_directory: Option<PathBuf>,
        naming_port: u16,
        rmi_port: u16,
    );

    /// Remove the entry for `node_id`; returns whether one was present
    async fn unregister_node(&self, node_id: &NodeId) -> bool;

    /// Snapshot lookup; `None` when no node is registered under `node_id`
    async fn get_node(&self, node_id: &NodeId) -> Option<NodeEntry>;

    /// Snapshot of every registered node, in registration order
    async fn list_nodes(&self) -> Vec<NodeEntry>;

    async fn node_count(&self) -> usize;
}

/// Stops the broker process backing a node
#[mockall::automock]
#[async_trait::async_trait]
pub trait NodeTerminator: Send + Sync {
    /// Returns `true` if a running process was found and stopped
    async fn terminate_node(&self, node_id: &NodeId) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_registry_reports_not_found() {
        let mut registry = MockNodeRegistry::new();
        registry.expect_get_node().returning(|_| None);

        assert!(registry.get_node(&NodeId::new("missing")).await.is_none());
    }

    #[tokio::test]
    async fn test_mock_terminator() {
        let mut terminator = MockNodeTerminator::new();
        terminator
            .expect_terminate_node()
            .withf(|id| id.as_str() == "n1")
            .returning(|_| true);

        assert!(terminator.terminate_node(&NodeId::new("n1")).await);
    }
}
