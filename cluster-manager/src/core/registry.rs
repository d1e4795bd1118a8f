//! Test cluster node registry
//!
//! In-memory directory of the broker nodes a launcher has started, keyed by
//! node id. One write lock guards the whole table, so an insert, replace or
//! remove is atomic with respect to every reader.

use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;
use tokio::sync::RwLock;

use shared::{process_debug, NodeEntry, NodeId, ProcessId};

use crate::traits::NodeRegistry;

/// Registry of broker nodes used by integration tests for discovery
#[derive(Clone, Default)]
pub struct TestClusterManager {
    nodes: Arc<RwLock<IndexMap<NodeId, NodeEntry>>>,
}

impl TestClusterManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a prepared entry
    pub async fn register_entry(&self, entry: NodeEntry) {
        let mut nodes = self.nodes.write().await;
        let replaced = nodes.insert(entry.node_id.clone(), entry);
        if let Some(previous) = replaced {
            process_debug!(ProcessId::current(), "📝 Replaced registry entry {}", previous);
        }
    }
}

impl std::fmt::Debug for TestClusterManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestClusterManager").finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl NodeRegistry for TestClusterManager {
    async fn register_node(
        &self,
        node_id: NodeId,
        working_directory: PathBuf,
        config_directory: Option<PathBuf>,
        naming_port: u16,
        rmi_port: u16,
    ) {
        let entry = NodeEntry {
            node_id,
            working_directory,
            config_directory,
            naming_port,
            rmi_port,
        };
        process_debug!(ProcessId::current(), "📝 Registering node {}", entry);
        self.register_entry(entry).await;
    }

    async fn unregister_node(&self, node_id: &NodeId) -> bool {
        // shift_remove keeps the remaining entries in registration order
        let removed = self.nodes.write().await.shift_remove(node_id).is_some();
        if removed {
            process_debug!(ProcessId::current(), "🗑️ Unregistered node {}", node_id);
        }
        removed
    }

    async fn get_node(&self, node_id: &NodeId) -> Option<NodeEntry> {
        self.nodes.read().await.get(node_id).cloned()
    }

    async fn list_nodes(&self) -> Vec<NodeEntry> {
        self.nodes.read().await.values().cloned().collect()
    }

    async fn node_count(&self) -> usize {
        self.nodes.read().await.len()
    }
}
