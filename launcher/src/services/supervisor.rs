//! Broker process supervision
//!
//! Keeps the broker processes this launcher started, keyed by node id, and
//! stops them on request or at shutdown.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use cluster_manager::{NodeRegistry, NodeTerminator};
use shared::{process_debug, process_info, NodeId, ProcessId};

use crate::services::process::BrokerProcess;

/// Time a broker gets to exit after SIGTERM before it is killed
pub const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct BrokerSupervisor {
    processes: Arc<Mutex<HashMap<NodeId, BrokerProcess>>>,
    registry: Option<Arc<dyn NodeRegistry>>,
    stop_grace: Duration,
}

impl BrokerSupervisor {
    pub fn new() -> Self {
        Self {
            processes: Arc::new(Mutex::new(HashMap::new())),
            registry: None,
            stop_grace: DEFAULT_STOP_GRACE,
        }
    }

    /// Unregister nodes from `registry` when their process is terminated (fluent API)
    pub fn with_registry(mut self, registry: Arc<dyn NodeRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Configure the SIGTERM grace period (fluent API)
    pub fn with_stop_grace(mut self, grace: Duration) -> Self {
        self.stop_grace = grace;
        self
    }

    /// Take ownership of a running broker; replaces and stops any previous one for the same node
    pub async fn adopt(&self, process: BrokerProcess) {
        let previous = self
            .processes
            .lock()
            .await
            .insert(process.node_id().clone(), process);
        if let Some(previous) = previous {
            process_info!(ProcessId::current(), "🔁 Replacing running broker for node {}", previous.node_id());
            previous.stop(self.stop_grace).await;
        }
    }

    pub async fn process(&self, node_id: &NodeId) -> Option<BrokerProcess> {
        self.processes.lock().await.get(node_id).cloned()
    }

    /// Nodes whose processes are still running; exited ones are dropped
    pub async fn running_nodes(&self) -> Vec<NodeId> {
        let mut processes = self.processes.lock().await;
        processes.retain(|_, process| !process.has_exited());
        processes.keys().cloned().collect()
    }

    /// Forget a node without stopping it
    pub async fn release(&self, node_id: &NodeId) -> Option<BrokerProcess> {
        self.processes.lock().await.remove(node_id)
    }

    /// Stop one node's broker; returns whether a running process was stopped
    pub async fn stop_node(&self, node_id: &NodeId) -> bool {
        let process = self.processes.lock().await.remove(node_id);
        let stopped = match process {
            Some(process) => process.stop(self.stop_grace).await,
            None => false,
        };
        if stopped {
            process_debug!(ProcessId::current(), "🛑 Stopped broker for node {}", node_id);
        }
        stopped
    }

    /// Stop every supervised broker
    pub async fn stop_all(&self) {
        let processes: Vec<_> = self.processes.lock().await.drain().map(|(_, p)| p).collect();
        for process in &processes {
            process.stop(self.stop_grace).await;
        }
        if !processes.is_empty() {
            process_debug!(ProcessId::current(), "🛑 All {} broker processes stopped", processes.len());
        }
    }
}

impl Default for BrokerSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NodeTerminator for BrokerSupervisor {
    async fn terminate_node(&self, node_id: &NodeId) -> bool {
        let stopped = self.stop_node(node_id).await;
        if let Some(registry) = &self.registry {
            registry.unregister_node(node_id).await;
        }
        stopped
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use cluster_manager::TestClusterManager;
    use tokio::process::Command;

    fn spawn_sleeper(node: &str) -> BrokerProcess {
        let mut command = Command::new("sh");
        command.arg("-c").arg("sleep 30");
        crate::services::process::bind_to_parent(&mut command);
        BrokerProcess::monitor(NodeId::new(node), command.spawn().unwrap())
    }

    #[tokio::test]
    async fn test_stop_unknown_node_is_false() {
        let supervisor = BrokerSupervisor::new();
        assert!(!supervisor.stop_node(&NodeId::new("ghost")).await);
    }

    #[tokio::test]
    async fn test_adopt_and_stop_all() {
        let supervisor = BrokerSupervisor::new().with_stop_grace(Duration::from_secs(2));
        let a = spawn_sleeper("a");
        let b = spawn_sleeper("b");
        supervisor.adopt(a.clone()).await;
        supervisor.adopt(b.clone()).await;

        let mut running = supervisor.running_nodes().await;
        running.sort();
        assert_eq!(running, vec![NodeId::new("a"), NodeId::new("b")]);

        supervisor.stop_all().await;
        assert!(a.has_exited());
        assert!(b.has_exited());
        assert!(supervisor.running_nodes().await.is_empty());
    }

    #[tokio::test]
    async fn test_terminate_unregisters_node() {
        let registry = Arc::new(TestClusterManager::new());
        registry
            .register_node(NodeId::new("n1"), "/srv/n1".into(), None, 1099, 1098)
            .await;
        let supervisor = BrokerSupervisor::new()
            .with_registry(registry.clone())
            .with_stop_grace(Duration::from_secs(2));
        supervisor.adopt(spawn_sleeper("n1")).await;

        assert!(supervisor.terminate_node(&NodeId::new("n1")).await);
        assert!(registry.get_node(&NodeId::new("n1")).await.is_none());
        assert!(!supervisor.terminate_node(&NodeId::new("n1")).await);
    }

    #[tokio::test]
    async fn test_adopting_same_node_replaces_previous() {
        let supervisor = BrokerSupervisor::new().with_stop_grace(Duration::from_secs(2));
        let first = spawn_sleeper("n1");
        supervisor.adopt(first.clone()).await;
        supervisor.adopt(spawn_sleeper("n1")).await;

        assert!(first.has_exited());
        assert_eq!(supervisor.running_nodes().await.len(), 1);
        supervisor.stop_all().await;
    }
}
