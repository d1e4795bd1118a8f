//! Helpers shared by the cluster-manager integration tests

use std::net::SocketAddr;

use cluster_manager::{ManagementNamespace, ManagementServer, TestClusterManager};
use shared::{logging, ProcessId};

/// A namespace with the manager bound and a listener on an ephemeral port
pub struct Harness {
    pub namespace: ManagementNamespace,
    pub manager: TestClusterManager,
    pub server: ManagementServer,
    pub addr: SocketAddr,
}

impl Harness {
    pub async fn start() -> Self {
        ProcessId::init_harness();
        logging::init_tracing();

        let namespace = ManagementNamespace::new();
        let manager = namespace.create_test_cluster_manager().await.unwrap();
        let server = ManagementServer::for_test_cluster_manager(&namespace).await.unwrap();
        let addr = server.start(SocketAddr::from(([127, 0, 0, 1], 0))).await.unwrap();
        Self {
            namespace,
            manager,
            server,
            addr,
        }
    }
}
