//! Launch orchestration
//!
//! One `execute` call is one launch attempt: optional test cluster manager
//! setup, node registration, then a forked or in-process broker start. A
//! launch that fails takes its registry entry with it.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use cluster_manager::{probe_naming_service, ManagementNamespace, ManagementServer, NodeRegistry};
use shared::{process_debug, process_info, process_warn, NodeId, ProcessId};

use crate::config::LaunchConfig;
use crate::error::{LauncherError, LauncherResult};
use crate::services::forked::ForkedLauncher;
use crate::services::process::BrokerProcess;
use crate::services::supervisor::BrokerSupervisor;
use crate::traits::BrokerBootstrap;

/// How long `--check-naming` waits for the naming service to accept a connection
pub const NAMING_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// What a successful launch left behind
#[derive(Debug)]
pub struct LaunchOutcome {
    pub node_id: NodeId,
    pub working_directory: PathBuf,
    /// Whether the node was recorded in a test cluster manager
    pub registered: bool,
    /// Broker process owned by the launcher, if one is still supervised
    pub process: Option<BrokerProcess>,
    /// Bound address of the management listener started by this launch
    pub management_addr: Option<SocketAddr>,
}

pub struct Launcher<B: BrokerBootstrap> {
    namespace: ManagementNamespace,
    supervisor: BrokerSupervisor,
    bootstrap: B,
    forked: ForkedLauncher,
    management: Option<ManagementServer>,
}

impl<B: BrokerBootstrap> Launcher<B> {
    pub fn new(namespace: ManagementNamespace, supervisor: BrokerSupervisor, bootstrap: B) -> Self {
        Self {
            namespace,
            supervisor,
            bootstrap,
            forked: ForkedLauncher::new(),
            management: None,
        }
    }

    pub fn namespace(&self) -> &ManagementNamespace {
        &self.namespace
    }

    pub fn supervisor(&self) -> &BrokerSupervisor {
        &self.supervisor
    }

    pub fn management_server(&self) -> Option<&ManagementServer> {
        self.management.as_ref()
    }

    /// Run one launch attempt for `config.node_id`
    pub async fn execute(&mut self, config: &LaunchConfig) -> LauncherResult<LaunchOutcome> {
        let node_id = &config.node_id;
        process_info!(ProcessId::current(), "🚀 Launching broker node {}", node_id);

        let mut management_addr = None;
        if config.test_cluster_manager {
            self.namespace
                .create_test_cluster_manager()
                .await
                .map_err(|e| LauncherError::setup(node_id, "failed to create cluster manager", e))?;
            if let Some(addr) = config.management_addr {
                management_addr = Some(self.serve_management(node_id, addr).await?);
            }
        }

        if config.check_naming {
            probe_naming_service(&config.naming_host, config.naming_port, NAMING_PROBE_TIMEOUT)
                .await
                .map_err(|e| LauncherError::setup(node_id, "naming service check failed", e))?;
        }

        let working_directory = config.resolved_working_directory()?;

        let registry: Option<Arc<dyn NodeRegistry>> = self.namespace.test_cluster_manager().await;
        match &registry {
            Some(registry) => {
                registry
                    .register_node(
                        node_id.clone(),
                        working_directory.clone(),
                        config.config_directory.clone(),
                        config.naming_port,
                        config.rmi_port,
                    )
                    .await;
            }
            None => {
                process_debug!(ProcessId::current(), "No test cluster manager bound; not registering node {}", node_id);
            }
        }

        let launched = if config.fork {
            self.launch_forked(config).await
        } else {
            self.launch_in_process(config, working_directory.clone()).await
        };

        match launched {
            Ok(process) => Ok(LaunchOutcome {
                node_id: node_id.clone(),
                working_directory,
                registered: registry.is_some(),
                process,
                management_addr,
            }),
            Err(e) => {
                if let Some(registry) = &registry {
                    registry.unregister_node(node_id).await;
                }
                Err(e)
            }
        }
    }

    /// Stop every supervised broker and the management listener
    pub async fn shutdown(&self) {
        self.supervisor.stop_all().await;
        if let Some(server) = &self.management {
            server.shutdown().await;
        }
    }

    async fn serve_management(&mut self, node_id: &NodeId, addr: SocketAddr) -> LauncherResult<SocketAddr> {
        let step = "failed to start management listener";
        let registry = self
            .namespace
            .test_cluster_manager()
            .await
            .ok_or_else(|| LauncherError::config("management listener needs a test cluster manager"))?;
        let terminator = self.supervisor.clone().with_registry(Arc::clone(&registry));

        let server = ManagementServer::for_test_cluster_manager(&self.namespace)
            .await
            .map_err(|e| LauncherError::setup(node_id, step, e))?
            .with_terminator(Arc::new(terminator));
        let bound = server
            .start(addr)
            .await
            .map_err(|e| LauncherError::setup(node_id, step, e))?;

        if let Some(previous) = self.management.replace(server) {
            previous.shutdown().await;
        }
        Ok(bound)
    }

    async fn launch_forked(&self, config: &LaunchConfig) -> LauncherResult<Option<BrokerProcess>> {
        let process = self
            .forked
            .launch_forked(config, &config.server_start_string, &config.server_failure_string)
            .await
            .map_err(|source| LauncherError::Spawn {
                node_id: config.node_id.clone(),
                source,
            })?;
        self.supervisor.adopt(process.clone()).await;

        if config.wait_on_start {
            let report = process.wait().await;
            if !report.success {
                process_warn!(
                    ProcessId::current(),
                    "⚠️ {} exited with {:?}",
                    config.node_id.process_label(),
                    report.code
                );
            }
        }
        Ok(Some(process))
    }

    async fn launch_in_process(
        &self,
        config: &LaunchConfig,
        working_directory: PathBuf,
    ) -> LauncherResult<Option<BrokerProcess>> {
        let node_id = &config.node_id;
        if let Some(dir) = &config.config_directory {
            if !dir.is_dir() {
                return Err(LauncherError::startup(
                    node_id,
                    format!("config directory {} does not exist", dir.display()),
                ));
            }
        }

        let bootstrap_config = config.bootstrap_config(working_directory);
        self.bootstrap
            .execute(&bootstrap_config)
            .await
            .map_err(|e| LauncherError::startup(node_id, e))?;
        Ok(self.supervisor.process(node_id).await)
    }
}
