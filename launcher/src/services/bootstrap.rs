//! In-process broker bootstrap
//!
//! The broker is an external executable, so "in-process" means attached to
//! the launcher: the child shares the launcher's stdio and lives under its
//! supervision instead of being watched for a start marker.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use shared::{process_debug, process_info, ProcessId};

use crate::config::BootstrapConfig;
use crate::error::{BoxError, SpawnError};
use crate::services::process::{bind_to_parent, BrokerProcess};
use crate::services::supervisor::BrokerSupervisor;
use crate::traits::BrokerBootstrap;

#[derive(Clone)]
pub struct CommandBootstrap {
    command: Vec<String>,
    supervisor: BrokerSupervisor,
}

impl CommandBootstrap {
    /// `command` is the broker executable followed by its fixed arguments
    pub fn new(command: Vec<String>, supervisor: BrokerSupervisor) -> Self {
        Self { command, supervisor }
    }

    fn build(&self, config: &BootstrapConfig) -> Result<Command, SpawnError> {
        let (program, fixed_args) = self.command.split_first().ok_or(SpawnError::EmptyCommand)?;

        let mut command = Command::new(program);
        command
            .args(fixed_args)
            .args(config.to_args())
            .envs(config.properties.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(&config.working_directory)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        bind_to_parent(&mut command);
        Ok(command)
    }
}

#[async_trait]
impl BrokerBootstrap for CommandBootstrap {
    async fn execute(&self, config: &BootstrapConfig) -> Result<(), BoxError> {
        let child = self.build(config)?.spawn().map_err(SpawnError::Spawn)?;
        let label = config.node_id.process_label();
        let process = BrokerProcess::monitor(config.node_id.clone(), child);
        process_debug!(ProcessId::current(), "🏭 Started {} attached (PID: {:?})", label, process.pid());

        // Supervised even while waiting, so the shutdown hook can stop it
        self.supervisor.adopt(process.clone()).await;
        if !config.wait_on_start {
            return Ok(());
        }

        let report = process.wait().await;
        self.supervisor.release(&config.node_id).await;
        process_info!(ProcessId::current(), "🏁 {} finished ({:?})", label, report.code);
        if !report.success {
            return Err(SpawnError::ExitedEarly { code: report.code }.into());
        }
        Ok(())
    }
}
