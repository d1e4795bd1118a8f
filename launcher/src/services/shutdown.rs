//! Shutdown hook for forked brokers
//!
//! Watches for Ctrl+C and SIGTERM. When either arrives, every supervised
//! broker is stopped before waiters are released, so the launcher never exits
//! with a broker child still running. Normal exit paths call `run` directly.

use tokio::sync::watch;
use tokio::task::JoinHandle;

use shared::{logging, ProcessId};

use crate::services::supervisor::BrokerSupervisor;

pub struct ShutdownHook {
    supervisor: BrokerSupervisor,
    done_rx: watch::Receiver<bool>,
    done_tx: watch::Sender<bool>,
    signal_task: Option<JoinHandle<()>>,
}

impl ShutdownHook {
    /// Create a hook that only runs when `run` is called
    pub fn new(supervisor: BrokerSupervisor) -> Self {
        let (done_tx, done_rx) = watch::channel(false);
        Self {
            supervisor,
            done_rx,
            done_tx,
            signal_task: None,
        }
    }

    /// Create a hook that also runs on Ctrl+C or SIGTERM
    pub fn install(supervisor: BrokerSupervisor) -> Self {
        let mut hook = Self::new(supervisor);
        let supervisor = hook.supervisor.clone();
        let done_tx = hook.done_tx.clone();

        hook.signal_task = Some(tokio::spawn(async move {
            let reason = wait_for_signal().await;
            logging::log_shutdown(ProcessId::current(), reason);
            supervisor.stop_all().await;
            let _ = done_tx.send(true);
        }));
        hook
    }

    /// Stop all supervised brokers now
    pub async fn run(&self) {
        self.supervisor.stop_all().await;
        let _ = self.done_tx.send(true);
    }

    /// Wait until the hook has run, by signal or by `run`
    pub async fn triggered(&self) {
        let mut done_rx = self.done_rx.clone();
        let _ = done_rx.wait_for(|done| *done).await;
    }

    pub fn has_run(&self) -> bool {
        *self.done_rx.borrow()
    }
}

impl Drop for ShutdownHook {
    fn drop(&mut self) {
        if let Some(task) = self.signal_task.take() {
            task.abort();
        }
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => tokio::select! {
            _ = tokio::signal::ctrl_c() => "Received Ctrl+C signal",
            _ = terminate.recv() => "Received SIGTERM",
        },
        Err(e) => {
            logging::log_error(ProcessId::current(), "Installing SIGTERM handler", &e);
            let _ = tokio::signal::ctrl_c().await;
            "Received Ctrl+C signal"
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    let _ = tokio::signal::ctrl_c().await;
    "Received Ctrl+C signal"
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::services::process::{bind_to_parent, BrokerProcess};
    use shared::NodeId;
    use std::time::Duration;
    use tokio::process::Command;

    #[tokio::test]
    async fn test_run_stops_children_and_releases_waiters() {
        let supervisor = BrokerSupervisor::new().with_stop_grace(Duration::from_secs(2));
        let mut command = Command::new("sh");
        command.arg("-c").arg("sleep 30");
        bind_to_parent(&mut command);
        let process = BrokerProcess::monitor(NodeId::new("n1"), command.spawn().unwrap());
        supervisor.adopt(process.clone()).await;

        let hook = ShutdownHook::install(supervisor);
        assert!(!hook.has_run());

        hook.run().await;
        tokio::time::timeout(Duration::from_secs(5), hook.triggered())
            .await
            .expect("hook reports completion");
        assert!(hook.has_run());
        assert!(process.has_exited());
    }
}
