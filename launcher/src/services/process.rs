//! Handle to a running broker process
//!
//! Once a broker child is up, a monitor task owns the `Child`: it waits for
//! exit and services stop requests. `BrokerProcess` handles are cheap clones
//! that talk to that task, so the launcher, the supervisor and the management
//! listener can all hold one.

use std::process::ExitStatus;
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;

use shared::{process_debug, process_warn, NodeId, ProcessId};

/// How a broker process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitReport {
    pub code: Option<i32>,
    pub success: bool,
}

impl From<ExitStatus> for ExitReport {
    fn from(status: ExitStatus) -> Self {
        Self {
            code: status.code(),
            success: status.success(),
        }
    }
}

impl ExitReport {
    /// Used when the exit status could not be collected
    fn unknown() -> Self {
        Self {
            code: None,
            success: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BrokerProcess {
    node_id: NodeId,
    pid: Option<u32>,
    stop_tx: mpsc::Sender<Duration>,
    exit_rx: watch::Receiver<Option<ExitReport>>,
}

impl BrokerProcess {
    /// Hand `child` to a monitor task and return a handle to it
    pub fn monitor(node_id: NodeId, mut child: Child) -> Self {
        let pid = child.id();
        let (stop_tx, mut stop_rx) = mpsc::channel::<Duration>(1);
        let (exit_tx, exit_rx) = watch::channel(None);
        let label = node_id.process_label();

        tokio::spawn(async move {
            let status = tokio::select! {
                status = child.wait() => status,
                Some(grace) = stop_rx.recv() => terminate(&mut child, grace).await,
            };
            let report = match status {
                Ok(status) => ExitReport::from(status),
                Err(e) => {
                    process_warn!(ProcessId::current(), "⚠️ Could not collect exit status of {}: {}", label, e);
                    ExitReport::unknown()
                }
            };
            process_debug!(ProcessId::current(), "🛑 {} exited ({:?})", label, report.code);
            let _ = exit_tx.send(Some(report));
        });

        Self {
            node_id,
            pid,
            stop_tx,
            exit_rx,
        }
    }

    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn has_exited(&self) -> bool {
        self.exit_rx.borrow().is_some()
    }

    /// Wait for the process to exit
    pub async fn wait(&self) -> ExitReport {
        let mut exit_rx = self.exit_rx.clone();
        match exit_rx.wait_for(Option::is_some).await {
            Ok(report) => (*report).unwrap_or_else(ExitReport::unknown),
            // Monitor task is gone without reporting
            Err(_) => ExitReport::unknown(),
        }
    }

    /// Ask the process to terminate, escalating to a kill after `grace`
    ///
    /// Returns `false` if the process had already exited.
    pub async fn stop(&self, grace: Duration) -> bool {
        if self.has_exited() {
            return false;
        }
        // A full channel means a stop is already in flight
        let _ = self.stop_tx.try_send(grace);
        self.wait().await;
        true
    }
}

/// SIGTERM, then SIGKILL once `grace` elapses
async fn terminate(child: &mut Child, grace: Duration) -> std::io::Result<ExitStatus> {
    if let Some(pid) = child.id() {
        if request_exit(pid) {
            if let Ok(status) = timeout(grace, child.wait()).await {
                return status;
            }
            process_warn!(ProcessId::current(), "🔨 Process {} ignored SIGTERM, killing", pid);
        }
    }
    child.kill().await?;
    child.wait().await
}

#[cfg(unix)]
fn request_exit(pid: u32) -> bool {
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok()
}

#[cfg(not(unix))]
fn request_exit(_pid: u32) -> bool {
    false
}

/// Arrange for `command`'s child to die with the launcher
///
/// The child is killed when its handle is dropped, and on Linux the kernel
/// also delivers SIGKILL to it if the launcher dies without running any
/// cleanup.
pub fn bind_to_parent(command: &mut Command) {
    command.kill_on_drop(true);

    #[cfg(target_os = "linux")]
    unsafe {
        // Only async-signal-safe work happens between fork and exec here
        command.pre_exec(|| {
            nix::sys::prctl::set_pdeathsig(nix::sys::signal::Signal::SIGKILL).map_err(std::io::Error::from)
        });
    }
}
