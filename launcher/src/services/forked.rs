//! Forked broker launches
//!
//! Spawns the broker command as a child process with the launch
//! configuration rendered as flags, forwards its output into the log, and
//! waits for the start or failure marker before handing the child to a
//! monitor.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};

use shared::{process_debug, process_info, ProcessId};

use crate::config::LaunchConfig;
use crate::error::SpawnError;
use crate::services::process::{bind_to_parent, BrokerProcess};

/// How long to keep reading output after the child exits, looking for a marker
const DRAIN_AFTER_EXIT: Duration = Duration::from_millis(500);

/// What the output readers saw
#[derive(Debug)]
enum StartSignal {
    Started,
    Failed(String),
}

#[derive(Debug, Clone, Default)]
pub struct ForkedLauncher;

impl ForkedLauncher {
    pub fn new() -> Self {
        Self
    }

    /// Build the command for `config` without spawning it
    pub fn command(&self, config: &LaunchConfig) -> Result<Command, SpawnError> {
        let (program, fixed_args) = config
            .broker_command
            .split_first()
            .ok_or(SpawnError::EmptyCommand)?;
        let working_directory = config
            .resolved_working_directory()
            .map_err(|e| SpawnError::Spawn(std::io::Error::other(e.to_string())))?;
        let bootstrap = config.bootstrap_config(working_directory.clone());

        let mut command = Command::new(program);
        command
            .args(fixed_args)
            .args(bootstrap.to_args())
            .envs(config.properties.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(&working_directory)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        bind_to_parent(&mut command);
        Ok(command)
    }

    /// Spawn the broker and wait until it reports a start
    ///
    /// Blocks until a line containing `start_sentinel` or `failure_sentinel`
    /// appears on the child's output, the child exits, or the configured start
    /// timeout passes. Only a reported start returns a live process; every
    /// other outcome leaves no child behind.
    pub async fn launch_forked(
        &self,
        config: &LaunchConfig,
        start_sentinel: &str,
        failure_sentinel: &str,
    ) -> Result<BrokerProcess, SpawnError> {
        let label = config.node_id.process_label();
        let broker = ProcessId::Broker(config.node_id.clone());
        let mut child = self.command(config)?.spawn().map_err(SpawnError::Spawn)?;

        process_debug!(
            ProcessId::current(),
            "🏭 Spawned {} (PID: {:?}) in {}",
            label,
            child.id(),
            config.working_directory.display()
        );

        let (signal_tx, mut signal_rx) = mpsc::channel(4);
        if let Some(stdout) = child.stdout.take() {
            forward_output(stdout, broker.clone(), start_sentinel, failure_sentinel, signal_tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            forward_output(stderr, broker, start_sentinel, failure_sentinel, signal_tx.clone());
        }
        // Readers hold the only senders, so the channel closes once both streams end
        drop(signal_tx);

        let outcome = tokio::select! {
            biased;
            Some(signal) = signal_rx.recv() => Ok(signal),
            status = child.wait() => {
                // The marker may still be in flight on the pipe
                match timeout(DRAIN_AFTER_EXIT, signal_rx.recv()).await {
                    Ok(Some(signal)) => Ok(signal),
                    _ => Err(SpawnError::ExitedEarly {
                        code: status.ok().and_then(|s| s.code()),
                    }),
                }
            }
            _ = sleep(config.start_timeout) => Err(SpawnError::StartTimeout { timeout: config.start_timeout }),
        };

        match outcome {
            Ok(StartSignal::Started) => {
                process_info!(ProcessId::current(), "✅ {} reported startup", label);
                Ok(BrokerProcess::monitor(config.node_id.clone(), child))
            }
            Ok(StartSignal::Failed(line)) => {
                discard(&mut child).await;
                Err(SpawnError::FailedToStart { line })
            }
            Err(e) => {
                discard(&mut child).await;
                Err(e)
            }
        }
    }
}

/// Kill a child that did not start; it may already be gone
async fn discard(child: &mut Child) {
    let _ = child.kill().await;
}

/// Log every output line and report the first start/failure marker seen
fn forward_output<R>(
    stream: R,
    broker: ProcessId,
    start_sentinel: &str,
    failure_sentinel: &str,
    signal_tx: mpsc::Sender<StartSignal>,
) where
    R: AsyncRead + Unpin + Send + 'static,
{
    let start_sentinel = start_sentinel.to_string();
    let failure_sentinel = failure_sentinel.to_string();

    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        let mut reported = false;
        while let Ok(Some(line)) = lines.next_line().await {
            process_info!(broker, "{}", line);
            if reported {
                continue;
            }
            // Failure wins if a line somehow carries both markers
            let signal = if !failure_sentinel.is_empty() && line.contains(&failure_sentinel) {
                Some(StartSignal::Failed(line))
            } else if line.contains(&start_sentinel) {
                Some(StartSignal::Started)
            } else {
                None
            };
            if let Some(signal) = signal {
                reported = true;
                let _ = signal_tx.send(signal).await;
            }
        }
    });
}
