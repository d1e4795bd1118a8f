//! Broker commands and launch configurations used across launcher tests

use std::net::{SocketAddr, TcpListener};
use std::path::Path;
use std::time::Duration;

use nix::sys::signal::kill;
use nix::unistd::Pid;

use cluster_manager::ManagementClient;
use launcher::LaunchConfig;
use shared::NodeId;

pub struct TestFixtures;

impl TestFixtures {
    /// A broker that reports startup and then idles
    pub const HEALTHY_BROKER: &'static str = "echo booting; echo STARTED::; sleep 30";

    /// A broker that reports a failed start
    pub const FAILING_BROKER: &'static str = "echo 'FAILED:: address already in use'; sleep 30";

    /// A broker that writes its PID to `$BROKER_PID_FILE`, reports startup and idles
    pub const PID_REPORTING_BROKER: &'static str =
        r#"echo $$ > "$BROKER_PID_FILE.tmp" && mv "$BROKER_PID_FILE.tmp" "$BROKER_PID_FILE"; echo STARTED::; exec sleep 30"#;

    /// `sh -c script` with `broker` as `$0`, so rendered flags become `$1..`
    pub fn sh_broker(script: &str) -> Vec<String> {
        vec![
            "sh".to_string(),
            "-c".to_string(),
            script.to_string(),
            "broker".to_string(),
        ]
    }

    /// Forked launch of `script` with the test cluster manager enabled
    pub fn forked(node: &str, script: &str) -> LaunchConfig {
        LaunchConfig {
            node_id: NodeId::new(node),
            fork: true,
            test_cluster_manager: true,
            broker_command: Self::sh_broker(script),
            start_timeout: Duration::from_secs(10),
            ..LaunchConfig::default()
        }
    }

    /// A loopback port nothing is listening on right now
    pub fn free_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    /// Connect to a management listener that may still be starting
    pub async fn connect_with_retry(addr: SocketAddr, wait: Duration) -> ManagementClient {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            match ManagementClient::connect(addr).await {
                Ok(client) => return client,
                Err(e) if tokio::time::Instant::now() >= deadline => {
                    panic!("management listener at {addr} never came up: {e}")
                }
                Err(_) => tokio::time::sleep(Duration::from_millis(100)).await,
            }
        }
    }

    /// PID written by `PID_REPORTING_BROKER`
    pub async fn wait_for_pid(pid_file: &Path, wait: Duration) -> Pid {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            if let Ok(raw) = std::fs::read_to_string(pid_file) {
                if let Ok(pid) = raw.trim().parse::<i32>() {
                    return Pid::from_raw(pid);
                }
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "broker never wrote {}",
                pid_file.display()
            );
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    /// Whether `pid` is gone within `wait`
    pub async fn process_gone(pid: Pid, wait: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            // Signal 0 only checks that the process exists
            if kill(pid, None).is_err() {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}
