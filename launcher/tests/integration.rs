//! End-to-end launches of shell-script brokers
//!
//! A harness discovers launched nodes through the management listener, the
//! same way an out-of-process integration test would.

#![cfg(unix)]

use std::net::SocketAddr;
use std::process::Stdio;
use std::time::Duration;

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

use launcher::{BrokerSupervisor, CommandBootstrap, LaunchConfig, Launcher, LauncherError, SpawnError};
use cluster_manager::ManagementNamespace;
use shared::NodeId;

mod common;
use common::TestFixtures;

fn launcher_for(config: &LaunchConfig) -> Launcher<CommandBootstrap> {
    let supervisor = BrokerSupervisor::new().with_stop_grace(Duration::from_secs(2));
    let bootstrap = CommandBootstrap::new(config.broker_command.clone(), supervisor.clone());
    Launcher::new(ManagementNamespace::new(), supervisor, bootstrap)
}

fn loopback_any_port() -> Option<SocketAddr> {
    Some(SocketAddr::from(([127, 0, 0, 1], 0)))
}

/// Test that a forked node is discoverable and can be terminated remotely
#[tokio::test]
async fn test_harness_discovers_and_terminates_forked_node() {
    let workdir = tempfile::tempdir().unwrap();
    let config = LaunchConfig {
        management_addr: loopback_any_port(),
        working_directory: workdir.path().to_path_buf(),
        naming_port: 2099,
        rmi_port: 2098,
        ..TestFixtures::forked("live", TestFixtures::HEALTHY_BROKER)
    };
    let mut launcher = launcher_for(&config);

    let outcome = launcher.execute(&config).await.unwrap();
    let process = outcome.process.clone().expect("forked process");
    let addr = outcome.management_addr.expect("listener address");

    let client = TestFixtures::connect_with_retry(addr, Duration::from_secs(5)).await;
    let nodes = client.list_nodes().await.unwrap();
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].node_id, NodeId::new("live"));
    assert_eq!(nodes[0].working_directory, workdir.path());
    assert_eq!((nodes[0].naming_port, nodes[0].rmi_port), (2099, 2098));

    assert!(client.terminate_node(&NodeId::new("live")).await.unwrap());
    assert!(process.has_exited());
    assert!(client.get_node(&NodeId::new("live")).await.unwrap().is_none());

    launcher.shutdown().await;
}

/// Test that a broker reporting failure leaves nothing registered
#[tokio::test]
async fn test_failed_start_is_not_discoverable() {
    let config = LaunchConfig {
        management_addr: loopback_any_port(),
        ..TestFixtures::forked("doomed", TestFixtures::FAILING_BROKER)
    };
    let mut launcher = launcher_for(&config);

    let err = launcher.execute(&config).await.unwrap_err();
    match &err {
        LauncherError::Spawn {
            node_id,
            source: SpawnError::FailedToStart { line },
        } => {
            assert_eq!(node_id, &NodeId::new("doomed"));
            assert!(line.contains("address already in use"));
        }
        other => panic!("expected FailedToStart, got {other:?}"),
    }

    let registry = launcher.namespace().test_cluster_manager().await.unwrap();
    assert!(registry.list_nodes().await.is_empty());
    launcher.shutdown().await;
}

/// Test that an attached broker started without waiting stays supervised
#[tokio::test]
async fn test_in_process_broker_is_supervised_until_shutdown() {
    let config = LaunchConfig {
        fork: false,
        ..TestFixtures::forked("attached", "sleep 30")
    };
    let mut launcher = launcher_for(&config);

    let outcome = launcher.execute(&config).await.unwrap();
    let process = outcome.process.expect("attached broker is supervised");
    assert!(outcome.registered);
    assert!(!process.has_exited());

    launcher.shutdown().await;
    assert!(process.has_exited());
}

/// Test the binary end to end: launch, query, then SIGTERM stops the forked broker
#[tokio::test]
async fn test_binary_serves_nodes_until_terminated() {
    let scratch = tempfile::tempdir().unwrap();
    let pid_file = scratch.path().join("broker.pid");
    let addr = SocketAddr::from(([127, 0, 0, 1], TestFixtures::free_port()));
    let mut launcher = tokio::process::Command::new(env!("CARGO_BIN_EXE_broker-launcher"))
        .args(["--fork", "--node-id", "n1", "--test-cluster-manager", "--management-addr"])
        .arg(addr.to_string())
        .arg("--property")
        .arg(format!("BROKER_PID_FILE={}", pid_file.display()))
        .arg("--")
        .args(TestFixtures::sh_broker(TestFixtures::PID_REPORTING_BROKER))
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .unwrap();

    let client = TestFixtures::connect_with_retry(addr, Duration::from_secs(10)).await;
    assert_eq!(client.address(), addr);
    let node = client.get_node(&NodeId::new("n1")).await.unwrap();
    assert!(node.is_some());
    let broker = TestFixtures::wait_for_pid(&pid_file, Duration::from_secs(10)).await;

    let query = tokio::process::Command::new(env!("CARGO_BIN_EXE_broker-launcher"))
        .arg("--query")
        .arg(addr.to_string())
        .output()
        .await
        .unwrap();
    assert!(query.status.success());
    let listed: serde_json::Value = serde_json::from_slice(&query.stdout).unwrap();
    assert_eq!(listed[0]["node_id"], "n1");

    let pid = launcher.id().expect("launcher is running");
    kill(Pid::from_raw(pid as i32), Signal::SIGTERM).unwrap();
    let status = tokio::time::timeout(Duration::from_secs(15), launcher.wait())
        .await
        .expect("launcher exits after SIGTERM")
        .unwrap();
    assert!(status.success());
    assert!(TestFixtures::process_gone(broker, Duration::from_secs(5)).await);
}

/// Test that SIGTERM reaches an attached broker the launcher is waiting on
#[tokio::test]
async fn test_binary_waiting_on_attached_broker_stops_it_on_sigterm() {
    let scratch = tempfile::tempdir().unwrap();
    let pid_file = scratch.path().join("broker.pid");
    let mut launcher = tokio::process::Command::new(env!("CARGO_BIN_EXE_broker-launcher"))
        .args(["--wait-on-start", "--node-id", "n2", "--property"])
        .arg(format!("BROKER_PID_FILE={}", pid_file.display()))
        .arg("--")
        .args(TestFixtures::sh_broker(TestFixtures::PID_REPORTING_BROKER))
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .unwrap();

    let broker = TestFixtures::wait_for_pid(&pid_file, Duration::from_secs(10)).await;
    assert!(!TestFixtures::process_gone(broker, Duration::ZERO).await);

    let pid = launcher.id().expect("launcher is running");
    kill(Pid::from_raw(pid as i32), Signal::SIGTERM).unwrap();
    tokio::time::timeout(Duration::from_secs(15), launcher.wait())
        .await
        .expect("launcher exits after SIGTERM")
        .unwrap();
    assert!(TestFixtures::process_gone(broker, Duration::from_secs(5)).await);
}
