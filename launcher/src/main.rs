//! Main entry point for the broker launcher binary

use std::net::SocketAddr;

use clap::Parser;

use cluster_manager::{ManagementClient, ManagementNamespace};
use launcher::{Args, BrokerSupervisor, CommandBootstrap, Launcher, LauncherResult, ShutdownHook};
use shared::{logging, process_debug, process_info, ProcessId};

#[tokio::main]
async fn main() -> LauncherResult<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    ProcessId::init_launcher();
    logging::init_tracing_with_level(Some(&args.log_level));

    if let Some(addr) = args.query {
        return print_nodes(addr).await;
    }

    let config = args.into_config()?;
    logging::log_startup(ProcessId::current(), &format!("broker launcher for node {}", config.node_id));
    process_debug!(
        ProcessId::current(),
        "Command: {:?}, fork: {}, working dir: {}",
        config.broker_command,
        config.fork,
        config.working_directory.display()
    );

    let supervisor = BrokerSupervisor::new();
    let hook = ShutdownHook::install(supervisor.clone());
    let bootstrap = CommandBootstrap::new(config.broker_command.clone(), supervisor.clone());
    let mut launcher = Launcher::new(ManagementNamespace::new(), supervisor, bootstrap);

    let outcome = match launcher.execute(&config).await {
        Ok(outcome) => outcome,
        Err(e) => {
            logging::log_error(ProcessId::current(), "Broker launch", &e);
            hook.run().await;
            return Err(e);
        }
    };

    if let Some(addr) = outcome.management_addr {
        process_info!(ProcessId::current(), "📇 Test cluster manager reachable at {}", addr);
    }

    let broker_running = outcome.process.as_ref().is_some_and(|p| !p.has_exited());
    if !config.wait_on_start && (broker_running || outcome.management_addr.is_some()) {
        process_info!(ProcessId::current(), "⏳ Broker node {} running; Ctrl+C to stop", outcome.node_id);
        let broker_exit = async {
            match &outcome.process {
                Some(process) => {
                    process.wait().await;
                }
                None => std::future::pending::<()>().await,
            }
        };
        tokio::select! {
            _ = hook.triggered() => {}
            _ = broker_exit, if outcome.management_addr.is_none() => {
                process_info!(ProcessId::current(), "🏁 Broker node {} exited", outcome.node_id);
            }
        }
    }

    launcher.shutdown().await;
    hook.run().await;

    logging::log_success(ProcessId::current(), "Broker launcher stopped gracefully");
    Ok(())
}

/// Print the nodes a running launcher has registered
async fn print_nodes(addr: SocketAddr) -> LauncherResult<()> {
    let client = ManagementClient::connect(addr).await?;
    process_debug!(ProcessId::current(), "Querying test cluster manager at {}", client.address());
    let nodes = client.list_nodes().await?;
    let json = serde_json::to_string_pretty(&nodes).map_err(std::io::Error::from)?;
    println!("{json}");
    Ok(())
}
