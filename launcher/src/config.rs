//! Launch configuration
//!
//! `Args` is the command-line surface (every flag can also come from a
//! `BROKER_*` environment variable or a `.env` file). It resolves into a
//! `LaunchConfig`, and each launch derives the `BootstrapConfig` handed to the
//! broker, whether in-process or as command-line flags of a forked child.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::{Deserialize, Serialize};

use shared::{NodeId, DEFAULT_NAMING_PORT, DEFAULT_RMI_PORT};

use crate::error::{LauncherError, LauncherResult};

pub const DEFAULT_START_SENTINEL: &str = "STARTED::";
pub const DEFAULT_FAILURE_SENTINEL: &str = "FAILED::";
pub const DEFAULT_START_TIMEOUT: Duration = Duration::from_secs(60);

/// Everything a launch attempt needs, already resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchConfig {
    pub use_naming: bool,
    pub naming_host: String,
    pub naming_port: u16,
    pub rmi_port: u16,
    pub config_directory: Option<PathBuf>,
    pub wait_on_start: bool,
    pub node_id: NodeId,
    /// Opaque security-manager handle forwarded to the broker
    pub security_manager: Option<String>,
    pub fork: bool,
    pub debug: bool,
    pub properties: Vec<(String, String)>,
    pub server_start_string: String,
    pub server_failure_string: String,
    pub test_cluster_manager: bool,
    pub management_addr: Option<SocketAddr>,
    pub check_naming: bool,
    /// Directory the broker runs in; relative paths resolve against the current directory
    pub working_directory: PathBuf,
    /// Broker executable followed by its fixed arguments
    pub broker_command: Vec<String>,
    pub start_timeout: Duration,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            use_naming: true,
            naming_host: "localhost".to_string(),
            naming_port: DEFAULT_NAMING_PORT,
            rmi_port: DEFAULT_RMI_PORT,
            config_directory: None,
            wait_on_start: false,
            node_id: NodeId::default_node(),
            security_manager: None,
            fork: false,
            debug: false,
            properties: Vec::new(),
            server_start_string: DEFAULT_START_SENTINEL.to_string(),
            server_failure_string: DEFAULT_FAILURE_SENTINEL.to_string(),
            test_cluster_manager: false,
            management_addr: None,
            check_naming: false,
            working_directory: PathBuf::from("."),
            broker_command: Vec::new(),
            start_timeout: DEFAULT_START_TIMEOUT,
        }
    }
}

impl LaunchConfig {
    /// Absolute form of `working_directory`
    pub fn resolved_working_directory(&self) -> LauncherResult<PathBuf> {
        absolute(&self.working_directory)
    }

    /// Configuration handed to the broker bootstrap
    pub fn bootstrap_config(&self, working_directory: PathBuf) -> BootstrapConfig {
        BootstrapConfig {
            use_naming: self.use_naming,
            naming_host: self.naming_host.clone(),
            naming_port: self.naming_port,
            rmi_port: self.rmi_port,
            config_directory: self.config_directory.clone(),
            wait_on_start: self.wait_on_start,
            node_id: self.node_id.clone(),
            security_manager: self.security_manager.clone(),
            debug: self.debug,
            properties: self.properties.clone(),
            resource_root: self.config_directory.clone(),
            working_directory,
        }
    }
}

/// Configuration a broker bootstrap receives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BootstrapConfig {
    pub use_naming: bool,
    pub naming_host: String,
    pub naming_port: u16,
    pub rmi_port: u16,
    pub config_directory: Option<PathBuf>,
    pub wait_on_start: bool,
    pub node_id: NodeId,
    pub security_manager: Option<String>,
    pub debug: bool,
    pub properties: Vec<(String, String)>,
    /// Extra location the broker loads configuration resources from
    pub resource_root: Option<PathBuf>,
    pub working_directory: PathBuf,
}

impl BootstrapConfig {
    /// Render as the command-line flags a broker bootstrap executable accepts
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "--use-naming".to_string(),
            self.use_naming.to_string(),
            "--naming-host".to_string(),
            self.naming_host.clone(),
            "--naming-port".to_string(),
            self.naming_port.to_string(),
            "--rmi-port".to_string(),
            self.rmi_port.to_string(),
        ];
        if let Some(dir) = &self.config_directory {
            args.push("--config-dir".to_string());
            args.push(dir.display().to_string());
        }
        args.push("--wait-on-start".to_string());
        args.push(self.wait_on_start.to_string());
        if !self.node_id.is_default() {
            args.push("--node-id".to_string());
            args.push(self.node_id.as_str().to_string());
        }
        if let Some(security_manager) = &self.security_manager {
            args.push("--security-manager".to_string());
            args.push(security_manager.clone());
        }
        if self.debug {
            args.push("--debug".to_string());
        }
        args
    }
}

/// Start (optionally fork) a message broker for a build's verification phase
#[derive(Parser, Debug, Clone)]
#[command(name = "broker-launcher")]
#[command(about = "Starts an external message broker and optionally publishes a test cluster registry")]
pub struct Args {
    /// Register the broker with the naming service
    #[arg(long, env = "BROKER_USE_NAMING", default_value_t = true, action = clap::ArgAction::Set)]
    pub use_naming: bool,

    #[arg(long, env = "BROKER_NAMING_HOST", default_value = "localhost")]
    pub naming_host: String,

    #[arg(long, env = "BROKER_NAMING_PORT", default_value_t = DEFAULT_NAMING_PORT)]
    pub naming_port: u16,

    #[arg(long, env = "BROKER_RMI_PORT", default_value_t = DEFAULT_RMI_PORT)]
    pub rmi_port: u16,

    /// Directory holding the broker configuration
    #[arg(long, env = "BROKER_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    /// Block until the broker exits
    #[arg(long, env = "BROKER_WAIT_ON_START")]
    pub wait_on_start: bool,

    /// Node identifier; omitted means the default node
    #[arg(long, env = "BROKER_NODE_ID")]
    pub node_id: Option<String>,

    #[arg(long, env = "BROKER_SECURITY_MANAGER")]
    pub security_manager: Option<String>,

    /// Run the broker as a separate process
    #[arg(long, env = "BROKER_FORK")]
    pub fork: bool,

    /// Start the forked broker in debug mode
    #[arg(long, env = "BROKER_DEBUG")]
    pub debug: bool,

    /// Property passed to the broker, as KEY=VALUE (repeatable)
    #[arg(long = "property", value_parser = parse_property)]
    pub properties: Vec<(String, String)>,

    /// Output line marking a successful start
    #[arg(long, env = "BROKER_START_STRING", default_value = DEFAULT_START_SENTINEL)]
    pub server_start_string: String,

    /// Output line marking a failed start
    #[arg(long, env = "BROKER_FAILURE_STRING", default_value = DEFAULT_FAILURE_SENTINEL)]
    pub server_failure_string: String,

    /// Publish a test cluster manager tracking launched nodes
    #[arg(long, env = "BROKER_TEST_CLUSTER_MANAGER")]
    pub test_cluster_manager: bool,

    /// Serve the test cluster manager over TCP on this address
    #[arg(long, env = "BROKER_MANAGEMENT_ADDR")]
    pub management_addr: Option<SocketAddr>,

    /// Fail fast when the naming service does not accept connections
    #[arg(long, env = "BROKER_CHECK_NAMING")]
    pub check_naming: bool,

    #[arg(long, env = "BROKER_WORKING_DIR", default_value = ".")]
    pub working_dir: PathBuf,

    /// Seconds to wait for the start marker from a forked broker
    #[arg(long, env = "BROKER_START_TIMEOUT_SECS", default_value_t = 60)]
    pub start_timeout_secs: u64,

    /// Print the nodes registered with the launcher listening here as JSON, then exit
    #[arg(long, env = "BROKER_QUERY")]
    pub query: Option<SocketAddr>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "BROKER_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Broker command and its arguments
    #[arg(last = true)]
    pub broker_command: Vec<String>,
}

impl Args {
    pub fn into_config(self) -> LauncherResult<LaunchConfig> {
        if self.broker_command.is_empty() {
            return Err(LauncherError::config(
                "broker command is required (pass it after `--`)",
            ));
        }
        if self.management_addr.is_some() && !self.test_cluster_manager {
            return Err(LauncherError::config(
                "--management-addr requires --test-cluster-manager",
            ));
        }
        // An empty marker would match the broker's first output line
        if self.server_start_string.is_empty() {
            return Err(LauncherError::config("--server-start-string must not be empty"));
        }
        if self.start_timeout_secs == 0 {
            return Err(LauncherError::config("--start-timeout-secs must be positive"));
        }

        Ok(LaunchConfig {
            use_naming: self.use_naming,
            naming_host: self.naming_host,
            naming_port: self.naming_port,
            rmi_port: self.rmi_port,
            config_directory: self.config_dir,
            wait_on_start: self.wait_on_start,
            node_id: NodeId::from(self.node_id),
            security_manager: self.security_manager,
            fork: self.fork,
            debug: self.debug,
            properties: self.properties,
            server_start_string: self.server_start_string,
            server_failure_string: self.server_failure_string,
            test_cluster_manager: self.test_cluster_manager,
            management_addr: self.management_addr,
            check_naming: self.check_naming,
            working_directory: self.working_dir,
            broker_command: self.broker_command,
            start_timeout: Duration::from_secs(self.start_timeout_secs),
        })
    }
}

/// Parse a `KEY=VALUE` property
pub fn parse_property(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("property '{raw}' must be KEY=VALUE"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("property '{raw}' has an empty key"));
    }
    Ok((key.to_string(), value.to_string()))
}

fn absolute(path: &Path) -> LauncherResult<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir()?;
    // "." should resolve to the directory itself, not "<cwd>/."
    Ok(path
        .components()
        .fold(cwd, |acc, component| match component {
            std::path::Component::CurDir => acc,
            other => acc.join(other),
        }))
}
