//! Core shared types and identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::OnceLock;

/// Global process ID singleton
static PROCESS_ID: OnceLock<ProcessId> = OnceLock::new();

/// Used by library code running before (or without) an `init_*` call, e.g. in tests
static FALLBACK_PROCESS_ID: ProcessId = ProcessId::Harness;

/// Default naming-service port
pub const DEFAULT_NAMING_PORT: u16 = 1099;

/// Default secondary remote-management port
pub const DEFAULT_RMI_PORT: u16 = 1098;

/// Identifier of a broker node
///
/// The empty string is a valid identifier and names the default, unnamed node.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The default unnamed node
    pub fn default_node() -> Self {
        Self(String::new())
    }

    pub fn is_default(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Process label used for a broker running this node, e.g. `BrokerServer_n1`
    pub fn process_label(&self) -> String {
        format!("BrokerServer_{}", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "<default>")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<Option<String>> for NodeId {
    fn from(s: Option<String>) -> Self {
        Self(s.unwrap_or_default())
    }
}

impl std::str::FromStr for NodeId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

/// One registered broker node
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeEntry {
    pub node_id: NodeId,
    pub working_directory: PathBuf,
    pub config_directory: Option<PathBuf>,
    pub naming_port: u16,
    pub rmi_port: u16,
}

impl NodeEntry {
    pub fn new(
        node_id: impl Into<NodeId>,
        working_directory: impl Into<PathBuf>,
        config_directory: Option<PathBuf>,
        naming_port: u16,
        rmi_port: u16,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            working_directory: working_directory.into(),
            config_directory,
            naming_port,
            rmi_port,
        }
    }
}

impl fmt::Display for NodeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} naming={} rmi={} dir={}",
            self.node_id,
            self.naming_port,
            self.rmi_port,
            self.working_directory.display()
        )
    }
}

/// Process identifier for any component in the system
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessId {
    /// The launcher driving a build
    Launcher,
    /// A broker child; tags its forwarded output
    Broker(NodeId),
    /// A test harness querying the registry
    Harness,
}

impl ProcessId {
    /// Initialize the global process ID for the launcher
    pub fn init_launcher() -> &'static ProcessId {
        PROCESS_ID.get_or_init(|| ProcessId::Launcher)
    }

    /// Initialize the global process ID for a test harness
    pub fn init_harness() -> &'static ProcessId {
        PROCESS_ID.get_or_init(|| ProcessId::Harness)
    }

    /// Get the global process ID, falling back to `Harness` when none was initialized
    pub fn current() -> &'static ProcessId {
        PROCESS_ID.get().unwrap_or(&FALLBACK_PROCESS_ID)
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessId::Launcher => write!(f, "launcher"),
            ProcessId::Broker(node_id) => write!(f, "{}", node_id.process_label()),
            ProcessId::Harness => write!(f, "harness"),
        }
    }
}
