//! Launcher-specific error types

use std::time::Duration;
use thiserror::Error;

use cluster_manager::ClusterError;
use shared::NodeId;

/// Boxed cause reported by a broker bootstrap
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failures starting a forked broker process
#[derive(Error, Debug)]
pub enum SpawnError {
    #[error("No broker command configured")]
    EmptyCommand,

    #[error("Failed to spawn broker process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Broker reported a startup failure: {line}")]
    FailedToStart { line: String },

    #[error("Broker exited before reporting startup (exit code {code:?})")]
    ExitedEarly { code: Option<i32> },

    #[error("Broker did not report startup within {timeout:?}")]
    StartTimeout { timeout: Duration },
}

#[derive(Error, Debug)]
pub enum LauncherError {
    #[error("Node {node_id}: {step}: {source}")]
    Setup {
        node_id: NodeId,
        step: &'static str,
        #[source]
        source: ClusterError,
    },

    #[error("Node {node_id}: broker startup failed: {source}")]
    Startup {
        node_id: NodeId,
        #[source]
        source: BoxError,
    },

    #[error("Node {node_id}: spawn failed: {source}")]
    Spawn {
        node_id: NodeId,
        #[source]
        source: SpawnError,
    },

    #[error("Management request failed: {0}")]
    Management(#[from] ClusterError),

    #[error("Configuration error: {field}")]
    Config { field: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LauncherError {
    pub fn config(field: impl Into<String>) -> Self {
        Self::Config { field: field.into() }
    }

    pub fn setup(node_id: &NodeId, step: &'static str, source: impl Into<ClusterError>) -> Self {
        Self::Setup {
            node_id: node_id.clone(),
            step,
            source: source.into(),
        }
    }

    pub fn startup(node_id: &NodeId, source: impl Into<BoxError>) -> Self {
        Self::Startup {
            node_id: node_id.clone(),
            source: source.into(),
        }
    }

    /// The node the failed attempt was for, when there is one
    pub fn node_id(&self) -> Option<&NodeId> {
        match self {
            Self::Setup { node_id, .. } | Self::Startup { node_id, .. } | Self::Spawn { node_id, .. } => Some(node_id),
            Self::Management(_) | Self::Config { .. } | Self::Io(_) => None,
        }
    }
}

pub type LauncherResult<T> = Result<T, LauncherError>;
