//! Cluster-manager error types

use std::net::SocketAddr;
use thiserror::Error;
use shared::SharedError;

/// Failures while setting up the management namespace or its listener
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("A registry is already bound under {name}")]
    AlreadyBound { name: String },

    #[error("No registry is bound under {name}")]
    NotBound { name: String },

    #[error("Invalid management name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("Failed to bind management listener on {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Naming service at {host}:{port} is unreachable")]
    NamingUnreachable {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum ClusterError {
    #[error("Management setup failed: {0}")]
    Setup(#[from] SetupError),

    #[error("Management protocol error: {message}")]
    Protocol { message: String },

    #[error("Remote registry rejected the request: {message}")]
    Remote { message: String },

    #[error("Shared component error: {0}")]
    Shared(#[from] SharedError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClusterError {
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol { message: message.into() }
    }
}

pub type ClusterResult<T> = Result<T, ClusterError>;
