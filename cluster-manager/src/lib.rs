//! Test cluster manager
//!
//! A directory of the broker nodes a launcher has started, published under a
//! well-known name so integration tests can discover which nodes are running
//! and on which ports. Tests in the same process call the registry directly;
//! tests in other processes use the TCP management listener.

pub mod core;
pub mod error;
pub mod services;
pub mod traits;

// Re-export commonly used types
pub use core::{ManagementNamespace, ObjectName, TestClusterManager, TEST_CLUSTER_MANAGER_NAME};
pub use error::{ClusterError, ClusterResult, SetupError};
pub use services::{probe_naming_service, ManagementClient, ManagementServer};
pub use traits::{MockNodeRegistry, MockNodeTerminator, NodeRegistry, NodeTerminator};
