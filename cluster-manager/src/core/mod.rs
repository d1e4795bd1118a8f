//! Core registry components
//!
//! The node directory itself and the namespace it is published in.

pub mod namespace;
pub mod object_name;
pub mod registry;

pub use namespace::ManagementNamespace;
pub use object_name::{ObjectName, TEST_CLUSTER_MANAGER_NAME};
pub use registry::TestClusterManager;
