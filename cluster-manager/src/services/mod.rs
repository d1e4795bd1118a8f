//! Service implementations
//!
//! Network-facing pieces of the cluster manager: the management listener,
//! the client test harnesses use against it, and the naming-service probe.

pub mod management_client;
pub mod management_server;
pub mod naming;
pub mod wire;

#[cfg(test)]
mod tests;

pub use management_client::ManagementClient;
pub use management_server::ManagementServer;
pub use naming::probe_naming_service;
