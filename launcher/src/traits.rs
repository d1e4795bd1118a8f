//! Trait definitions with mockall annotations for testing

use crate::config::BootstrapConfig;
use crate::error::BoxError;

/// Starts a broker inside the launcher's own process
///
/// Implementations return once the broker is up (or, with `wait_on_start`,
/// once it has finished). Any error aborts the launch and is reported with
/// its cause intact.
#[mockall::automock]
#[async_trait::async_trait]
pub trait BrokerBootstrap: Send + Sync {
    async fn execute(&self, config: &BootstrapConfig) -> Result<(), BoxError>;
}
