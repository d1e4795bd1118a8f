//! Broker launcher
//!
//! Starts an external message broker for a build's integration-test phase,
//! either attached to the launcher or as a supervised child process, and
//! records each launched node in an optional test cluster manager.

pub mod config;
pub mod error;
pub mod launcher;
pub mod services;
pub mod traits;

pub use config::{Args, BootstrapConfig, LaunchConfig};
pub use error::{BoxError, LauncherError, LauncherResult, SpawnError};
pub use launcher::{LaunchOutcome, Launcher};
pub use services::{BrokerProcess, BrokerSupervisor, CommandBootstrap, ForkedLauncher, ShutdownHook};
pub use traits::{BrokerBootstrap, MockBrokerBootstrap};
