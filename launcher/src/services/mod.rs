pub mod bootstrap;
pub mod forked;
pub mod process;
pub mod shutdown;
pub mod supervisor;

pub use bootstrap::CommandBootstrap;
pub use forked::ForkedLauncher;
pub use process::{bind_to_parent, BrokerProcess, ExitReport};
pub use shutdown::ShutdownHook;
pub use supervisor::{BrokerSupervisor, DEFAULT_STOP_GRACE};
