//! Shared types for the broker launcher workspace
//!
//! Contains only types that cross crate or process boundaries: node
//! identifiers and entries, the management wire messages, shared errors,
//! and the logging setup every binary uses.

pub mod types;
pub mod errors;
pub mod messages;
pub mod logging;

pub use types::*;
pub use errors::*;

pub use messages::{ManagementRequest, ManagementResponse, MAX_FRAME_LEN};
