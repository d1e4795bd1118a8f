//! Common test utilities for the launcher integration tests

pub mod fixtures;

pub use fixtures::TestFixtures;
