//! Service tests for the cluster manager

pub mod namespace;
