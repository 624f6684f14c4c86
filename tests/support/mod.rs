//! Shared helpers for the integration tests

pub mod harness;

pub use harness::TestProject;
