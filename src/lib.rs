//! Coursegate command-line harness
//!
//! Exposes the CLI modules for integration testing

pub mod cli;
pub mod config;
pub mod fixtures;

pub use config::Config;
pub use fixtures::{FixtureDirectory, FixtureError};
