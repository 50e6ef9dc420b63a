//! Configuration module for the voice teller.
//!
//! Provides CLI argument parsing and configuration management.

#[allow(clippy::module_inception)]
mod config;
mod voices;

pub use config::{AppConfig, Provider};
pub use voices::Voice;
