//! Configuration management for localtasks
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `LOCALTASKS__<section>__<key>`
//!
//! Examples:
//! - `LOCALTASKS__SERVER__BIND_ADDR=127.0.0.1:9000`
//! - `LOCALTASKS__STORE__PATH=/var/lib/localtasks/db`
//! - `LOCALTASKS__WORKER__POLL_INTERVAL_MS=250`
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/localtasks.toml`.
//! This can be overridden using the `LOCALTASKS_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use models::{Config, CryptoConfig, ServerConfig, StoreConfig, WorkerConfig};
pub use validation::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file is malformed or validation
    /// fails (non-loopback bind address, zero intervals, empty paths).
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Re-run validation, e.g. after applying command-line overrides
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::validate(self)
    }
}
