use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub crypto: CryptoConfig,
}

/// Control surface configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Must be a loopback address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 11200))
}

/// Keyspace location and shutdown behaviour
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    /// Upper bound on how long shutdown waits for an in-flight queue scan
    #[serde(default = "default_shutdown_wait_ms")]
    pub shutdown_wait_ms: u64,
}

impl StoreConfig {
    pub fn shutdown_wait(&self) -> Duration {
        Duration::from_millis(self.shutdown_wait_ms)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            shutdown_wait_ms: default_shutdown_wait_ms(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("/tmp/localtasks/localtasks.db")
}

fn default_shutdown_wait_ms() -> u64 {
    5_000
}

/// Queue worker configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkerConfig {
    /// Longest idle wait between scans of an empty queue
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl WorkerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    500
}

/// File processing configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CryptoConfig {
    /// Secret key file, created out of band and never written by this process
    #[serde(default = "default_secret_key_path")]
    pub secret_key_path: PathBuf,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            secret_key_path: default_secret_key_path(),
        }
    }
}

fn default_secret_key_path() -> PathBuf {
    PathBuf::from("/tmp/localtasks_sec.key")
}
