//! Configuration Module
//!
//! Handles loading core tuning parameters from environment variables or an
//! optional JSON config file.

use std::env;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Core configuration parameters.
///
/// All values can be configured via environment variables with sensible
/// defaults, or loaded as a whole from a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Capacity of each subscriber's notification queue
    pub dispatch_queue_capacity: usize,
    /// Lock lease duration in seconds (0 = locks never expire)
    pub lock_lease_secs: u64,
    /// Chunk size in bytes for canonical binary objects
    pub chunk_size: usize,
    /// Starting value for the operation-id distinguishing counter
    pub counter_start: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `NUCACHE_DISPATCH_QUEUE` - Per-subscriber queue capacity (default: 1024)
    /// - `NUCACHE_LOCK_LEASE` - Lock lease in seconds (default: 0, no expiry)
    /// - `NUCACHE_CHUNK_SIZE` - Binary-object chunk size in bytes (default: 81920)
    /// - `NUCACHE_COUNTER_START` - Operation-id counter start (default: 1)
    pub fn from_env() -> Self {
        Self {
            dispatch_queue_capacity: env::var("NUCACHE_DISPATCH_QUEUE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1024),
            lock_lease_secs: env::var("NUCACHE_LOCK_LEASE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            chunk_size: env::var("NUCACHE_CHUNK_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_CHUNK_SIZE),
            counter_start: env::var("NUCACHE_COUNTER_START")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1),
        }
    }

    /// Loads a Config from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Loads a Config from the file named by `NUCACHE_CONFIG`, falling back
    /// to environment variables when the variable is unset.
    pub fn load() -> anyhow::Result<Self> {
        match env::var("NUCACHE_CONFIG") {
            Ok(path) => Self::from_file(path),
            Err(_) => Ok(Self::from_env()),
        }
    }

    /// The configured lock lease as a duration, `None` when leases are
    /// disabled (`lock_lease_secs` of 0, locks never expire).
    pub fn lock_lease(&self) -> Option<chrono::Duration> {
        if self.lock_lease_secs == 0 {
            return None;
        }
        i64::try_from(self.lock_lease_secs)
            .ok()
            .map(chrono::Duration::seconds)
    }
}

/// Default chunk size for canonical binary objects (80 KB).
pub const DEFAULT_CHUNK_SIZE: usize = 80 * 1024;

impl Default for Config {
    fn default() -> Self {
        Self {
            dispatch_queue_capacity: 1024,
            lock_lease_secs: 0,
            chunk_size: DEFAULT_CHUNK_SIZE,
            counter_start: 1,
        }
    }
}
