//! Typed configuration sections

use crate::error::ConfigError;
use crate::ConfigResult;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Name of the per-project and per-user configuration directory
pub const CONFIG_DIR_NAME: &str = ".taskboard";

/// Complete Taskboard configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskboardConfig {
    pub store: StoreSettings,
    pub sync: SyncSettings,
    pub logging: LoggingSettings,
}

impl TaskboardConfig {
    /// Check cross-field constraints that serde cannot express
    pub fn validate(&self) -> ConfigResult<()> {
        self.sync.validate()?;
        if self.store.backend == StoreBackend::File && self.store.root.as_os_str().is_empty() {
            return Err(ConfigError::validation(
                "store.root must be set for the file backend",
            ));
        }
        Ok(())
    }
}

/// Which record store backend holds the board
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// One JSON file per record under `store.root`
    #[default]
    File,
    /// Process-local tables, lost on exit
    Memory,
}

/// Record store settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    /// Root directory of the file backend
    pub root: PathBuf,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::File,
            root: PathBuf::from(CONFIG_DIR_NAME).join("data"),
        }
    }
}

/// Remote synchronization settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Upper bound on a single remote write (insert, update, delete)
    pub write_timeout_ms: u64,
    /// Upper bound on a single remote fetch while loading a board
    pub read_timeout_ms: u64,
    /// How many remote calls of one operation may be in flight at once.
    /// 1 issues them strictly in plan order.
    pub max_concurrent_writes: usize,
    /// Rewrite every member of a container whose last write failed
    pub heal_dirty_containers: bool,
    /// Buffered failure notices per subscriber
    pub notice_capacity: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            write_timeout_ms: 5_000,
            read_timeout_ms: 10_000,
            max_concurrent_writes: 1,
            heal_dirty_containers: true,
            notice_capacity: 64,
        }
    }
}

impl SyncSettings {
    /// Per-write timeout as a `Duration`
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    /// Per-fetch timeout as a `Duration`
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.write_timeout_ms == 0 {
            return Err(ConfigError::validation(
                "sync.write_timeout_ms must be greater than 0",
            ));
        }
        if self.read_timeout_ms == 0 {
            return Err(ConfigError::validation(
                "sync.read_timeout_ms must be greater than 0",
            ));
        }
        if self.max_concurrent_writes == 0 {
            return Err(ConfigError::validation(
                "sync.max_concurrent_writes must be at least 1",
            ));
        }
        if self.notice_capacity == 0 {
            return Err(ConfigError::validation(
                "sync.notice_capacity must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Logging settings consumed by binaries when they install a subscriber
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `EnvFilter` directive, e.g. `info` or `taskboard=debug,warn`
    pub level: String,
    /// Emit ANSI colour codes
    pub ansi: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            ansi: true,
        }
    }
}
