//! Taskboard configuration management using Figment
//!
//! Settings are merged from defaults, configuration files and environment
//! variables, lowest precedence first:
//!
//! - Defaults compiled into [`TaskboardConfig`]
//! - Global: `~/.taskboard/taskboard.{toml,yaml,yml,json}`
//! - Project: `./.taskboard/taskboard.{toml,yaml,yml,json}`
//! - Environment: `TASKBOARD_SYNC__WRITE_TIMEOUT_MS=2000` → `sync.write_timeout_ms`
//!
//! ## Example TOML Configuration
//!
//! ```toml
//! [store]
//! backend = "file"
//! root = ".taskboard/data"
//!
//! [sync]
//! write_timeout_ms = 5000
//! read_timeout_ms = 10000
//! max_concurrent_writes = 1
//! heal_dirty_containers = true
//!
//! [logging]
//! level = "info"
//! ```
//!
//! ```no_run
//! use taskboard_config::load_configuration;
//!
//! let config = load_configuration()?;
//! println!("writes time out after {:?}", config.sync.write_timeout());
//! # Ok::<(), taskboard_config::ConfigError>(())
//! ```

/// File discovery logic for configuration files
pub mod discovery;
/// Error types and handling
pub mod error;
/// Figment-backed provider
pub mod provider;
/// Typed configuration sections
pub mod settings;

#[cfg(test)]
mod tests;

pub use discovery::{ConfigFile, ConfigFormat, ConfigScope, FileDiscovery};
pub use error::ConfigError;
pub use provider::{ConfigProvider, ENV_PREFIX};
pub use settings::{
    LoggingSettings, StoreBackend, StoreSettings, SyncSettings, TaskboardConfig, CONFIG_DIR_NAME,
};

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Load configuration from all standard sources
pub fn load_configuration() -> ConfigResult<TaskboardConfig> {
    ConfigProvider::new().load()
}
