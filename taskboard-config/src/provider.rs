//! Configuration provider using Figment

use crate::discovery::{ConfigFile, ConfigFormat, FileDiscovery};
use crate::settings::TaskboardConfig;
use crate::ConfigResult;
use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use tracing::{debug, info, trace};

/// Prefix for environment overrides, e.g. `TASKBOARD_SYNC__WRITE_TIMEOUT_MS`
pub const ENV_PREFIX: &str = "TASKBOARD_";

/// Loads `TaskboardConfig` from every source in precedence order.
///
/// 1. Built-in defaults
/// 2. Global then project configuration files
/// 3. `TASKBOARD_` environment variables (`__` separates nested keys)
///
/// Nothing is cached; each call reads the sources again.
#[derive(Debug, Clone, Default)]
pub struct ConfigProvider {
    discovery: FileDiscovery,
}

impl ConfigProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider that searches the given directories instead of `~` and `.`
    pub fn with_discovery(discovery: FileDiscovery) -> Self {
        Self { discovery }
    }

    /// Load and validate the configuration
    pub fn load(&self) -> ConfigResult<TaskboardConfig> {
        let config: TaskboardConfig = self.build_figment().extract()?;
        config.validate()?;
        info!(
            backend = ?config.store.backend,
            max_concurrent_writes = config.sync.max_concurrent_writes,
            "Loaded taskboard configuration"
        );
        Ok(config)
    }

    fn build_figment(&self) -> Figment {
        debug!("Building figment configuration with precedence order");

        let mut figment = Figment::from(Serialized::defaults(TaskboardConfig::default()));
        for file in self.discovery.discover_all() {
            figment = figment.merge(Self::file_provider(&file));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    fn file_provider(file: &ConfigFile) -> Figment {
        trace!("Loading config file: {}", file.path.display());
        match file.format {
            ConfigFormat::Toml => Figment::from(Toml::file(&file.path)),
            ConfigFormat::Yaml => Figment::from(Yaml::file(&file.path)),
            ConfigFormat::Json => Figment::from(Json::file(&file.path)),
        }
    }
}
