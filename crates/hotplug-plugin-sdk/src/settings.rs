//! Per-plugin settings read from `<plugin dir>/config.toml`.
//!
//! The `enable` key feeds the plugin's self-reported enable flag and
//! defaults to `true`. Every other key is free-form and read on demand.

use std::path::Path;

use config::{Config, File, FileFormat};
use serde::de::DeserializeOwned;
use tracing::debug;

use hotplug_plugin::contract::ConstructContext;
use hotplug_plugin::error::PluginError;

/// File name of the per-plugin settings.
pub const SETTINGS_FILE: &str = "config.toml";

/// Settings of one plugin.
#[derive(Debug, Clone)]
pub struct PluginSettings {
    /// Whether the plugin wants to be active.
    enable: bool,
    /// All settings.
    values: Config,
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            enable: true,
            values: Config::default(),
        }
    }
}

impl PluginSettings {
    /// Reads the settings of the unit the plugin is constructed from.
    ///
    /// Types constructed outside a plugin directory get the defaults.
    pub fn load(ctx: &ConstructContext) -> Result<Self, PluginError> {
        match &ctx.directory {
            Some(dir) => Self::from_dir(dir),
            None => Ok(Self::default()),
        }
    }

    /// Reads `config.toml` from `dir`. A missing file yields the defaults.
    pub fn from_dir(dir: &Path) -> Result<Self, PluginError> {
        let path = dir.join(SETTINGS_FILE);
        let values = Config::builder()
            .add_source(File::from(path.as_path()).format(FileFormat::Toml).required(false))
            .build()
            .map_err(|e| PluginError::new(format!("Invalid {}: {e}", path.display())))?;

        let enable = match values.get_bool("enable") {
            Ok(enable) => enable,
            Err(config::ConfigError::NotFound(_)) => true,
            Err(e) => {
                return Err(PluginError::new(format!(
                    "Invalid 'enable' in {}: {e}",
                    path.display()
                )));
            }
        };

        debug!(path = %path.display(), enable, "Plugin settings loaded");
        Ok(Self { enable, values })
    }

    /// The self-reported enable flag.
    pub fn enable(&self) -> bool {
        self.enable
    }

    /// Reads one value. `None` when absent or of the wrong shape.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.values.get(key).ok()
    }

    /// Reads one string value.
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.values.get_string(key).ok()
    }

    /// Deserializes all settings into `T`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, PluginError> {
        self.values
            .clone()
            .try_deserialize()
            .map_err(|e| PluginError::new(format!("Invalid plugin settings: {e}")))
    }
}
