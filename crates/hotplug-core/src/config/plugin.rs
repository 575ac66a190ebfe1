//! Plugin system configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Plugin system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Plugin root directories, scanned in order.
    #[serde(default = "default_directories")]
    pub directories: Vec<String>,
    /// Plugin identifiers or directory names disabled by default.
    #[serde(default, alias = "disabled-plugins")]
    pub disabled: Vec<String>,
    /// Identifier of the plugin that can never be unloaded or reloaded.
    #[serde(default = "default_always_on")]
    pub always_on: String,
    /// Whether a missing plugin root is created on startup.
    #[serde(default = "default_true")]
    pub auto_create: bool,
    /// Upper bound on a single event handler invocation, in seconds.
    #[serde(default = "default_handler_timeout")]
    pub handler_timeout_seconds: u64,
    /// Where shared-library plugins are copied before each load.
    #[serde(default = "default_shadow_directory")]
    pub shadow_directory: String,
}

impl PluginConfig {
    /// Plugin roots as paths.
    pub fn roots(&self) -> Vec<PathBuf> {
        self.directories.iter().map(PathBuf::from).collect()
    }

    /// Handler timeout as a [`Duration`].
    pub fn handler_timeout(&self) -> Duration {
        Duration::from_secs(self.handler_timeout_seconds)
    }
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            directories: default_directories(),
            disabled: Vec::new(),
            always_on: default_always_on(),
            auto_create: true,
            handler_timeout_seconds: default_handler_timeout(),
            shadow_directory: default_shadow_directory(),
        }
    }
}

fn default_directories() -> Vec<String> {
    vec!["./plugins".to_string()]
}

fn default_always_on() -> String {
    "ManagePlugin".to_string()
}

fn default_true() -> bool {
    true
}

fn default_handler_timeout() -> u64 {
    30
}

fn default_shadow_directory() -> String {
    "data/plugin-cache".to_string()
}
