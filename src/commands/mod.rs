//! CLI command definitions and dispatch.

pub mod config;
pub mod list;
pub mod serve;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use hotplug_core::config::{AppConfig, DEFAULT_CONFIG_PATH, PluginConfig};
use hotplug_core::error::AppError;
use hotplug_plugin::{PluginManager, StaticLoader, UnitLoader};

use crate::output::OutputFormat;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "HOTPLUG_CONFIG";

/// hotplug: a hot-reloadable plugin host
#[derive(Debug, Parser)]
#[command(name = "hotplug", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (defaults to $HOTPLUG_CONFIG, then config/default.toml)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the host with a console client on stdin
    Serve(serve::ServeArgs),
    /// Discover plugins and print their records
    List(list::ListArgs),
    /// Configuration management
    Config(config::ConfigArgs),
}

impl Cli {
    /// Configuration file path in effect.
    pub fn config_path(&self) -> String {
        self.config
            .clone()
            .or_else(|| std::env::var(CONFIG_ENV).ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
    }

    /// Loads the configuration file plus environment overrides, falling
    /// back to the defaults when the file cannot be used.
    pub fn load_config(&self) -> (AppConfig, Option<AppError>) {
        AppConfig::load_or_default(self.config_path())
    }

    /// Execute the CLI command
    pub async fn execute(&self, config: AppConfig) -> Result<(), AppError> {
        tracing::debug!(config = %self.config_path(), "Configuration loaded");
        match &self.command {
            Commands::Serve(args) => serve::execute(args, &config).await,
            Commands::List(args) => list::execute(args, &config, self.format).await,
            Commands::Config(args) => config::execute(args, &config, &self.config_path(), self.format),
        }
    }
}

/// Unit loaders known to this build.
///
/// Built-in plugins are served from the static catalog; shared-library
/// plugins need the `dynamic` feature.
#[cfg_attr(not(feature = "dynamic"), allow(unused_variables))]
pub fn loaders(config: &PluginConfig) -> Vec<Arc<dyn UnitLoader>> {
    let catalog = StaticLoader::new().with_unit("echo", plugin_echo::register);

    #[allow(unused_mut)]
    let mut loaders: Vec<Arc<dyn UnitLoader>> = vec![Arc::new(catalog)];

    #[cfg(feature = "dynamic")]
    loaders.push(Arc::new(hotplug_plugin::DynamicLoader::new(
        &config.shadow_directory,
    )));

    loaders
}

/// Helper: build a plugin manager from config
pub fn build_manager(config: &AppConfig) -> PluginManager {
    PluginManager::from_config(&config.plugins, loaders(&config.plugins))
}
