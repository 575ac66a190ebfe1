//! Configuration management CLI commands.

use clap::{Args, Subcommand};

use hotplug_core::config::AppConfig;
use hotplug_core::error::AppError;

use crate::output::{self, OutputFormat};

/// Arguments for config commands
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration (file plus environment)
    Show,
    /// Summarize the plugin settings in effect
    Check,
}

/// Execute config commands
pub fn execute(
    args: &ConfigArgs,
    config: &AppConfig,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        ConfigCommand::Show => output::print_item(config, format),
        ConfigCommand::Check => {
            if !std::path::Path::new(config_path).exists() {
                output::print_warning(&format!(
                    "Configuration '{}' not found, running on defaults",
                    config_path
                ));
            } else if let Err(e) = AppConfig::load(config_path) {
                output::print_error(&format!(
                    "Configuration '{}' is invalid, running on defaults: {}",
                    config_path, e
                ));
            } else {
                output::print_success(&format!("Configuration '{}' is valid", config_path));
            }

            let plugins = &config.plugins;
            output::print_kv("Roots", &plugins.directories.join(", "));
            output::print_kv("Disabled", &plugins.disabled.join(", "));
            output::print_kv("Always on", &plugins.always_on);
            output::print_kv("Auto create", &plugins.auto_create.to_string());
            output::print_kv(
                "Handler timeout",
                &format!("{}s", plugins.handler_timeout_seconds),
            );
            output::print_kv("Log level", &config.logging.level);
        }
    }

    Ok(())
}
