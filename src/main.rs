//! hotplug: a hot-reloadable plugin host.
//!
//! Main entry point that loads configuration, installs logging and wires
//! the plugin manager to a console client.

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use hotplug_core::config::AppConfig;

mod commands;
mod console;
mod output;

use commands::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let (config, config_error) = cli.load_config();

    init_logging(&config);

    if let Some(e) = config_error {
        tracing::error!(
            config = %cli.config_path(),
            error = %e,
            "Configuration unusable, continuing with defaults"
        );
    }

    if let Err(e) = cli.execute(config).await {
        tracing::error!(error = %e, "Command failed");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging.
///
/// Logs go to stderr so the console and `list --format json` output stay
/// clean on stdout.
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .with_writer(std::io::stderr)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}
