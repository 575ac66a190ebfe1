//! Plugin listing command.

use clap::Args;

use hotplug_core::config::AppConfig;
use hotplug_core::error::AppError;

use crate::output::{self, OutputFormat};

/// Arguments for the list command
#[derive(Debug, Args)]
pub struct ListArgs {
    /// Also load plugins named in the exclusion list
    #[arg(long)]
    pub all: bool,
}

/// Discovers every plugin, prints the records, then unloads again.
pub async fn execute(
    args: &ListArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let manager = super::build_manager(config);
    let loaded = manager.load_all(args.all).await;
    tracing::debug!(loaded = loaded.len(), "Plugins discovered");

    output::print_plugins(&manager.all_plugin_info().await, format);

    let outcome = manager.unload_all().await;
    for id in &outcome.failed {
        if id != manager.always_on() {
            tracing::warn!(plugin_id = %id, "Plugin did not unload cleanly");
        }
    }
    Ok(())
}
