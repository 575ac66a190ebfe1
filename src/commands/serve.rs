//! Serve command: runs the host with a console client on stdin.

use std::sync::Arc;

use clap::Args;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use hotplug_core::Message;
use hotplug_core::config::AppConfig;
use hotplug_core::error::AppError;
use hotplug_plugin::{BulkOutcome, PluginManager};

use crate::console::{ConsoleClient, ConsoleCommand, HELP};
use crate::output::{self, OutputFormat};

/// Arguments for the serve command
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Name console messages are sent as
    #[arg(long, default_value = "console")]
    pub user: String,

    /// Also load plugins named in the exclusion list at startup
    #[arg(long)]
    pub load_disabled: bool,
}

/// Execute the serve command
pub async fn execute(args: &ServeArgs, config: &AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting hotplug v{}", env!("CARGO_PKG_VERSION"));

    let manager = super::build_manager(config);
    manager
        .set_client(Arc::new(ConsoleClient::new(&args.user)))
        .await;

    let loaded = manager.load_all(args.load_disabled).await;
    info!(count = loaded.len(), plugins = ?loaded, "Plugins loaded");
    println!("hotplug ready, {} plugin(s) active. Type /help for commands.", loaded.len());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    info!("Console closed");
                    break;
                };
                match ConsoleCommand::parse(&line) {
                    Ok(Some(ConsoleCommand::Quit)) => break,
                    Ok(Some(command)) => run_command(&manager, &args.user, command).await,
                    Ok(None) => {}
                    Err(e) => output::print_error(&e),
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    let outcome = manager.unload_all().await;
    info!(
        unloaded = outcome.succeeded.len(),
        "hotplug shut down"
    );
    Ok(())
}

async fn run_command(manager: &PluginManager, user: &str, command: ConsoleCommand) {
    match command {
        ConsoleCommand::List => {
            output::print_plugins(&manager.all_plugin_info().await, OutputFormat::Table);
        }
        ConsoleCommand::Info(id) => match manager.plugin_info(&id).await {
            Some(info) => output::print_item(&info, OutputFormat::Json),
            None => output::print_error(&format!("Plugin '{}' not found", id)),
        },
        ConsoleCommand::Load(id) => report(manager.load(id.as_str()).await, &id, "loaded"),
        ConsoleCommand::Unload(id) => report(manager.unload(&id).await, &id, "unloaded"),
        ConsoleCommand::Reload(id) => report(manager.reload(&id).await, &id, "reloaded"),
        ConsoleCommand::ReloadAll => print_outcome(&manager.reload_all().await, "Reloaded"),
        ConsoleCommand::Refresh => {
            let outcome = manager.refresh_all().await;
            output::print_success(&format!("Active: {}", outcome.loaded.join(", ")));
            if !outcome.not_reloaded.is_empty() {
                output::print_warning(&format!(
                    "Not reloaded: {}",
                    outcome.not_reloaded.join(", ")
                ));
            }
        }
        ConsoleCommand::Help => println!("{}", HELP),
        ConsoleCommand::Say(text) => say(manager, user, &text).await,
        ConsoleCommand::Quit => {}
    }
}

async fn say(manager: &PluginManager, user: &str, text: &str) {
    let message = Message::text(text).with_sender(user);
    let Some(result) = manager.route(&message).await else {
        return;
    };

    for report in &result.results {
        if let Some(out) = &report.result.output {
            println!("[{}] {}", report.plugin_id, out);
        }
    }
    for id in &result.timed_out {
        output::print_warning(&format!("Plugin '{}' timed out", id));
    }
    if let Some(by) = &result.halted_by {
        tracing::debug!(plugin_id = %by, "Propagation halted");
    }
}

fn report<E: std::fmt::Display>(result: Result<(), E>, id: &str, action: &str) {
    match result {
        Ok(()) => output::print_success(&format!("Plugin '{}' {}", id, action)),
        Err(e) => output::print_error(&e.to_string()),
    }
}

fn print_outcome(outcome: &BulkOutcome, action: &str) {
    output::print_success(&format!("{}: {}", action, outcome.succeeded.join(", ")));
    if !outcome.failed.is_empty() {
        output::print_warning(&format!("Failed: {}", outcome.failed.join(", ")));
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
