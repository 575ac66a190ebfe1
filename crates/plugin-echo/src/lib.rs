//! Echo plugin for hotplug.
//!
//! Replies to every text message with its content, optionally prefixed.
//! Settings (`config.toml` in the plugin directory):
//!
//! ```toml
//! enable = true
//! prefix = "echo: "
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use hotplug_plugin_sdk::prelude::*;

/// Repeats text messages.
#[derive(Debug)]
pub struct Echo {
    /// Settings read at construction.
    settings: PluginSettings,
    /// Messages echoed by this instance.
    echoed: Arc<AtomicU64>,
}

impl Echo {
    /// Messages echoed since construction.
    pub fn echoed(&self) -> u64 {
        self.echoed.load(Ordering::Relaxed)
    }

    fn prefix(&self) -> String {
        self.settings.get_string("prefix").unwrap_or_default()
    }
}

#[async_trait]
impl Plugin for Echo {
    fn enabled(&self) -> bool {
        self.settings.enable()
    }

    fn subscriptions(&self) -> Vec<Subscription> {
        let prefix = self.prefix();
        let echoed = self.echoed.clone();

        vec![on(MessageKind::TEXT, move |_client, message| {
            let prefix = prefix.clone();
            let echoed = echoed.clone();
            async move {
                let Some(content) = message.content() else {
                    return HandlerResult::continue_execution();
                };
                echoed.fetch_add(1, Ordering::Relaxed);
                HandlerResult::continue_with_output(serde_json::json!({
                    "reply": format!("{prefix}{content}"),
                    "to": message.sender.clone(),
                }))
            }
        })]
    }

    async fn on_enable(&self, client: Option<ClientHandle>) -> Result<(), PluginError> {
        tracing::info!(
            client = client.as_ref().map(|c| c.id()).unwrap_or("none"),
            prefix = %self.prefix(),
            "Echo plugin enabled"
        );
        Ok(())
    }

    async fn on_disable(&self) -> Result<(), PluginError> {
        tracing::info!(echoed = self.echoed(), "Echo plugin disabled");
        Ok(())
    }
}

impl PluginClass for Echo {
    const ID: &'static str = "Echo";
    const DESCRIPTION: &'static str = "Repeats text messages back to the sender";
    const AUTHOR: &'static str = "hotplug";
    const VERSION: &'static str = "1.0.0";

    fn construct(ctx: &ConstructContext) -> Result<Self, PluginError> {
        Ok(Self {
            settings: PluginSettings::load(ctx)?,
            echoed: Arc::new(AtomicU64::new(0)),
        })
    }
}

export_plugin!(Echo);
