//! Dispatcher: delivers one message to every handler bound to its key.
//!
//! - Handlers are called in priority order.
//! - A handler returning `Halt` stops propagation to later handlers.
//! - A handler exceeding the timeout is logged and skipped; dispatch goes on.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use hotplug_core::{ClientHandle, Message};

use super::definitions::{DispatchResult, HandlerAction, HandlerReport};
use super::registry::SubscriptionRegistry;

/// Default per-handler timeout.
pub const DEFAULT_HANDLER_TIMEOUT: Duration = Duration::from_secs(30);

/// Dispatches messages to registered handlers.
#[derive(Debug)]
pub struct Dispatcher {
    /// Subscription registry.
    registry: Arc<SubscriptionRegistry>,
    /// Upper bound on a single handler invocation.
    handler_timeout: Duration,
}

impl Dispatcher {
    /// Creates a new dispatcher.
    pub fn new(registry: Arc<SubscriptionRegistry>, handler_timeout: Duration) -> Self {
        Self {
            registry,
            handler_timeout,
        }
    }

    /// Dispatches a message under `event` to all handlers bound to it.
    pub async fn dispatch(
        &self,
        event: &str,
        client: &ClientHandle,
        message: &Message,
    ) -> DispatchResult {
        let handlers = self.registry.get_handlers(event).await;

        if handlers.is_empty() {
            debug!(event = %event, "No handlers bound for event");
            return DispatchResult::default();
        }

        debug!(
            event = %event,
            handler_count = handlers.len(),
            "Dispatching event"
        );

        let mut outcome = DispatchResult::default();

        for (plugin_id, handler) in &handlers {
            let result =
                match tokio::time::timeout(self.handler_timeout, handler.handle(client, message))
                    .await
                {
                    Ok(r) => r,
                    Err(_) => {
                        warn!(
                            event = %event,
                            plugin_id = %plugin_id,
                            timeout_secs = self.handler_timeout.as_secs(),
                            "Event handler timed out"
                        );
                        outcome.timed_out.push(plugin_id.clone());
                        continue;
                    }
                };

            let halt_reason = match &result.action {
                HandlerAction::Continue => None,
                HandlerAction::Halt { reason } => Some(reason.clone()),
            };

            outcome.results.push(HandlerReport {
                plugin_id: plugin_id.clone(),
                result,
            });

            if let Some(reason) = halt_reason {
                info!(
                    event = %event,
                    plugin_id = %plugin_id,
                    reason = %reason,
                    "Handler halted propagation"
                );
                outcome.halted = true;
                outcome.halt_reason = Some(reason);
                outcome.halted_by = Some(plugin_id.clone());
                break;
            }
        }

        outcome
    }

    /// Returns a reference to the subscription registry.
    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }
}
