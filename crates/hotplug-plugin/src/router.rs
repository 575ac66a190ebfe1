//! Event router: forwards inbound messages to the bus by message kind.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use hotplug_core::{ClientHandle, Message};

use crate::bus::{DispatchResult, EventBus};

/// Routes messages into the bus on behalf of the configured client.
#[derive(Debug)]
pub struct EventRouter {
    /// Bus messages are emitted into.
    bus: Arc<dyn EventBus>,
    /// Process-wide transport handle, set once by the host.
    client: RwLock<Option<ClientHandle>>,
}

impl EventRouter {
    /// Creates a router with no client configured.
    pub fn new(bus: Arc<dyn EventBus>) -> Self {
        Self {
            bus,
            client: RwLock::new(None),
        }
    }

    /// Stores the client handle passed to plugins and routed messages.
    pub async fn set_client(&self, client: ClientHandle) {
        let mut slot = self.client.write().await;
        debug!(client_id = %client.id(), "Client handle configured");
        *slot = Some(client);
    }

    /// The configured client handle.
    pub async fn client(&self) -> Option<ClientHandle> {
        self.client.read().await.clone()
    }

    /// Emits `message` under its kind.
    ///
    /// Returns `None` without touching the bus when no client is configured.
    pub async fn route(&self, message: &Message) -> Option<DispatchResult> {
        let Some(client) = self.client().await else {
            warn!(
                message_id = %message.id,
                kind = %message.kind,
                "No client configured, dropping message"
            );
            return None;
        };

        let result = self.bus.emit(&message.kind, client, message).await;
        debug!(
            kind = %message.kind,
            handled = result.handled(),
            halted = result.halted,
            "Message routed"
        );
        Some(result)
    }
}
