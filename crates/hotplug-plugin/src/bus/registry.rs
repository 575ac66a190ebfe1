//! Subscription registry: handlers bound per event key with priority ordering.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use super::definitions::{EventHandler, Subscription};

/// Entry in the subscription registry.
#[derive(Debug)]
struct SubscriptionEntry {
    /// The handler.
    handler: Arc<dyn EventHandler>,
    /// Priority (lower = earlier execution).
    priority: i32,
    /// Plugin that bound this handler.
    plugin_id: String,
}

/// Registry of event handlers organized by event key.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    /// Event key → sorted list of handlers.
    handlers: RwLock<HashMap<String, Vec<SubscriptionEntry>>>,
}

impl SubscriptionRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds all subscriptions of a plugin in one step.
    ///
    /// Returns `false` without touching the table when the plugin already
    /// owns handlers.
    pub async fn register_all(&self, plugin_id: &str, subscriptions: Vec<Subscription>) -> bool {
        let mut handlers = self.handlers.write().await;

        let already_bound = handlers
            .values()
            .any(|entries| entries.iter().any(|e| e.plugin_id == plugin_id));
        if already_bound {
            return false;
        }

        let count = subscriptions.len();
        for sub in subscriptions {
            let entries = handlers.entry(sub.event.clone()).or_default();
            entries.push(SubscriptionEntry {
                handler: sub.handler,
                priority: sub.priority,
                plugin_id: plugin_id.to_string(),
            });

            // Stable sort keeps bind order among equal priorities
            entries.sort_by_key(|e| e.priority);

            debug!(
                event = %sub.event,
                plugin_id = %plugin_id,
                priority = sub.priority,
                "Event handler registered"
            );
        }

        info!(plugin_id = %plugin_id, handlers = count, "Plugin bound to event bus");
        true
    }

    /// Removes all handlers owned by a plugin, returning how many were removed.
    pub async fn unregister_plugin(&self, plugin_id: &str) -> usize {
        let mut handlers = self.handlers.write().await;

        let mut removed = 0;
        for entries in handlers.values_mut() {
            let before = entries.len();
            entries.retain(|e| e.plugin_id != plugin_id);
            removed += before - entries.len();
        }

        handlers.retain(|_, entries| !entries.is_empty());

        info!(plugin_id = %plugin_id, removed, "Plugin unbound from event bus");
        removed
    }

    /// Returns all handlers for an event key with their owners, sorted by priority.
    pub async fn get_handlers(&self, event: &str) -> Vec<(String, Arc<dyn EventHandler>)> {
        let handlers = self.handlers.read().await;
        handlers
            .get(event)
            .map(|entries| {
                entries
                    .iter()
                    .map(|e| (e.plugin_id.clone(), e.handler.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns the number of handlers bound to an event key.
    pub async fn handler_count(&self, event: &str) -> usize {
        let handlers = self.handlers.read().await;
        handlers.get(event).map(|entries| entries.len()).unwrap_or(0)
    }

    /// Returns whether a plugin owns any handler.
    pub async fn is_bound(&self, plugin_id: &str) -> bool {
        let handlers = self.handlers.read().await;
        handlers
            .values()
            .any(|entries| entries.iter().any(|e| e.plugin_id == plugin_id))
    }

    /// Returns all event keys with at least one handler.
    pub async fn events(&self) -> Vec<String> {
        let handlers = self.handlers.read().await;
        let mut keys: Vec<String> = handlers.keys().cloned().collect();
        keys.sort();
        keys
    }
}
