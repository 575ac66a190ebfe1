//! Event bus: the publish/subscribe collaborator plugins bind handlers into.
//!
//! The lifecycle manager only ever talks to the bus through [`EventBus`]:
//! `bind` on activation, `unbind` on deactivation, `emit` when routing.
//! The bus holds handler references, never lifecycle ownership.

pub mod definitions;
pub mod dispatcher;
pub mod registry;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use hotplug_core::{ClientHandle, Message};

use crate::contract::Plugin;
use crate::error::BusError;

pub use definitions::{
    DispatchResult, EventHandler, HandlerAction, HandlerReport, HandlerResult, Subscription,
};
pub use dispatcher::{DEFAULT_HANDLER_TIMEOUT, Dispatcher};
pub use registry::SubscriptionRegistry;

/// Bus contract consumed by the lifecycle manager.
#[async_trait]
pub trait EventBus: Send + Sync + std::fmt::Debug {
    /// Binds every subscription of `plugin` under `plugin_id`.
    /// Returns the number of handlers bound.
    async fn bind(&self, plugin_id: &str, plugin: &Arc<dyn Plugin>) -> Result<usize, BusError>;

    /// Removes every handler owned by `plugin_id`.
    /// Returns the number of handlers removed.
    async fn unbind(&self, plugin_id: &str) -> Result<usize, BusError>;

    /// Delivers `message` to the handlers bound under `event`.
    async fn emit(&self, event: &str, client: ClientHandle, message: &Message) -> DispatchResult;
}

/// In-process bus backed by a [`SubscriptionRegistry`] and a [`Dispatcher`].
#[derive(Debug)]
pub struct LocalBus {
    /// Subscription table.
    registry: Arc<SubscriptionRegistry>,
    /// Message dispatcher.
    dispatcher: Dispatcher,
}

impl LocalBus {
    /// Creates a bus with the given per-handler timeout.
    pub fn new(handler_timeout: Duration) -> Self {
        let registry = Arc::new(SubscriptionRegistry::new());
        let dispatcher = Dispatcher::new(registry.clone(), handler_timeout);
        Self {
            registry,
            dispatcher,
        }
    }

    /// Returns the subscription registry.
    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }
}

impl Default for LocalBus {
    fn default() -> Self {
        Self::new(DEFAULT_HANDLER_TIMEOUT)
    }
}

#[async_trait]
impl EventBus for LocalBus {
    async fn bind(&self, plugin_id: &str, plugin: &Arc<dyn Plugin>) -> Result<usize, BusError> {
        let subscriptions = plugin.subscriptions();
        let count = subscriptions.len();

        if !self.registry.register_all(plugin_id, subscriptions).await {
            return Err(BusError::AlreadyBound(plugin_id.to_string()));
        }

        Ok(count)
    }

    async fn unbind(&self, plugin_id: &str) -> Result<usize, BusError> {
        Ok(self.registry.unregister_plugin(plugin_id).await)
    }

    async fn emit(&self, event: &str, client: ClientHandle, message: &Message) -> DispatchResult {
        self.dispatcher.dispatch(event, &client, message).await
    }
}
