//! Keeps a shared library loaded while anything built from it is alive.
//!
//! Every type, instance and event handler coming out of a library is
//! wrapped so that it holds an `Arc<Library>`. Field order matters: the wrapped value is
//! declared first and therefore dropped before the library handle.

use std::sync::Arc;

use async_trait::async_trait;
use libloading::Library;

use hotplug_core::{ClientHandle, Message};

use crate::bus::definitions::{EventHandler, HandlerResult, Subscription};
use crate::contract::{ConstructContext, Plugin, PluginMetadata, PluginType};
use crate::error::PluginError;

/// A plugin type declared by a shared library.
pub struct LibraryType {
    inner: Arc<dyn PluginType>,
    library: Arc<Library>,
}

impl LibraryType {
    /// Wraps a type so it pins `library`.
    pub fn wrap(inner: Arc<dyn PluginType>, library: Arc<Library>) -> Arc<dyn PluginType> {
        Arc::new(Self { inner, library })
    }
}

impl std::fmt::Debug for LibraryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibraryType")
            .field("id", &self.inner.id())
            .finish()
    }
}

impl PluginType for LibraryType {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn metadata(&self) -> PluginMetadata {
        self.inner.metadata()
    }

    fn construct(&self, ctx: &ConstructContext) -> Result<Arc<dyn Plugin>, PluginError> {
        let inner = self.inner.construct(ctx)?;
        Ok(Arc::new(LibraryPlugin {
            inner,
            library: self.library.clone(),
        }))
    }
}

/// A plugin instance built from a shared library.
#[derive(Debug)]
struct LibraryPlugin {
    inner: Arc<dyn Plugin>,
    library: Arc<Library>,
}

#[async_trait]
impl Plugin for LibraryPlugin {
    fn enabled(&self) -> bool {
        self.inner.enabled()
    }

    fn subscriptions(&self) -> Vec<Subscription> {
        self.inner
            .subscriptions()
            .into_iter()
            .map(|sub| Subscription {
                handler: Arc::new(LibraryHandler {
                    inner: sub.handler,
                    _library: self.library.clone(),
                }),
                ..sub
            })
            .collect()
    }

    async fn on_enable(&self, client: Option<ClientHandle>) -> Result<(), PluginError> {
        self.inner.on_enable(client).await
    }

    async fn on_disable(&self) -> Result<(), PluginError> {
        self.inner.on_disable().await
    }

    async fn async_init(&self) -> Result<(), PluginError> {
        self.inner.async_init().await
    }
}

/// An event handler built from a shared library.
///
/// Bus entries can outlive the instance that produced them, so each
/// handler pins the library on its own.
#[derive(Debug)]
struct LibraryHandler {
    inner: Arc<dyn EventHandler>,
    _library: Arc<Library>,
}

#[async_trait]
impl EventHandler for LibraryHandler {
    async fn handle(&self, client: &ClientHandle, message: &Message) -> HandlerResult {
        self.inner.handle(client, message).await
    }
}
