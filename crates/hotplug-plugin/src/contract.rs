//! The plugin contract.
//!
//! A plugin has two sides:
//!
//! - the **class** side ([`PluginClass`]): static metadata plus a pure
//!   constructor, erased into an object-safe [`PluginType`] so discovery can
//!   hand out `Arc<dyn PluginType>` values;
//! - the **instance** side ([`Plugin`]): activation hooks, the self-reported
//!   enable flag, and the event subscriptions bound into the bus.
//!
//! Constructing an instance never registers or binds it. Only the
//! lifecycle manager performs those side effects.

use std::marker::PhantomData;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use hotplug_core::ClientHandle;

use crate::bus::definitions::Subscription;
use crate::error::PluginError;

/// Class-level metadata of a plugin type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginMetadata {
    /// Unique identifier (the plugin's type name).
    pub id: String,
    /// Human-readable description.
    pub description: String,
    /// Author or maintainer.
    pub author: String,
    /// Semantic version string.
    pub version: String,
}

/// Information handed to a plugin constructor.
#[derive(Debug, Clone, Default)]
pub struct ConstructContext {
    /// Directory of the code unit the type was loaded from, if any.
    pub directory: Option<PathBuf>,
}

impl ConstructContext {
    /// Context for a type that lives in a plugin directory.
    pub fn in_directory(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: Some(directory.into()),
        }
    }
}

/// Instance side of a plugin.
///
/// All hooks take `&self`; plugins keep mutable state behind interior
/// mutability since the instance is shared with the event bus.
#[async_trait]
pub trait Plugin: Send + Sync + std::fmt::Debug {
    /// The plugin's own enablement preference, read right after construction.
    fn enabled(&self) -> bool;

    /// Event handlers to bind into the bus on activation.
    fn subscriptions(&self) -> Vec<Subscription> {
        Vec::new()
    }

    /// Called exactly once per activation.
    ///
    /// `client` is `None` when no transport client has been configured yet.
    async fn on_enable(&self, client: Option<ClientHandle>) -> Result<(), PluginError>;

    /// Called exactly once per deactivation. Must release whatever
    /// `on_enable` acquired.
    async fn on_disable(&self) -> Result<(), PluginError>;

    /// Called once, right after `on_enable` has completed.
    async fn async_init(&self) -> Result<(), PluginError> {
        Ok(())
    }
}

/// Static side of a plugin, implemented by the plugin struct itself.
pub trait PluginClass: Plugin + Sized + 'static {
    /// Unique identifier; by convention the type name.
    const ID: &'static str;
    /// Human-readable description.
    const DESCRIPTION: &'static str = "";
    /// Author or maintainer.
    const AUTHOR: &'static str = "";
    /// Semantic version.
    const VERSION: &'static str = "0.1.0";

    /// Creates a fresh instance. Must not have side effects beyond
    /// building the object (reading the plugin's own settings is fine).
    fn construct(ctx: &ConstructContext) -> Result<Self, PluginError>;
}

/// Object-safe handle to a plugin type.
pub trait PluginType: Send + Sync + std::fmt::Debug {
    /// Identifier of the type.
    fn id(&self) -> &str;

    /// Class-level metadata.
    fn metadata(&self) -> PluginMetadata;

    /// Creates a fresh, unbound instance.
    fn construct(&self, ctx: &ConstructContext) -> Result<Arc<dyn Plugin>, PluginError>;
}

/// [`PluginType`] implementation for any [`PluginClass`].
pub struct ClassType<P> {
    _marker: PhantomData<fn() -> P>,
}

impl<P> std::fmt::Debug for ClassType<P>
where
    P: PluginClass,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassType").field("id", &P::ID).finish()
    }
}

impl<P: PluginClass> PluginType for ClassType<P> {
    fn id(&self) -> &str {
        P::ID
    }

    fn metadata(&self) -> PluginMetadata {
        PluginMetadata {
            id: P::ID.to_string(),
            description: P::DESCRIPTION.to_string(),
            author: P::AUTHOR.to_string(),
            version: P::VERSION.to_string(),
        }
    }

    fn construct(&self, ctx: &ConstructContext) -> Result<Arc<dyn Plugin>, PluginError> {
        let instance = P::construct(ctx)?;
        Ok(Arc::new(instance))
    }
}

/// Returns the type handle for a plugin class.
pub fn type_of<P: PluginClass>() -> Arc<dyn PluginType> {
    Arc::new(ClassType::<P> {
        _marker: PhantomData,
    })
}
