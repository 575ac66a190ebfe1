//! Prelude for convenient imports.

pub use async_trait::async_trait;

pub use hotplug_core::events::MessageKind;
pub use hotplug_core::{Client, ClientHandle, Message};

pub use crate::bus::{EventHandler, HandlerAction, HandlerResult, Subscription};
pub use crate::contract::{ConstructContext, Plugin, PluginClass, PluginMetadata, PluginType};
pub use crate::discovery::PluginRegistrar;
pub use crate::error::PluginError;

pub use crate::export_plugin;
