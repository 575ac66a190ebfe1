//! # hotplug-plugin-sdk
//!
//! SDK for developing hotplug plugins.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use hotplug_plugin_sdk::prelude::*;
//!
//! #[derive(Debug)]
//! struct Greeter {
//!     settings: PluginSettings,
//! }
//!
//! #[async_trait]
//! impl Plugin for Greeter {
//!     fn enabled(&self) -> bool {
//!         self.settings.enable()
//!     }
//!
//!     fn subscriptions(&self) -> Vec<Subscription> {
//!         vec![on(MessageKind::TEXT, |_client, message| async move {
//!             HandlerResult::continue_with_output(serde_json::json!({
//!                 "reply": format!("hello, {}", message.sender.unwrap_or_default()),
//!             }))
//!         })]
//!     }
//!
//!     async fn on_enable(&self, _client: Option<ClientHandle>) -> Result<(), PluginError> { Ok(()) }
//!     async fn on_disable(&self) -> Result<(), PluginError> { Ok(()) }
//! }
//!
//! impl PluginClass for Greeter {
//!     const ID: &'static str = "Greeter";
//!
//!     fn construct(ctx: &ConstructContext) -> Result<Self, PluginError> {
//!         Ok(Self { settings: PluginSettings::load(ctx)? })
//!     }
//! }
//!
//! export_plugin!(Greeter);
//! ```

pub mod handlers;
pub mod settings;

/// Prelude for convenient imports.
pub mod prelude {
    pub use hotplug_plugin::prelude::*;

    pub use crate::handlers::{ClosureHandler, on};
    pub use crate::settings::PluginSettings;
}
