//! # hotplug-core
//!
//! Core crate for hotplug. Contains the configuration schema and loader,
//! the transport client contract handed to plugins, the message payload
//! routed through the event bus, and the unified error system.
//!
//! This crate has **no** internal dependencies on other hotplug crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod traits;

pub use error::AppError;
pub use events::Message;
pub use result::AppResult;
pub use traits::client::{Client, ClientHandle};
