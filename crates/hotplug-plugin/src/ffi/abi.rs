//! Symbols a shared-library plugin must export.
//!
//! The interface is a Rust-ABI registration function, not a C ABI: host and
//! plugin must be built with the same compiler and the same
//! `hotplug-plugin` version. [`API_VERSION`] is bumped whenever the plugin
//! contract changes shape; the host refuses units that report another value.
//! Use [`export_plugin!`](crate::export_plugin) rather than writing these by hand.

use crate::discovery::unit::PluginRegistrar;
use crate::error::PluginError;

/// Current plugin ABI version.
pub const API_VERSION: u32 = 1;

/// Name of the exported ABI version function.
pub const API_VERSION_SYMBOL: &[u8] = b"hotplug_plugin_api_version";

/// Name of the exported registration function.
pub const REGISTER_SYMBOL: &[u8] = b"hotplug_plugin_register";

/// Signature of the ABI version function.
pub type ApiVersionFn = extern "C" fn() -> u32;

/// Signature of the registration function.
pub type RegisterFn = fn(&mut PluginRegistrar) -> Result<(), PluginError>;
