//! # hotplug-plugin
//!
//! Plugin framework for hotplug. Provides:
//!
//! - The plugin contract (instance hooks + class metadata)
//! - Discovery of plugin units under one or more roots, with per-unit
//!   generations for hot reload
//! - Lifecycle management (load, unload, reload, bulk refresh)
//! - Gating by configured exclusions and each plugin's own enable flag
//! - An in-process event bus with priority ordering and Continue/Halt
//! - Optional shared-library plugins via `libloading` (feature `dynamic`)

pub mod bus;
pub mod contract;
pub mod discovery;
pub mod error;
pub mod ffi;
pub mod gating;
mod lifecycle;
pub mod macros;
pub mod manager;
pub mod prelude;
pub mod registry;
pub mod router;

pub use bus::{EventBus, LocalBus};
pub use contract::{ConstructContext, Plugin, PluginClass, PluginMetadata, PluginType, type_of};
pub use discovery::{Discovery, PluginRegistrar, StaticLoader, UnitLoader};
pub use error::{LifecycleError, PluginError};
pub use gating::{ExclusionSet, GatingPolicy, SkipReason};
pub use manager::{BulkOutcome, LoadTarget, ManagerOptions, PluginManager, RefreshOutcome};
pub use registry::{PluginInfo, PluginRegistry};
pub use router::EventRouter;

#[cfg(feature = "dynamic")]
pub use discovery::DynamicLoader;
