//! Error types for the plugin system.
//!
//! [`PluginError`] is what plugin code returns from its hooks.
//! [`DiscoveryError`] covers scanning and loading code units and is always
//! contained to the directory that produced it. [`LifecycleError`] is the
//! definite failure signal of every public lifecycle operation.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use hotplug_core::error::{AppError, ErrorKind};

use crate::gating::SkipReason;

/// Error raised by plugin code (constructors, hooks, registration routines).
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PluginError {
    /// Human-readable error message.
    pub message: String,
}

impl PluginError {
    /// Creates a new plugin error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for PluginError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for PluginError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<AppError> for PluginError {
    fn from(err: AppError) -> Self {
        Self::new(err.to_string())
    }
}

impl From<std::io::Error> for PluginError {
    fn from(err: std::io::Error) -> Self {
        Self::new(format!("I/O error: {err}"))
    }
}

/// Error while discovering or loading a plugin code unit.
#[derive(Debug, Clone, Error)]
pub enum DiscoveryError {
    /// A plugin root cannot be read.
    #[error("Plugin root '{path}' is unavailable: {message}")]
    RootUnavailable {
        /// Root directory.
        path: PathBuf,
        /// Underlying reason.
        message: String,
    },

    /// The directory has no entry file any loader recognizes.
    #[error("No recognized entry file in '{dir}'")]
    MissingEntry {
        /// Plugin directory.
        dir: PathBuf,
    },

    /// No registration routine is known for the unit.
    #[error("Unit '{unit}' has no registration routine")]
    UnknownUnit {
        /// Unit path.
        unit: String,
    },

    /// The code unit could not be loaded.
    #[error("Failed to load unit '{unit}': {message}")]
    Load {
        /// Unit path.
        unit: String,
        /// Underlying reason.
        message: String,
    },

    /// The unit was built against a different plugin ABI.
    #[error("Unit '{unit}' ABI mismatch: host expects {expected}, unit has {found}")]
    ApiVersionMismatch {
        /// Unit path.
        unit: String,
        /// Host ABI version.
        expected: u32,
        /// Unit ABI version.
        found: u32,
    },

    /// The unit's registration routine failed.
    #[error("Registration in unit '{unit}' failed: {source}")]
    Registration {
        /// Unit path.
        unit: String,
        /// Error returned by the routine.
        #[source]
        source: PluginError,
    },

    /// Filesystem error while scanning.
    #[error("I/O error at '{path}': {message}")]
    Io {
        /// Offending path.
        path: PathBuf,
        /// Underlying reason.
        message: String,
    },
}

impl DiscoveryError {
    /// Wraps an I/O error with the path that produced it.
    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

/// Error returned by the event bus.
#[derive(Debug, Clone, Error)]
pub enum BusError {
    /// The plugin already has live subscriptions.
    #[error("Plugin '{0}' is already bound")]
    AlreadyBound(String),
}

/// Step of the activation sequence that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationStage {
    /// Binding event handlers into the bus.
    Bind,
    /// The `on_enable` hook.
    Enable,
    /// The `async_init` hook.
    AsyncInit,
}

impl fmt::Display for ActivationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bind => write!(f, "bind"),
            Self::Enable => write!(f, "on_enable"),
            Self::AsyncInit => write!(f, "async_init"),
        }
    }
}

/// Failure of a lifecycle operation on a single plugin.
#[derive(Debug, Clone, Error)]
pub enum LifecycleError {
    /// An instance with this identifier is already active.
    #[error("Plugin '{id}' is already active")]
    AlreadyActive {
        /// Plugin identifier.
        id: String,
    },

    /// The plugin is not currently active.
    #[error("Plugin '{id}' is not active")]
    NotActive {
        /// Plugin identifier.
        id: String,
    },

    /// No plugin type with this identifier is known.
    #[error("Plugin '{id}' not found")]
    NotFound {
        /// Plugin identifier.
        id: String,
    },

    /// The always-on plugin cannot be unloaded or reloaded.
    #[error("Plugin '{id}' is protected and cannot be {action}")]
    Protected {
        /// Plugin identifier.
        id: String,
        /// Rejected action.
        action: &'static str,
    },

    /// Activation was skipped by the gating policy.
    #[error("Plugin '{id}' was not loaded: {reason}")]
    Skipped {
        /// Plugin identifier.
        id: String,
        /// Why the gate refused.
        reason: SkipReason,
    },

    /// The owning code unit could not be (re)loaded.
    #[error("Plugin '{id}' could not be discovered: {source}")]
    Discovery {
        /// Plugin identifier.
        id: String,
        /// Underlying discovery error.
        #[source]
        source: DiscoveryError,
    },

    /// The plugin type failed to instantiate.
    #[error("Plugin '{id}' failed to construct: {source}")]
    Construction {
        /// Plugin identifier.
        id: String,
        /// Error returned by the constructor.
        #[source]
        source: PluginError,
    },

    /// A step of the activation sequence failed.
    #[error("Plugin '{id}' failed during {stage}: {message}")]
    Activation {
        /// Plugin identifier.
        id: String,
        /// Failed step.
        stage: ActivationStage,
        /// Underlying reason.
        message: String,
    },

    /// `on_disable` failed; bindings and table entry were still removed.
    #[error("Plugin '{id}' failed to deactivate cleanly: {source}")]
    Deactivation {
        /// Plugin identifier.
        id: String,
        /// Error returned by the hook.
        #[source]
        source: PluginError,
    },

    /// The detached lifecycle task did not finish (the plugin panicked).
    #[error("Lifecycle task for plugin '{id}' aborted: {message}")]
    Aborted {
        /// Plugin identifier.
        id: String,
        /// Join error description.
        message: String,
    },
}

impl LifecycleError {
    /// Identifier of the plugin this error concerns.
    pub fn id(&self) -> &str {
        match self {
            Self::AlreadyActive { id }
            | Self::NotActive { id }
            | Self::NotFound { id }
            | Self::Protected { id, .. }
            | Self::Skipped { id, .. }
            | Self::Discovery { id, .. }
            | Self::Construction { id, .. }
            | Self::Activation { id, .. }
            | Self::Deactivation { id, .. }
            | Self::Aborted { id, .. } => id,
        }
    }

    /// Category this error maps to at the application boundary.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AlreadyActive { .. } => ErrorKind::Conflict,
            Self::NotActive { .. } | Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Protected { .. } | Self::Skipped { .. } => ErrorKind::Forbidden,
            Self::Discovery { .. } => ErrorKind::Storage,
            Self::Construction { .. }
            | Self::Activation { .. }
            | Self::Deactivation { .. } => ErrorKind::Plugin,
            Self::Aborted { .. } => ErrorKind::Internal,
        }
    }
}

impl From<LifecycleError> for AppError {
    fn from(err: LifecycleError) -> Self {
        AppError::new(err.kind(), err.to_string())
    }
}
