//! Event handler contract and dispatch results.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use hotplug_core::{ClientHandle, Message};

/// Default handler priority.
pub const DEFAULT_PRIORITY: i32 = 100;

/// Trait for event handler implementations.
#[async_trait]
pub trait EventHandler: Send + Sync + std::fmt::Debug {
    /// Handles one routed message.
    async fn handle(&self, client: &ClientHandle, message: &Message) -> HandlerResult;
}

/// A handler a plugin wants bound to one event key.
#[derive(Debug, Clone)]
pub struct Subscription {
    /// Event key (a message kind).
    pub event: String,
    /// Priority (lower = runs first).
    pub priority: i32,
    /// The handler.
    pub handler: Arc<dyn EventHandler>,
}

impl Subscription {
    /// Creates a subscription with the default priority.
    pub fn new(event: impl Into<String>, handler: Arc<dyn EventHandler>) -> Self {
        Self {
            event: event.into(),
            priority: DEFAULT_PRIORITY,
            handler,
        }
    }

    /// Overrides the priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

/// Action returned by a handler telling the dispatcher what to do next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HandlerAction {
    /// Continue to the next handler.
    Continue,
    /// Stop propagation; no further handlers see the message.
    Halt {
        /// Reason for halting.
        reason: String,
    },
}

/// Result returned from a handler invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerResult {
    /// The action the handler wants the dispatcher to take.
    pub action: HandlerAction,
    /// Optional output data from the handler.
    pub output: Option<serde_json::Value>,
}

impl HandlerResult {
    /// Creates a continue result.
    pub fn continue_execution() -> Self {
        Self {
            action: HandlerAction::Continue,
            output: None,
        }
    }

    /// Creates a halt result.
    pub fn halt(reason: &str) -> Self {
        Self {
            action: HandlerAction::Halt {
                reason: reason.to_string(),
            },
            output: None,
        }
    }

    /// Creates a continue result with output data.
    pub fn continue_with_output(output: serde_json::Value) -> Self {
        Self {
            action: HandlerAction::Continue,
            output: Some(output),
        }
    }
}

/// Result of one handler, stamped with its owning plugin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerReport {
    /// Plugin that owns the handler.
    pub plugin_id: String,
    /// What the handler returned.
    pub result: HandlerResult,
}

/// Aggregated result of emitting one message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatchResult {
    /// Whether propagation was halted.
    pub halted: bool,
    /// Halt reason (if halted).
    pub halt_reason: Option<String>,
    /// Plugin that halted (if halted).
    pub halted_by: Option<String>,
    /// Individual handler results, in invocation order.
    pub results: Vec<HandlerReport>,
    /// Plugins whose handler timed out.
    pub timed_out: Vec<String>,
}

impl DispatchResult {
    /// Number of handlers that ran to completion.
    pub fn handled(&self) -> usize {
        self.results.len()
    }
}
