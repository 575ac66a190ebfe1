//! Message payload passed through the event bus.
//!
//! The routing key of a message is its [`Message::kind`]. Everything else
//! is carried as a flexible key-value map so the host never needs to know
//! the concrete payload shape of a given transport.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Well-known message kinds.
pub struct MessageKind;

impl MessageKind {
    /// Plain text chat message.
    pub const TEXT: &'static str = "text";
    /// Image message.
    pub const IMAGE: &'static str = "image";
    /// A contact or group membership change.
    pub const CONTACT: &'static str = "contact";
    /// Periodic heartbeat from the transport.
    pub const HEARTBEAT: &'static str = "heartbeat";
}

/// An inbound message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID.
    pub id: Uuid,
    /// Declared message type; used as the routing key.
    pub kind: String,
    /// Sender identifier, if the transport reports one.
    pub sender: Option<String>,
    /// Arbitrary data keyed by string.
    #[serde(default)]
    pub data: HashMap<String, serde_json::Value>,
    /// When the message was received.
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Creates a new message of the given kind.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: kind.into(),
            sender: None,
            data: HashMap::new(),
            timestamp: Utc::now(),
        }
    }

    /// Creates a text message carrying `content`.
    pub fn text(content: &str) -> Self {
        Self::new(MessageKind::TEXT).with_string("content", content)
    }

    /// Sets the sender.
    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    /// Inserts a data value.
    pub fn with_data(mut self, key: &str, value: serde_json::Value) -> Self {
        self.data.insert(key.to_string(), value);
        self
    }

    /// Inserts a string value.
    pub fn with_string(self, key: &str, value: &str) -> Self {
        self.with_data(key, serde_json::json!(value))
    }

    /// Gets a data value by key.
    pub fn get_data(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    /// Gets a string data value.
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(|v| v.as_str())
    }

    /// Text content of a text message.
    pub fn content(&self) -> Option<&str> {
        self.get_string("content")
    }
}
