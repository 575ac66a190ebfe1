//! Inbound event payloads routed to plugins.

pub mod message;

pub use message::{Message, MessageKind};
