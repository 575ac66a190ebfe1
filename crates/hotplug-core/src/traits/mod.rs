//! Core trait definitions shared between the host and its plugins.

pub mod client;

pub use client::{Client, ClientHandle};
