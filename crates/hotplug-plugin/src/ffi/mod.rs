//! ABI shared between the host and shared-library plugins.

pub mod abi;
#[cfg(feature = "dynamic")]
pub mod library;
