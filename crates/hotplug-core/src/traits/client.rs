//! Transport client contract.
//!
//! The host owns exactly one client handle. It is set once, then shared
//! read-only with every plugin on activation and with every routed message.

use std::any::Any;
use std::sync::Arc;

/// A transport connection plugins use to talk back to the outside world.
///
/// The concrete client lives outside this workspace; plugins that need
/// its full API downcast through [`Client::as_any`].
pub trait Client: Send + Sync + std::fmt::Debug + 'static {
    /// Identifier of the account or connection this client speaks for.
    fn id(&self) -> &str;

    /// Access to the concrete client type.
    fn as_any(&self) -> &dyn Any;
}

/// Shared handle to the process-wide client.
pub type ClientHandle = Arc<dyn Client>;

/// Downcasts a client handle to its concrete type.
pub fn downcast_client<T: Client>(client: &ClientHandle) -> Option<&T> {
    client.as_any().downcast_ref::<T>()
}
