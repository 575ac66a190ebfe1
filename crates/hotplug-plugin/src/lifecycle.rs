//! Activation and deactivation sequences.
//!
//! Both sequences run on a spawned task and the caller only awaits the
//! join handle. Dropping the caller's future therefore never interrupts a
//! sequence halfway: either the instance ends up bound, enabled and in the
//! active table, or every step that did run has been unwound.

use std::sync::Arc;

use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, warn};

use hotplug_core::ClientHandle;

use crate::bus::EventBus;
use crate::contract::Plugin;
use crate::error::{ActivationStage, LifecycleError};
use crate::registry::PluginRegistry;

/// Binds `instance` into the bus, runs its activation hooks and inserts it
/// into the active table.
///
/// `guard` is the identifier's lifecycle lock; it is released only when the
/// sequence has finished, even if the caller stops waiting.
pub(crate) async fn activate(
    guard: OwnedMutexGuard<()>,
    bus: Arc<dyn EventBus>,
    registry: Arc<PluginRegistry>,
    id: String,
    instance: Arc<dyn Plugin>,
    client: Option<ClientHandle>,
) -> Result<(), LifecycleError> {
    let task_id = id.clone();
    tokio::spawn(async move {
        let result = run_activation(bus, registry, task_id, instance, client).await;
        drop(guard);
        result
    })
    .await
    .map_err(|e| LifecycleError::Aborted {
        id,
        message: e.to_string(),
    })?
}

/// Runs `on_disable`, unbinds, and removes `id` from the active table.
///
/// Like [`activate`], the sequence owns the identifier's lock. On success
/// the guard is handed back so the caller can continue under the same lock
/// (reload); if the caller is gone by then, dropping the task output
/// releases it.
pub(crate) async fn deactivate(
    guard: OwnedMutexGuard<()>,
    bus: Arc<dyn EventBus>,
    registry: Arc<PluginRegistry>,
    id: String,
    instance: Arc<dyn Plugin>,
) -> Result<OwnedMutexGuard<()>, LifecycleError> {
    let task_id = id.clone();
    tokio::spawn(async move {
        run_deactivation(bus, registry, task_id, instance)
            .await
            .map(|()| guard)
    })
    .await
    .map_err(|e| LifecycleError::Aborted {
        id,
        message: e.to_string(),
    })?
}

async fn run_activation(
    bus: Arc<dyn EventBus>,
    registry: Arc<PluginRegistry>,
    id: String,
    instance: Arc<dyn Plugin>,
    client: Option<ClientHandle>,
) -> Result<(), LifecycleError> {
    let failed = |stage: ActivationStage, message: String| LifecycleError::Activation {
        id: id.clone(),
        stage,
        message,
    };

    let handlers = bus
        .bind(&id, &instance)
        .await
        .map_err(|e| failed(ActivationStage::Bind, e.to_string()))?;
    debug!(plugin_id = %id, handlers, "Plugin handlers bound");

    if let Err(e) = instance.on_enable(client).await {
        unwind_bind(bus.as_ref(), &id).await;
        return Err(failed(ActivationStage::Enable, e.message));
    }

    if let Err(e) = instance.async_init().await {
        if let Err(disable_err) = instance.on_disable().await {
            warn!(
                plugin_id = %id,
                error = %disable_err,
                "on_disable failed while unwinding async_init"
            );
        }
        unwind_bind(bus.as_ref(), &id).await;
        return Err(failed(ActivationStage::AsyncInit, e.message));
    }

    if !registry.insert_active(&id, instance.clone()).await {
        if let Err(e) = instance.on_disable().await {
            warn!(plugin_id = %id, error = %e, "on_disable failed while unwinding");
        }
        unwind_bind(bus.as_ref(), &id).await;
        return Err(LifecycleError::AlreadyActive { id });
    }
    registry.set_enabled(&id, true).await;

    info!(plugin_id = %id, handlers, "Plugin activated");
    Ok(())
}

async fn run_deactivation(
    bus: Arc<dyn EventBus>,
    registry: Arc<PluginRegistry>,
    id: String,
    instance: Arc<dyn Plugin>,
) -> Result<(), LifecycleError> {
    let disabled = instance.on_disable().await;
    if let Err(e) = &disabled {
        warn!(
            plugin_id = %id,
            error = %e,
            "on_disable failed, removing plugin anyway"
        );
    }

    match bus.unbind(&id).await {
        Ok(handlers) => debug!(plugin_id = %id, handlers, "Plugin handlers unbound"),
        Err(e) => warn!(plugin_id = %id, error = %e, "Failed to unbind plugin handlers"),
    }

    registry.remove_active(&id).await;
    registry.set_enabled(&id, false).await;

    match disabled {
        Ok(()) => {
            info!(plugin_id = %id, "Plugin deactivated");
            Ok(())
        }
        Err(source) => Err(LifecycleError::Deactivation { id, source }),
    }
}

async fn unwind_bind(bus: &dyn EventBus, id: &str) {
    if let Err(e) = bus.unbind(id).await {
        warn!(plugin_id = %id, error = %e, "Failed to unwind handler binding");
    }
}
