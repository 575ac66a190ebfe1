//! Plugin manager: the lifecycle state machine over discovery, the
//! registry, the gating policy and the event bus.
//!
//! Per identifier a plugin is unknown, registered-but-disabled, or active.
//! Records are never removed once created, so unload and reload only move
//! an identifier between the last two states.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, error, info, warn};

use hotplug_core::config::PluginConfig;
use hotplug_core::{ClientHandle, Message};

use crate::bus::{DispatchResult, EventBus, LocalBus};
use crate::contract::{ConstructContext, Plugin, PluginType};
use crate::discovery::{self, DiscoveredType, Discovery, UnitLoader, UnitOrigin};
use crate::error::LifecycleError;
use crate::gating::{ExclusionSet, GatingPolicy};
use crate::lifecycle;
use crate::registry::{PluginInfo, PluginRegistry};
use crate::router::EventRouter;

/// What to load: a type handle, or an identifier to look up.
#[derive(Debug, Clone)]
pub enum LoadTarget {
    /// Load this type directly.
    Type(Arc<dyn PluginType>),
    /// Find the type by identifier (discovery first, then the type table).
    Id(String),
}

impl From<Arc<dyn PluginType>> for LoadTarget {
    fn from(ty: Arc<dyn PluginType>) -> Self {
        Self::Type(ty)
    }
}

impl From<&str> for LoadTarget {
    fn from(id: &str) -> Self {
        Self::Id(id.to_string())
    }
}

impl From<String> for LoadTarget {
    fn from(id: String) -> Self {
        Self::Id(id)
    }
}

/// Per-identifier partition of a bulk operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkOutcome {
    /// Identifiers the operation succeeded for.
    pub succeeded: Vec<String>,
    /// Identifiers the operation failed for.
    pub failed: Vec<String>,
}

/// Result of [`PluginManager::refresh_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshOutcome {
    /// Identifiers active after the refresh.
    pub loaded: Vec<String>,
    /// Previously active identifiers that did not come back.
    pub not_reloaded: Vec<String>,
}

/// Construction options of a [`PluginManager`].
#[derive(Debug, Clone)]
pub struct ManagerOptions {
    /// Plugin roots, scanned in order.
    pub roots: Vec<PathBuf>,
    /// Exclusion set entries.
    pub disabled: Vec<String>,
    /// Identifier of the protected plugin.
    pub always_on: String,
    /// Create missing roots.
    pub auto_create: bool,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self::from(&PluginConfig::default())
    }
}

impl From<&PluginConfig> for ManagerOptions {
    fn from(config: &PluginConfig) -> Self {
        Self {
            roots: config.roots(),
            disabled: config.disabled.clone(),
            always_on: config.always_on.clone(),
            auto_create: config.auto_create,
        }
    }
}

/// Manages discovery, activation, deactivation and hot reload of plugins.
#[derive(Debug)]
pub struct PluginManager {
    /// Records, type table, active instances.
    registry: Arc<PluginRegistry>,
    /// Event bus handlers are bound into.
    bus: Arc<dyn EventBus>,
    /// Routes inbound messages; owns the client handle.
    router: EventRouter,
    /// Unit discovery over the plugin roots.
    discovery: Discovery,
    /// Exclusion set + self-flag.
    gating: GatingPolicy,
    /// Identifier that can never be unloaded or reloaded.
    always_on: String,
}

impl PluginManager {
    /// Creates a manager.
    ///
    /// Missing roots are created when `auto_create` is set; a root that
    /// cannot be created is dropped and the manager keeps working with the
    /// remaining roots (or registry-only when none remain).
    pub fn new(
        options: ManagerOptions,
        loaders: Vec<Arc<dyn UnitLoader>>,
        bus: Arc<dyn EventBus>,
    ) -> Self {
        let mut roots = Vec::with_capacity(options.roots.len());
        for root in options.roots {
            if !options.auto_create {
                roots.push(root);
                continue;
            }
            match discovery::ensure_root(&root) {
                Ok(_) => roots.push(root),
                Err(e) => warn!(
                    root = %root.display(),
                    error = %e,
                    "Cannot create plugin root, continuing without it"
                ),
            }
        }

        if roots.is_empty() {
            warn!("No plugin roots available, operating registry-only");
        }

        let exclusions = ExclusionSet::new(options.disabled);
        info!(
            roots = roots.len(),
            disabled = exclusions.len(),
            always_on = %options.always_on,
            "Plugin manager initialized"
        );

        Self {
            registry: Arc::new(PluginRegistry::new()),
            router: EventRouter::new(bus.clone()),
            bus,
            discovery: Discovery::new(roots, loaders),
            gating: GatingPolicy::new(exclusions),
            always_on: options.always_on,
        }
    }

    /// Creates a manager with a [`LocalBus`] configured from `config`.
    pub fn from_config(config: &PluginConfig, loaders: Vec<Arc<dyn UnitLoader>>) -> Self {
        let bus = Arc::new(LocalBus::new(config.handler_timeout()));
        Self::new(ManagerOptions::from(config), loaders, bus)
    }

    // ── Client & routing ──────────────────────────────────────────

    /// Stores the client handle passed to `on_enable` and routed messages.
    pub async fn set_client(&self, client: ClientHandle) {
        self.router.set_client(client).await;
    }

    /// The configured client handle.
    pub async fn client(&self) -> Option<ClientHandle> {
        self.router.client().await
    }

    /// Forwards a message to the bus. `None` when no client is configured.
    pub async fn route(&self, message: &Message) -> Option<DispatchResult> {
        self.router.route(message).await
    }

    // ── Single-plugin lifecycle ───────────────────────────────────

    /// Loads one plugin.
    ///
    /// The exclusion set does not apply to an explicit load; the plugin's
    /// own enable flag does.
    pub async fn load(&self, target: impl Into<LoadTarget>) -> Result<(), LifecycleError> {
        match target.into() {
            LoadTarget::Type(ty) => {
                let guard = self.registry.lock(ty.id()).await;
                self.load_type_locked(guard, ty, None, true).await
            }
            LoadTarget::Id(id) => {
                let guard = self.registry.lock(&id).await;
                self.load_id_locked(guard, &id).await
            }
        }
    }

    /// Unloads an active plugin.
    pub async fn unload(&self, id: &str) -> Result<(), LifecycleError> {
        self.ensure_unprotected(id, "unloaded")?;
        let guard = self.registry.lock(id).await;
        self.unload_locked(guard, id).await.map(drop)
    }

    /// Replaces an active plugin with a fresh instance built from a fresh
    /// load of its code unit.
    ///
    /// Both phases run under the identifier's lock: the guard travels
    /// through the deactivation task and back into activation.
    pub async fn reload(&self, id: &str) -> Result<(), LifecycleError> {
        self.ensure_unprotected(id, "reloaded")?;
        let guard = self.registry.lock(id).await;

        let (ty, origin) = self
            .registry
            .resolve(id)
            .await
            .ok_or_else(|| LifecycleError::NotFound { id: id.to_string() })?;

        let guard = self.unload_locked(guard, id).await?;

        let Some(origin) = origin else {
            debug!(plugin_id = %id, "No code unit, rebuilding from type table");
            return self.load_type_locked(guard, ty, None, true).await;
        };

        self.discovery.invalidate(&origin.unit).await;
        let fresh = self
            .discovery
            .reload_unit(&origin)
            .await
            .map_err(|source| {
                error!(plugin_id = %id, error = %source, "Failed to reload plugin unit");
                LifecycleError::Discovery {
                    id: id.to_string(),
                    source,
                }
            })?;

        let found = fresh
            .into_iter()
            .find(|d| d.ty.id() == id)
            .ok_or_else(|| {
                warn!(plugin_id = %id, unit = %origin.unit, "Plugin type gone after reload");
                LifecycleError::NotFound { id: id.to_string() }
            })?;

        info!(
            plugin_id = %id,
            generation = found.origin.generation,
            "Plugin unit reloaded"
        );
        self.load_type_locked(guard, found.ty, Some(found.origin), true)
            .await
    }

    // ── Bulk lifecycle ────────────────────────────────────────────

    /// Discovers every plugin under every root and loads it.
    ///
    /// Returns the identifiers that became active.
    pub async fn load_all(&self, load_disabled: bool) -> Vec<String> {
        let discovered = self.discovery.discover_all().await;
        self.load_discovered(discovered, load_disabled).await
    }

    /// Discovers and loads the plugins under one extra directory.
    pub async fn load_from_directory(&self, root: &Path, load_disabled: bool) -> Vec<String> {
        let discovered = self.discovery.discover_root(root).await;
        self.load_discovered(discovered, load_disabled).await
    }

    /// Unloads every active plugin independently.
    pub async fn unload_all(&self) -> BulkOutcome {
        let mut outcome = BulkOutcome::default();
        for id in self.registry.active_ids().await {
            match self.unload(&id).await {
                Ok(()) => outcome.succeeded.push(id),
                Err(e) => {
                    error!(plugin_id = %id, error = %e, "Error unloading plugin");
                    outcome.failed.push(id);
                }
            }
        }
        info!(
            unloaded = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            "Bulk unload finished"
        );
        outcome
    }

    /// Reloads every active plugin except the protected one.
    ///
    /// Every cached unit except the protected plugin's is invalidated
    /// between the unload and load phases.
    pub async fn reload_all(&self) -> BulkOutcome {
        let targets: Vec<String> = self
            .registry
            .active_ids()
            .await
            .into_iter()
            .filter(|id| *id != self.always_on)
            .collect();

        let mut outcome = BulkOutcome::default();
        let mut unloaded = Vec::with_capacity(targets.len());
        for id in targets {
            match self.unload(&id).await {
                Ok(()) => unloaded.push(id),
                Err(e) => {
                    error!(plugin_id = %id, error = %e, "Reload aborted, unload failed");
                    outcome.failed.push(id);
                }
            }
        }

        let keep = self
            .registry
            .record(&self.always_on)
            .await
            .and_then(|r| r.origin)
            .map(|o| o.unit);
        self.discovery.invalidate_all(keep.as_ref()).await;

        for id in unloaded {
            match self.load(id.as_str()).await {
                Ok(()) => outcome.succeeded.push(id),
                Err(e) => {
                    error!(plugin_id = %id, error = %e, "Plugin did not come back after reload");
                    outcome.failed.push(id);
                }
            }
        }

        info!(
            reloaded = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            "Bulk reload finished"
        );
        outcome
    }

    /// Unloads everything, drops every cached unit and loads all roots again.
    pub async fn refresh_all(&self) -> RefreshOutcome {
        let unloaded = self.unload_all().await.succeeded;
        info!(plugins = ?unloaded, "Refreshing plugins");

        self.discovery.invalidate_all(None).await;
        let loaded = self.load_all(false).await;

        let not_reloaded = unloaded
            .into_iter()
            .filter(|id| !loaded.contains(id))
            .collect();

        RefreshOutcome {
            loaded,
            not_reloaded,
        }
    }

    // ── Queries ───────────────────────────────────────────────────

    /// Record of one plugin, active or not.
    pub async fn plugin_info(&self, id: &str) -> Option<PluginInfo> {
        self.registry.info(id).await
    }

    /// Records of every known plugin, sorted by identifier.
    pub async fn all_plugin_info(&self) -> Vec<PluginInfo> {
        self.registry.list().await
    }

    /// Whether a plugin is active.
    pub async fn is_active(&self, id: &str) -> bool {
        self.registry.is_active(id).await
    }

    /// Identifiers of active plugins, sorted.
    pub async fn active_plugins(&self) -> Vec<String> {
        self.registry.active_ids().await
    }

    /// The live instance of an active plugin.
    pub async fn get_plugin(&self, id: &str) -> Option<Arc<dyn Plugin>> {
        self.registry.get_active(id).await
    }

    /// Identifier of the protected plugin.
    pub fn always_on(&self) -> &str {
        &self.always_on
    }

    /// The plugin registry.
    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    /// The event bus.
    pub fn bus(&self) -> &Arc<dyn EventBus> {
        &self.bus
    }

    /// Unit discovery.
    pub fn discovery(&self) -> &Discovery {
        &self.discovery
    }

    // ── Internals ─────────────────────────────────────────────────

    fn ensure_unprotected(&self, id: &str, action: &'static str) -> Result<(), LifecycleError> {
        if id == self.always_on {
            warn!(plugin_id = %id, action, "Refusing to touch protected plugin");
            return Err(LifecycleError::Protected {
                id: id.to_string(),
                action,
            });
        }
        Ok(())
    }

    async fn load_discovered(
        &self,
        discovered: Vec<DiscoveredType>,
        load_disabled: bool,
    ) -> Vec<String> {
        let mut loaded = Vec::new();
        for found in discovered {
            let id = found.ty.id().to_string();
            let guard = self.registry.lock(&id).await;
            match self
                .load_type_locked(guard, found.ty, Some(found.origin), load_disabled)
                .await
            {
                Ok(()) => loaded.push(id),
                Err(LifecycleError::AlreadyActive { .. }) => {}
                Err(LifecycleError::Skipped { .. }) => {}
                Err(e) => error!(plugin_id = %id, error = %e, "Failed to load plugin"),
            }
        }
        loaded
    }

    /// Discovery first; falls back to the type table for plugins with no
    /// unit on disk or disabled plugins re-enabled by name.
    async fn load_id_locked(
        &self,
        guard: OwnedMutexGuard<()>,
        id: &str,
    ) -> Result<(), LifecycleError> {
        if self.registry.is_active(id).await {
            debug!(plugin_id = %id, "Plugin already active, ignoring load");
            return Err(LifecycleError::AlreadyActive { id: id.to_string() });
        }

        let hint = self.registry.record(id).await.and_then(|r| r.origin);
        if let Some(found) = self.discovery.find(id, hint.as_ref()).await {
            return self
                .load_type_locked(guard, found.ty, Some(found.origin), true)
                .await;
        }

        match self.registry.resolve(id).await {
            Some((ty, origin)) => {
                debug!(plugin_id = %id, "Not on disk, loading from type table");
                self.load_type_locked(guard, ty, origin, true).await
            }
            None => {
                warn!(plugin_id = %id, "Plugin type not found");
                Err(LifecycleError::NotFound { id: id.to_string() })
            }
        }
    }

    /// Type-based load under the identifier's lock.
    async fn load_type_locked(
        &self,
        guard: OwnedMutexGuard<()>,
        ty: Arc<dyn PluginType>,
        origin: Option<UnitOrigin>,
        load_disabled: bool,
    ) -> Result<(), LifecycleError> {
        let id = ty.id().to_string();

        if self.registry.is_active(&id).await {
            debug!(plugin_id = %id, "Plugin already active, ignoring load");
            return Err(LifecycleError::AlreadyActive { id });
        }

        // A bare type handle keeps the unit the record already points at.
        let origin = match origin {
            Some(origin) => Some(origin),
            None => self.registry.record(&id).await.and_then(|r| r.origin),
        };

        let ctx = origin
            .as_ref()
            .map(|o| ConstructContext::in_directory(o.path.clone()))
            .unwrap_or_default();
        let instance = ty.construct(&ctx).map_err(|source| {
            error!(plugin_id = %id, error = %source, "Failed to construct plugin");
            LifecycleError::Construction {
                id: id.clone(),
                source,
            }
        })?;

        let self_enabled = instance.enabled();
        let directory = origin.as_ref().map(|o| o.directory.clone());
        self.registry.upsert(ty, origin).await;

        if let Some(reason) =
            self.gating
                .evaluate(&id, directory.as_deref(), self_enabled, load_disabled)
        {
            info!(plugin_id = %id, reason = %reason, "Skipping plugin");
            return Err(LifecycleError::Skipped { id, reason });
        }

        let client = self.router.client().await;
        lifecycle::activate(
            guard,
            self.bus.clone(),
            self.registry.clone(),
            id.clone(),
            instance,
            client,
        )
        .await
        .inspect_err(|e| error!(plugin_id = %id, error = %e, "Failed to activate plugin"))
    }

    /// Deactivates under the identifier's lock and hands the lock back.
    async fn unload_locked(
        &self,
        guard: OwnedMutexGuard<()>,
        id: &str,
    ) -> Result<OwnedMutexGuard<()>, LifecycleError> {
        let instance = self.registry.get_active(id).await.ok_or_else(|| {
            debug!(plugin_id = %id, "Plugin not active, nothing to unload");
            LifecycleError::NotActive { id: id.to_string() }
        })?;

        lifecycle::deactivate(
            guard,
            self.bus.clone(),
            self.registry.clone(),
            id.to_string(),
            instance,
        )
        .await
    }
}
