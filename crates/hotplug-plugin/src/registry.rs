//! Plugin registry: registration records, the type table, and active instances.
//!
//! Records are created the first time a type is handed to the lifecycle
//! manager and are never deleted; unloading only flips `enabled`. The
//! active table holds an entry exactly while a plugin is bound and its
//! activation hooks have completed.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, info};

use crate::contract::{Plugin, PluginMetadata, PluginType};
use crate::discovery::UnitOrigin;

/// Registration record of one plugin identifier.
#[derive(Debug, Clone)]
pub struct PluginRecord {
    /// Class-level metadata of the latest type.
    pub metadata: PluginMetadata,
    /// Latest type seen for this identifier (the type table entry).
    pub ty: Arc<dyn PluginType>,
    /// Unit the type came from; `None` for types registered in memory.
    pub origin: Option<UnitOrigin>,
    /// Whether an instance is currently active.
    pub enabled: bool,
    /// When the current instance was activated.
    pub activated_at: Option<DateTime<Utc>>,
}

/// Serializable view of a [`PluginRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    /// Unique plugin identifier.
    pub id: String,
    /// Plugin description.
    pub description: String,
    /// Author or maintainer.
    pub author: String,
    /// Plugin version string.
    pub version: String,
    /// Source directory name, if loaded from disk.
    pub directory: Option<String>,
    /// Full path of the source directory.
    pub path: Option<PathBuf>,
    /// Unit path, if loaded from disk.
    pub unit: Option<String>,
    /// Generation of the unit the type was built from.
    pub generation: Option<u64>,
    /// Whether the plugin is currently active.
    pub enabled: bool,
    /// When the current instance was activated.
    pub activated_at: Option<DateTime<Utc>>,
}

impl From<&PluginRecord> for PluginInfo {
    fn from(record: &PluginRecord) -> Self {
        let origin = record.origin.as_ref();
        Self {
            id: record.metadata.id.clone(),
            description: record.metadata.description.clone(),
            author: record.metadata.author.clone(),
            version: record.metadata.version.clone(),
            directory: origin.map(|o| o.directory.clone()),
            path: origin.map(|o| o.path.clone()),
            unit: origin.map(|o| o.unit.to_string()),
            generation: origin.map(|o| o.generation),
            enabled: record.enabled,
            activated_at: record.activated_at,
        }
    }
}

/// Registry of plugin records and active instances.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    /// Plugin ID → registration record.
    records: RwLock<HashMap<String, PluginRecord>>,
    /// Plugin ID → live instance.
    active: RwLock<HashMap<String, Arc<dyn Plugin>>>,
    /// Plugin ID → lifecycle lock.
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl PluginRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the lifecycle lock of one identifier.
    ///
    /// Operations on the same identifier serialize on this lock; different
    /// identifiers never contend.
    pub async fn lock(&self, id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks
                .entry(id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Writes or refreshes the record and type table entry for a type.
    ///
    /// The `enabled` flag of an existing record is kept.
    pub async fn upsert(&self, ty: Arc<dyn PluginType>, origin: Option<UnitOrigin>) {
        let metadata = ty.metadata();
        let id = metadata.id.clone();

        let mut records = self.records.write().await;
        match records.get_mut(&id) {
            Some(record) => {
                record.metadata = metadata;
                record.ty = ty;
                record.origin = origin;
                debug!(plugin_id = %id, "Plugin record refreshed");
            }
            None => {
                info!(
                    plugin_id = %id,
                    version = %metadata.version,
                    directory = ?origin.as_ref().map(|o| o.directory.as_str()),
                    "Plugin registered"
                );
                records.insert(
                    id,
                    PluginRecord {
                        metadata,
                        ty,
                        origin,
                        enabled: false,
                        activated_at: None,
                    },
                );
            }
        }
    }

    /// Sets the record's `enabled` flag.
    pub async fn set_enabled(&self, id: &str, enabled: bool) {
        let mut records = self.records.write().await;
        if let Some(record) = records.get_mut(id) {
            record.enabled = enabled;
            record.activated_at = enabled.then(Utc::now);
        }
    }

    /// Returns the record of an identifier.
    pub async fn record(&self, id: &str) -> Option<PluginRecord> {
        let records = self.records.read().await;
        records.get(id).cloned()
    }

    /// Returns the type table entry and its origin.
    pub async fn resolve(&self, id: &str) -> Option<(Arc<dyn PluginType>, Option<UnitOrigin>)> {
        let records = self.records.read().await;
        records.get(id).map(|r| (r.ty.clone(), r.origin.clone()))
    }

    /// Inserts a live instance. Returns `false` if one was already present.
    pub async fn insert_active(&self, id: &str, instance: Arc<dyn Plugin>) -> bool {
        let mut active = self.active.write().await;
        if active.contains_key(id) {
            return false;
        }
        active.insert(id.to_string(), instance);
        true
    }

    /// Removes and returns a live instance.
    pub async fn remove_active(&self, id: &str) -> Option<Arc<dyn Plugin>> {
        let mut active = self.active.write().await;
        active.remove(id)
    }

    /// Returns a live instance.
    pub async fn get_active(&self, id: &str) -> Option<Arc<dyn Plugin>> {
        let active = self.active.read().await;
        active.get(id).cloned()
    }

    /// Whether an instance is live.
    pub async fn is_active(&self, id: &str) -> bool {
        let active = self.active.read().await;
        active.contains_key(id)
    }

    /// Identifiers of all live instances, sorted.
    pub async fn active_ids(&self) -> Vec<String> {
        let active = self.active.read().await;
        let mut ids: Vec<String> = active.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Info view of one record.
    pub async fn info(&self, id: &str) -> Option<PluginInfo> {
        let records = self.records.read().await;
        records.get(id).map(PluginInfo::from)
    }

    /// Info views of all records, sorted by identifier.
    pub async fn list(&self) -> Vec<PluginInfo> {
        let records = self.records.read().await;
        let mut infos: Vec<PluginInfo> = records.values().map(PluginInfo::from).collect();
        infos.sort_by(|a, b| a.id.cmp(&b.id));
        infos
    }

    /// Number of records.
    pub async fn count(&self) -> usize {
        let records = self.records.read().await;
        records.len()
    }
}
