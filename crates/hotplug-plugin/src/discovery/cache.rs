//! Unit cache: tracks loaded code units by generation.
//!
//! Every load of a unit gets a fresh, strictly increasing generation. The
//! cache keeps the types of the latest generation of each unit so that
//! invalidating a unit releases its code once no instance refers to it.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;
use tracing::debug;

use crate::contract::PluginType;

use super::unit::{UnitOrigin, UnitPath};

/// A unit as last loaded.
#[derive(Debug, Clone)]
pub struct CachedUnit {
    /// Origin, including the generation.
    pub origin: UnitOrigin,
    /// Types the unit declared.
    pub types: Vec<Arc<dyn PluginType>>,
}

impl CachedUnit {
    /// Whether this load declared a type with identifier `id`.
    pub fn declares(&self, id: &str) -> bool {
        self.types.iter().any(|t| t.id() == id)
    }
}

/// Generation-tracking cache of loaded units.
#[derive(Debug)]
pub struct UnitCache {
    /// Next generation to hand out.
    next_generation: AtomicU64,
    /// Unit path → latest load.
    units: Mutex<HashMap<UnitPath, CachedUnit>>,
}

impl UnitCache {
    /// Creates an empty cache. Generations start at 1.
    pub fn new() -> Self {
        Self {
            next_generation: AtomicU64::new(1),
            units: Mutex::new(HashMap::new()),
        }
    }

    /// Reserves the generation for a new load.
    pub fn next_generation(&self) -> u64 {
        self.next_generation.fetch_add(1, Ordering::SeqCst)
    }

    /// Stores the result of a load, replacing any older generation.
    pub async fn store(&self, origin: UnitOrigin, types: Vec<Arc<dyn PluginType>>) {
        let mut units = self.units.lock().await;
        debug!(
            unit = %origin.unit,
            generation = origin.generation,
            types = types.len(),
            "Unit cached"
        );
        units.insert(origin.unit.clone(), CachedUnit { origin, types });
    }

    /// Returns the latest load of a unit.
    pub async fn get(&self, unit: &UnitPath) -> Option<CachedUnit> {
        let units = self.units.lock().await;
        units.get(unit).cloned()
    }

    /// Generation of the latest load of a unit.
    pub async fn generation(&self, unit: &UnitPath) -> Option<u64> {
        let units = self.units.lock().await;
        units.get(unit).map(|u| u.origin.generation)
    }

    /// Drops one unit. Returns whether it was cached.
    pub async fn invalidate(&self, unit: &UnitPath) -> bool {
        let mut units = self.units.lock().await;
        units.remove(unit).is_some()
    }

    /// Drops every unit except `keep`. Returns how many were dropped.
    pub async fn invalidate_all(&self, keep: Option<&UnitPath>) -> usize {
        let mut units = self.units.lock().await;
        let before = units.len();
        units.retain(|path, _| Some(path) == keep);
        let dropped = before - units.len();
        debug!(dropped, "Unit cache invalidated");
        dropped
    }

    /// Paths of all cached units, sorted.
    pub async fn units(&self) -> Vec<UnitPath> {
        let units = self.units.lock().await;
        let mut paths: Vec<UnitPath> = units.keys().cloned().collect();
        paths.sort();
        paths
    }
}

impl Default for UnitCache {
    fn default() -> Self {
        Self::new()
    }
}
