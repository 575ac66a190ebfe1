//! Discovery: scans plugin roots for units and loads their plugin types.
//!
//! Layout: every plugin root holds one subdirectory per unit, and a unit
//! directory is recognized when it contains the entry file of one of the
//! configured [`UnitLoader`]s. Loading never activates anything; it only
//! produces [`DiscoveredType`]s for the lifecycle manager.
//!
//! A failure in one unit (unreadable directory, unknown unit, failing
//! registration routine) is logged and skipped. Sibling units are always
//! still attempted.

pub mod cache;
pub mod loader;
pub mod unit;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::error::DiscoveryError;

pub use cache::{CachedUnit, UnitCache};
pub use loader::{RegistrationFn, STATIC_ENTRY_FILE, StaticLoader, UnitLoader};
pub use unit::{DiscoveredType, PluginRegistrar, UnitDescriptor, UnitOrigin, UnitPath};

#[cfg(feature = "dynamic")]
pub use loader::DynamicLoader;

/// Marker file written into a freshly created plugin root.
pub const ROOT_MARKER_FILE: &str = ".plugin-root";

/// A unit directory matched to the loader that owns it.
#[derive(Debug, Clone)]
struct UnitCandidate {
    unit: UnitPath,
    root: PathBuf,
    directory: String,
    path: PathBuf,
    entry: PathBuf,
    loader: Arc<dyn UnitLoader>,
}

/// Scans plugin roots and loads units through the configured loaders.
#[derive(Debug)]
pub struct Discovery {
    /// Plugin roots, scanned in order.
    roots: Vec<PathBuf>,
    /// Loaders, asked in order.
    loaders: Vec<Arc<dyn UnitLoader>>,
    /// Loaded units by generation.
    cache: UnitCache,
}

impl Discovery {
    /// Creates a discovery over the given roots and loaders.
    pub fn new(roots: Vec<PathBuf>, loaders: Vec<Arc<dyn UnitLoader>>) -> Self {
        Self {
            roots,
            loaders,
            cache: UnitCache::new(),
        }
    }

    /// Plugin roots.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// The unit cache.
    pub fn cache(&self) -> &UnitCache {
        &self.cache
    }

    /// Loads every unit under every root.
    pub async fn discover_all(&self) -> Vec<DiscoveredType> {
        let mut found = Vec::new();
        for root in &self.roots {
            found.extend(self.discover_root(root).await);
        }
        found
    }

    /// Loads every unit under one root.
    ///
    /// An unreadable root yields an empty list.
    pub async fn discover_root(&self, root: &Path) -> Vec<DiscoveredType> {
        let candidates = match self.scan_root(root).await {
            Ok(c) => c,
            Err(e) => {
                warn!(root = %root.display(), error = %e, "Skipping plugin root");
                return Vec::new();
            }
        };

        let mut found = Vec::new();
        for candidate in candidates {
            match self.load_candidate(&candidate).await {
                Ok(types) => found.extend(types),
                Err(e) => {
                    error!(
                        unit = %candidate.unit,
                        error = %e,
                        "Failed to load plugin unit, skipping"
                    );
                }
            }
        }
        found
    }

    /// Finds the type with identifier `id` with a fresh load of its unit.
    ///
    /// `hint` is the unit the identifier last came from; it is tried first
    /// and alone. Otherwise units are scanned in order, and a unit whose
    /// cached load does not declare `id` is skipped without reloading it.
    /// Only units never loaded before are loaded to learn what they declare.
    pub async fn find(&self, id: &str, hint: Option<&UnitOrigin>) -> Option<DiscoveredType> {
        if let Some(origin) = hint {
            match self.reload_unit(origin).await {
                Ok(types) => {
                    if let Some(found) = types.into_iter().find(|t| t.ty.id() == id) {
                        return Some(found);
                    }
                    debug!(plugin_id = %id, unit = %origin.unit, "Unit no longer declares plugin");
                }
                Err(e) => {
                    debug!(
                        plugin_id = %id,
                        unit = %origin.unit,
                        error = %e,
                        "Recorded unit unavailable, scanning roots"
                    );
                }
            }
        }

        for root in &self.roots {
            let candidates = match self.scan_root(root).await {
                Ok(c) => c,
                Err(e) => {
                    warn!(root = %root.display(), error = %e, "Skipping plugin root");
                    continue;
                }
            };

            for candidate in candidates {
                if hint.is_some_and(|h| h.unit == candidate.unit) {
                    continue;
                }
                if let Some(cached) = self.cache.get(&candidate.unit).await {
                    if !cached.declares(id) {
                        continue;
                    }
                }

                match self.load_candidate(&candidate).await {
                    Ok(types) => {
                        if let Some(found) = types.into_iter().find(|t| t.ty.id() == id) {
                            return Some(found);
                        }
                    }
                    Err(e) => {
                        error!(
                            unit = %candidate.unit,
                            error = %e,
                            "Failed to load plugin unit, skipping"
                        );
                    }
                }
            }
        }

        debug!(plugin_id = %id, "Plugin type not found in any root");
        None
    }

    /// Loads a fresh generation of the unit described by `origin`.
    pub async fn reload_unit(
        &self,
        origin: &UnitOrigin,
    ) -> Result<Vec<DiscoveredType>, DiscoveryError> {
        let candidate = self
            .candidate(&origin.root, &origin.directory, &origin.path)
            .await
            .ok_or_else(|| DiscoveryError::MissingEntry {
                dir: origin.path.clone(),
            })?;

        self.load_candidate(&candidate).await
    }

    /// Drops one unit from the cache.
    pub async fn invalidate(&self, unit: &UnitPath) -> bool {
        self.cache.invalidate(unit).await
    }

    /// Drops every cached unit except `keep`.
    pub async fn invalidate_all(&self, keep: Option<&UnitPath>) -> usize {
        self.cache.invalidate_all(keep).await
    }

    /// Lists the loadable unit directories of a root, sorted by name.
    async fn scan_root(&self, root: &Path) -> Result<Vec<UnitCandidate>, DiscoveryError> {
        let mut entries = tokio::fs::read_dir(root)
            .await
            .map_err(|e| DiscoveryError::RootUnavailable {
                path: root.to_path_buf(),
                message: e.to_string(),
            })?;

        let mut dirs = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| DiscoveryError::io(root, e))?
        {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name.starts_with('.') || !path.is_dir() {
                continue;
            }
            dirs.push((name.to_string(), path.clone()));
        }
        dirs.sort_by(|a, b| a.0.cmp(&b.0));

        let mut candidates = Vec::new();
        for (name, path) in dirs {
            match self.candidate(root, &name, &path).await {
                Some(c) => candidates.push(c),
                None => debug!(dir = %path.display(), "No recognized entry file, ignoring"),
            }
        }
        Ok(candidates)
    }

    /// Matches a unit directory to the first loader whose entry file exists.
    async fn candidate(&self, root: &Path, directory: &str, path: &Path) -> Option<UnitCandidate> {
        for loader in &self.loaders {
            let entry = path.join(loader.entry_file());
            if tokio::fs::try_exists(&entry).await.unwrap_or(false) {
                return Some(UnitCandidate {
                    unit: UnitPath::new(root, directory),
                    root: root.to_path_buf(),
                    directory: directory.to_string(),
                    path: path.to_path_buf(),
                    entry,
                    loader: loader.clone(),
                });
            }
        }
        None
    }

    /// Runs a fresh load of one unit under a new generation.
    async fn load_candidate(
        &self,
        candidate: &UnitCandidate,
    ) -> Result<Vec<DiscoveredType>, DiscoveryError> {
        let generation = self.cache.next_generation();
        let descriptor = UnitDescriptor {
            unit: candidate.unit.clone(),
            directory: candidate.directory.clone(),
            path: candidate.path.clone(),
            entry: candidate.entry.clone(),
            generation,
        };

        let loader = candidate.loader.clone();
        let unit_name = candidate.unit.to_string();
        let types = tokio::task::spawn_blocking(move || loader.load(&descriptor))
            .await
            .map_err(|e| DiscoveryError::Load {
                unit: unit_name,
                message: e.to_string(),
            })??;

        let origin = UnitOrigin {
            unit: candidate.unit.clone(),
            root: candidate.root.clone(),
            directory: candidate.directory.clone(),
            path: candidate.path.clone(),
            generation,
        };

        info!(
            unit = %origin.unit,
            loader = %candidate.loader.name(),
            generation,
            types = types.len(),
            "Plugin unit loaded"
        );

        self.cache.store(origin.clone(), types.clone()).await;

        Ok(types
            .into_iter()
            .map(|ty| DiscoveredType {
                ty,
                origin: origin.clone(),
            })
            .collect())
    }
}

/// Makes sure a plugin root exists, creating it with a marker file.
///
/// Returns `Ok(true)` when the root was created.
pub fn ensure_root(root: &Path) -> std::io::Result<bool> {
    if root.is_dir() {
        return Ok(false);
    }

    std::fs::create_dir_all(root)?;
    info!(root = %root.display(), "Plugin root did not exist, created");

    let marker = root.join(ROOT_MARKER_FILE);
    if !marker.exists() {
        std::fs::write(&marker, "# plugin root\n")?;
        debug!(marker = %marker.display(), "Plugin root marker written");
    }

    Ok(true)
}
