//! Unit loaders turn a plugin directory into plugin types.
//!
//! A loader recognizes one entry file name. Discovery asks each configured
//! loader in order and the first one whose entry file exists owns the unit.
//! Every call to [`UnitLoader::load`] is a fresh load: nothing from a
//! previous generation is reused.

use std::collections::HashMap;
use std::sync::Arc;

use crate::contract::PluginType;
use crate::error::{DiscoveryError, PluginError};

use super::unit::{PluginRegistrar, UnitDescriptor};

/// Turns a unit directory into the plugin types it declares.
pub trait UnitLoader: Send + Sync + std::fmt::Debug {
    /// Loader name for logs.
    fn name(&self) -> &str;

    /// File name that marks a directory as loadable by this loader.
    fn entry_file(&self) -> &str;

    /// Loads the unit from scratch.
    fn load(&self, unit: &UnitDescriptor) -> Result<Vec<Arc<dyn PluginType>>, DiscoveryError>;
}

/// Registration routine of a code unit.
pub type RegistrationFn =
    Arc<dyn Fn(&mut PluginRegistrar) -> Result<(), PluginError> + Send + Sync>;

/// Entry file recognized by [`StaticLoader`].
pub const STATIC_ENTRY_FILE: &str = "plugin.toml";

/// Loader for units compiled into the host.
///
/// The catalog maps a directory name to the unit's registration routine.
/// A directory is loadable when it contains `plugin.toml`; each load runs
/// the routine again so it can observe the current on-disk settings.
#[derive(Clone, Default)]
pub struct StaticLoader {
    /// Directory name → registration routine.
    catalog: HashMap<String, RegistrationFn>,
}

impl std::fmt::Debug for StaticLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut units: Vec<&String> = self.catalog.keys().collect();
        units.sort();
        f.debug_struct("StaticLoader").field("units", &units).finish()
    }
}

impl StaticLoader {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a unit to the catalog.
    pub fn with_unit<F>(mut self, directory: &str, register: F) -> Self
    where
        F: Fn(&mut PluginRegistrar) -> Result<(), PluginError> + Send + Sync + 'static,
    {
        self.catalog.insert(directory.to_string(), Arc::new(register));
        self
    }
}

impl UnitLoader for StaticLoader {
    fn name(&self) -> &str {
        "static"
    }

    fn entry_file(&self) -> &str {
        STATIC_ENTRY_FILE
    }

    fn load(&self, unit: &UnitDescriptor) -> Result<Vec<Arc<dyn PluginType>>, DiscoveryError> {
        let register =
            self.catalog
                .get(&unit.directory)
                .ok_or_else(|| DiscoveryError::UnknownUnit {
                    unit: unit.unit.to_string(),
                })?;

        let mut registrar = PluginRegistrar::new();
        register(&mut registrar).map_err(|source| DiscoveryError::Registration {
            unit: unit.unit.to_string(),
            source,
        })?;

        Ok(registrar.into_types())
    }
}

/// Loader for plugins shipped as shared libraries (feature `dynamic`).
#[cfg(feature = "dynamic")]
pub mod dynamic_loader {
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    use tracing::{debug, info};

    use crate::contract::PluginType;
    use crate::discovery::unit::{PluginRegistrar, UnitDescriptor};
    use crate::error::DiscoveryError;
    use crate::ffi::abi::{
        API_VERSION, API_VERSION_SYMBOL, ApiVersionFn, REGISTER_SYMBOL, RegisterFn,
    };
    use crate::ffi::library::LibraryType;

    use super::UnitLoader;

    /// Loads `plugin.<dll extension>` from each unit directory.
    ///
    /// Each generation is copied to its own file under the shadow directory
    /// before opening, so the platform loader never hands back a cached
    /// handle of an older generation.
    #[derive(Debug)]
    pub struct DynamicLoader {
        /// Entry file name for the current platform.
        entry: String,
        /// Where per-generation copies are written.
        shadow_dir: PathBuf,
    }

    impl DynamicLoader {
        /// Creates a loader that copies libraries into `shadow_dir`.
        pub fn new(shadow_dir: impl Into<PathBuf>) -> Self {
            Self {
                entry: format!("plugin.{}", std::env::consts::DLL_EXTENSION),
                shadow_dir: shadow_dir.into(),
            }
        }

        fn shadow_copy(&self, unit: &UnitDescriptor) -> Result<PathBuf, DiscoveryError> {
            std::fs::create_dir_all(&self.shadow_dir)
                .map_err(|e| DiscoveryError::io(&self.shadow_dir, e))?;

            let target = self.shadow_dir.join(format!(
                "{}-g{}.{}",
                unit.unit,
                unit.generation,
                std::env::consts::DLL_EXTENSION
            ));
            std::fs::copy(&unit.entry, &target).map_err(|e| DiscoveryError::io(&unit.entry, e))?;
            Ok(target)
        }

        /// Opens one library and runs its registration routine.
        ///
        /// # Safety
        /// Runs arbitrary code from the library. The library must be built
        /// against the same `hotplug-plugin` version with the same compiler.
        unsafe fn open(
            &self,
            unit: &UnitDescriptor,
            path: &Path,
        ) -> Result<Vec<Arc<dyn PluginType>>, DiscoveryError> {
            let load_error = |e: libloading::Error| DiscoveryError::Load {
                unit: unit.unit.to_string(),
                message: e.to_string(),
            };

            let library = unsafe { libloading::Library::new(path) }.map_err(load_error)?;

            let found = {
                let version_fn: libloading::Symbol<ApiVersionFn> =
                    unsafe { library.get(API_VERSION_SYMBOL) }.map_err(load_error)?;
                version_fn()
            };
            if found != API_VERSION {
                return Err(DiscoveryError::ApiVersionMismatch {
                    unit: unit.unit.to_string(),
                    expected: API_VERSION,
                    found,
                });
            }

            let mut registrar = PluginRegistrar::new();
            {
                let register: libloading::Symbol<RegisterFn> =
                    unsafe { library.get(REGISTER_SYMBOL) }.map_err(load_error)?;
                register(&mut registrar).map_err(|source| DiscoveryError::Registration {
                    unit: unit.unit.to_string(),
                    source,
                })?;
            }

            let library = Arc::new(library);
            let types: Vec<Arc<dyn PluginType>> = registrar
                .into_types()
                .into_iter()
                .map(|inner| LibraryType::wrap(inner, library.clone()))
                .collect();

            info!(
                unit = %unit.unit,
                generation = unit.generation,
                path = %path.display(),
                types = types.len(),
                "Shared library unit loaded"
            );

            Ok(types)
        }
    }

    impl UnitLoader for DynamicLoader {
        fn name(&self) -> &str {
            "dynamic"
        }

        fn entry_file(&self) -> &str {
            &self.entry
        }

        fn load(
            &self,
            unit: &UnitDescriptor,
        ) -> Result<Vec<Arc<dyn PluginType>>, DiscoveryError> {
            let shadow = self.shadow_copy(unit)?;
            // SAFETY: plugins run with full trust in the host process; the
            // ABI version check above rejects libraries built for another API.
            let types = match unsafe { self.open(unit, &shadow) } {
                Ok(types) => types,
                Err(e) => {
                    let _ = std::fs::remove_file(&shadow);
                    return Err(e);
                }
            };

            prune_shadow_copies(&self.shadow_dir, &unit.unit.to_string(), unit.generation);
            Ok(types)
        }
    }

    /// Generation encoded in a shadow copy name `<unit>-g<generation>.<ext>`.
    fn shadow_generation(file_name: &str, unit: &str) -> Option<u64> {
        let rest = file_name.strip_prefix(unit)?.strip_prefix("-g")?;
        let number = rest.strip_suffix(std::env::consts::DLL_EXTENSION)?.strip_suffix('.')?;
        number.parse().ok()
    }

    /// Removes shadow copies of `unit` older than `keep_generation`.
    ///
    /// Best effort: a copy the platform still holds open stays behind and
    /// is retried on the next load. Returns how many files were removed.
    pub fn prune_shadow_copies(dir: &Path, unit: &str, keep_generation: u64) -> usize {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(dir = %dir.display(), error = %e, "Shadow directory unreadable");
                return 0;
            }
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(generation) = name.to_str().and_then(|n| shadow_generation(n, unit)) else {
                continue;
            };
            if generation >= keep_generation {
                continue;
            }
            match std::fs::remove_file(entry.path()) {
                Ok(()) => removed += 1,
                Err(e) => {
                    debug!(path = %entry.path().display(), error = %e, "Shadow copy kept");
                }
            }
        }

        if removed > 0 {
            debug!(unit, removed, keep_generation, "Old shadow copies removed");
        }
        removed
    }

}

#[cfg(feature = "dynamic")]
pub use dynamic_loader::DynamicLoader;
