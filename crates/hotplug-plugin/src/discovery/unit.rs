//! Code units: one plugin directory loaded as a unit of code.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::contract::{PluginClass, PluginType, type_of};

/// Deterministic path of a code unit, derived from its root and directory
/// names (`plugins.echo` for `./plugins/echo`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitPath(String);

impl UnitPath {
    /// Builds the unit path for `directory` under `root`.
    pub fn new(root: &Path, directory: &str) -> Self {
        let root_name = root
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.is_empty() && *n != ".")
            .unwrap_or("plugins");
        Self(format!("{root_name}.{directory}"))
    }

    /// The path as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a discovered type came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitOrigin {
    /// Unit path.
    pub unit: UnitPath,
    /// Plugin root the unit was found under.
    pub root: PathBuf,
    /// Directory name of the unit.
    pub directory: String,
    /// Full path of the unit directory.
    pub path: PathBuf,
    /// Generation of the load that produced the type.
    pub generation: u64,
}

/// Input handed to a unit loader.
#[derive(Debug, Clone)]
pub struct UnitDescriptor {
    /// Unit path.
    pub unit: UnitPath,
    /// Directory name of the unit.
    pub directory: String,
    /// Full path of the unit directory.
    pub path: PathBuf,
    /// The recognized entry file.
    pub entry: PathBuf,
    /// Generation assigned to this load.
    pub generation: u64,
}

/// A plugin type together with the unit that declared it.
#[derive(Debug, Clone)]
pub struct DiscoveredType {
    /// The type.
    pub ty: Arc<dyn PluginType>,
    /// Its origin.
    pub origin: UnitOrigin,
}

/// Collects the plugin types a unit declares.
///
/// Each unit exposes one registration routine that receives a registrar
/// and registers every concrete type it implements.
#[derive(Debug, Default)]
pub struct PluginRegistrar {
    types: Vec<Arc<dyn PluginType>>,
}

impl PluginRegistrar {
    /// Creates an empty registrar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a plugin class.
    pub fn register<P: PluginClass>(&mut self) -> &mut Self {
        self.types.push(type_of::<P>());
        self
    }

    /// Registers an already erased type.
    pub fn register_type(&mut self, ty: Arc<dyn PluginType>) -> &mut Self {
        self.types.push(ty);
        self
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether nothing was registered.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Consumes the registrar, returning the types in registration order.
    pub fn into_types(self) -> Vec<Arc<dyn PluginType>> {
        self.types
    }
}
