//! Gating policy: decides whether a load attempt actually activates.
//!
//! Two inputs are combined: the externally configured exclusion set and the
//! plugin's own self-reported enable flag. The self-flag always wins; a
//! caller asking to load disabled plugins only lifts the exclusion set.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Why activation was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Identifier or directory is in the exclusion set.
    ExternallyDisabled,
    /// The plugin declared itself disabled.
    SelfDisabled,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExternallyDisabled => write!(f, "disabled by configuration"),
            Self::SelfDisabled => write!(f, "disabled by its own settings"),
        }
    }
}

/// Identifiers and directory names treated as disabled by default.
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    names: HashSet<String>,
}

impl ExclusionSet {
    /// Builds the set from configured names.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether the identifier or the directory name is excluded.
    pub fn excludes(&self, id: &str, directory: Option<&str>) -> bool {
        self.names.contains(id) || directory.is_some_and(|d| self.names.contains(d))
    }

    /// Number of configured names.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Combines the exclusion set with a plugin's self-flag.
#[derive(Debug, Clone, Default)]
pub struct GatingPolicy {
    exclusions: ExclusionSet,
}

impl GatingPolicy {
    /// Creates a policy over the given exclusion set.
    pub fn new(exclusions: ExclusionSet) -> Self {
        Self { exclusions }
    }

    /// Whether the exclusion set applies to this plugin for a bulk load.
    ///
    /// Always `false` when the caller asked to load disabled plugins.
    pub fn is_externally_disabled(
        &self,
        id: &str,
        directory: Option<&str>,
        load_disabled: bool,
    ) -> bool {
        !load_disabled && self.exclusions.excludes(id, directory)
    }

    /// Returns the reason activation must be skipped, or `None` to proceed.
    pub fn evaluate(
        &self,
        id: &str,
        directory: Option<&str>,
        self_enabled: bool,
        load_disabled: bool,
    ) -> Option<SkipReason> {
        let reason = if !self_enabled {
            Some(SkipReason::SelfDisabled)
        } else if self.is_externally_disabled(id, directory, load_disabled) {
            Some(SkipReason::ExternallyDisabled)
        } else {
            None
        };

        if let Some(reason) = reason {
            debug!(plugin_id = %id, reason = %reason, "Gating policy skips plugin");
        }
        reason
    }

    /// Boolean form of [`GatingPolicy::evaluate`].
    pub fn should_skip(
        &self,
        id: &str,
        directory: Option<&str>,
        self_enabled: bool,
        load_disabled: bool,
    ) -> bool {
        self.evaluate(id, directory, self_enabled, load_disabled)
            .is_some()
    }
}
