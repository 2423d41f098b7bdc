//! Entity provenance tags.

use std::fmt;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::url::VirtualFileUrl;

/// Describes where an entity's data originated.
///
/// Two entities loaded from different sources can still hold the same data;
/// consumers that must treat them as equal compare with
/// `equals_ignoring_entity_source`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EntitySource {
    /// Loaded from a project configuration file.
    ProjectFile {
        /// Url of the file.
        url: VirtualFileUrl,
    },
    /// Imported by an external build system.
    ExternalSystem {
        /// Identifier of the build system, e.g. `"Gradle"`.
        system_id: Arc<str>,
    },
    /// Created at runtime and never saved.
    NonPersistent,
    /// A custom provenance label.
    Named(Arc<str>),
}

impl EntitySource {
    /// Creates a project file source.
    #[must_use]
    pub fn project_file(url: VirtualFileUrl) -> Self {
        Self::ProjectFile { url }
    }

    /// Creates an external system source.
    #[must_use]
    pub fn external(system_id: &str) -> Self {
        Self::ExternalSystem {
            system_id: Arc::from(system_id),
        }
    }

    /// Creates a custom named source.
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self::Named(Arc::from(name))
    }

    /// Returns the backing file, if the source has one.
    #[must_use]
    pub fn virtual_file_url(&self) -> Option<&VirtualFileUrl> {
        match self {
            Self::ProjectFile { url } => Some(url),
            _ => None,
        }
    }

    /// Returns false for sources whose entities are never saved.
    #[must_use]
    pub const fn is_persistent(&self) -> bool {
        !matches!(self, Self::NonPersistent)
    }
}

impl fmt::Debug for EntitySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for EntitySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProjectFile { url } => write!(f, "file:{url}"),
            Self::ExternalSystem { system_id } => write!(f, "external:{system_id}"),
            Self::NonPersistent => write!(f, "non-persistent"),
            Self::Named(name) => write!(f, "{name}"),
        }
    }
}
