//! Persistent ids and record values shared by the project-model entities.

use workspace_model_foundation::{PersistentId, Record, Value, VirtualFileUrl};

/// Kind of the persistent id of a module.
pub const MODULE_ID: &str = "ModuleId";
/// Kind of the persistent id of a library.
pub const LIBRARY_ID: &str = "LibraryId";
/// Kind of the persistent id of an artifact.
pub const ARTIFACT_ID: &str = "ArtifactId";

/// Record name of [`LibraryTableId`] values.
pub const LIBRARY_TABLE_ID: &str = "LibraryTableId";
/// Record name of [`LibraryRoot`] values.
pub const LIBRARY_ROOT: &str = "LibraryRoot";

/// `ModuleId(name)`.
#[must_use]
pub fn module_id(name: &str) -> PersistentId {
    PersistentId::new(MODULE_ID, [Value::from(name)])
}

/// `LibraryId(name, tableId)`.
#[must_use]
pub fn library_id(name: &str, table: &LibraryTableId) -> PersistentId {
    PersistentId::new(LIBRARY_ID, [Value::from(name), table.to_value()])
}

/// `ArtifactId(name)`.
#[must_use]
pub fn artifact_id(name: &str) -> PersistentId {
    PersistentId::new(ARTIFACT_ID, [Value::from(name)])
}

/// The table a library is declared in.
///
/// Module-level tables refer to their module by persistent id, so renaming
/// a module renames the ids of its libraries.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum LibraryTableId {
    /// Project-level library table.
    Project,
    /// Application-level table of the given level, e.g. `"application"`.
    Global(String),
    /// Library table of one module.
    Module(PersistentId),
}

impl LibraryTableId {
    /// Encodes the table id as a record value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Project => Value::record(LIBRARY_TABLE_ID, [("level", Value::from("project"))]),
            Self::Global(level) => {
                Value::record(LIBRARY_TABLE_ID, [("level", Value::from(level.as_str()))])
            }
            Self::Module(module) => Value::record(
                LIBRARY_TABLE_ID,
                [
                    ("level", Value::from("module")),
                    ("moduleId", Value::from(module.clone())),
                ],
            ),
        }
    }

    /// Decodes a record value written by [`to_value`](Self::to_value).
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let record = value.as_record()?;
        if record.name() != LIBRARY_TABLE_ID {
            return None;
        }
        match record.get("level")?.as_str()? {
            "project" => Some(Self::Project),
            "module" => record.get("moduleId")?.as_id().cloned().map(Self::Module),
            level => Some(Self::Global(level.to_string())),
        }
    }
}

impl From<LibraryTableId> for Value {
    fn from(table: LibraryTableId) -> Self {
        table.to_value()
    }
}

/// One root of a library: a url and the kind of files it holds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LibraryRoot {
    /// Root url.
    pub url: VirtualFileUrl,
    /// Root type, e.g. `"CLASSES"` or `"SOURCES"`.
    pub root_type: String,
}

impl LibraryRoot {
    /// A root of compiled classes.
    #[must_use]
    pub fn classes(url: VirtualFileUrl) -> Self {
        Self {
            url,
            root_type: "CLASSES".to_string(),
        }
    }

    /// A root of sources.
    #[must_use]
    pub fn sources(url: VirtualFileUrl) -> Self {
        Self {
            url,
            root_type: "SOURCES".to_string(),
        }
    }

    /// Decodes a record value.
    #[must_use]
    pub fn from_record(record: &Record) -> Option<Self> {
        if record.name() != LIBRARY_ROOT {
            return None;
        }
        Some(Self {
            url: record.get("url")?.as_url()?.clone(),
            root_type: record.get("type")?.as_str()?.to_string(),
        })
    }
}

impl From<LibraryRoot> for Value {
    fn from(root: LibraryRoot) -> Self {
        Value::record(
            LIBRARY_ROOT,
            [
                ("url", Value::from(root.url)),
                ("type", Value::from(root.root_type)),
            ],
        )
    }
}
