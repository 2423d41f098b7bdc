//! Project-model entities for the workspace model.
//!
//! This crate provides:
//! - Entity schemas for modules, libraries, sdks, artifacts, and packaging elements
//! - [`TypedEntity`] - Typed views over storage entities
//! - [`workspace_registry`] - A [`SchemaRegistry`] holding every schema of this crate
//!
//! Schemas are process-wide statics; the registry only references them.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod typed;

pub mod artifact;
pub mod ids;
pub mod library;
pub mod module;
pub mod packaging;

use workspace_model_foundation::Result;
use workspace_model_storage::{EntitySchema, SchemaRegistry, StorageConfig};

pub use artifact::{ArtifactEntity, ArtifactPropertiesEntity};
pub use ids::{LibraryRoot, LibraryTableId, artifact_id, library_id, module_id};
pub use library::{LibraryEntity, LibraryPropertiesEntity, SdkEntity};
pub use module::{CustomSourceRootPropertiesEntity, ModuleEntity, SourceRootEntity};
pub use packaging::{
    ArtifactOutputPackagingElementEntity, ArtifactRootElementEntity,
    CompositePackagingElementEntity, DirectoryPackagingElementEntity,
    FileCopyPackagingElementEntity, LibraryFilesPackagingElementEntity, PackagingElementEntity,
};
pub use typed::TypedEntity;

/// Returns every concrete entity schema of this crate.
#[must_use]
pub fn schemas() -> Vec<&'static EntitySchema> {
    vec![
        &*module::MODULE,
        &*module::SOURCE_ROOT,
        &*module::CUSTOM_SOURCE_ROOT_PROPERTIES,
        &*library::LIBRARY,
        &*library::SDK,
        &*library::LIBRARY_PROPERTIES_SCHEMA,
        &*artifact::ARTIFACT,
        &*artifact::ARTIFACT_PROPERTIES,
        &*packaging::ARTIFACT_ROOT_ELEMENT_SCHEMA,
        &*packaging::DIRECTORY_ELEMENT,
        &*packaging::FILE_COPY_ELEMENT,
        &*packaging::LIBRARY_FILES_ELEMENT_SCHEMA,
        &*packaging::ARTIFACT_OUTPUT_ELEMENT,
    ]
}

/// Loads every schema of this crate under the given configuration.
///
/// # Errors
///
/// Returns `IncompatibleGeneratedCode` if the configuration expects other
/// schema versions.
pub fn workspace_registry(config: StorageConfig) -> Result<SchemaRegistry> {
    SchemaRegistry::load(config, schemas())
}

#[cfg(test)]
pub(crate) fn test_storage() -> workspace_model_storage::MutableEntityStorage {
    match workspace_registry(StorageConfig::strict()) {
        Ok(registry) => workspace_model_storage::MutableEntityStorage::new(std::sync::Arc::new(registry)),
        Err(e) => panic!("workspace schemas do not load: {e}"),
    }
}
