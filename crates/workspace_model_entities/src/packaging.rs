//! Packaging elements: the tree describing an artifact's layout.
//!
//! The hierarchy is rooted at the abstract `PackagingElementEntity`.
//! Composite elements (`ArtifactRootElementEntity`,
//! `DirectoryPackagingElementEntity`) hold an ordered list of child elements
//! of any kind. Leaves copy files or pull in the output of a library or
//! another artifact, which they name by persistent id.

use std::sync::LazyLock;

use workspace_model_foundation::{
    EntitySource, FieldType, PersistentId, Result, Value, VirtualFileUrl,
};
use workspace_model_storage::{
    ConnectionId, ConnectionSchema, ConnectionType, EntityBuilder, EntitySchema, ExtRefKey,
    FieldSchema,
};

use crate::artifact::{ARTIFACT_ROOT_ELEMENT, ArtifactEntity};
use crate::ids::{ARTIFACT_ID, LIBRARY_ID};
use crate::library::LibraryEntity;
use crate::typed::{TypedEntity, cast_all, typed_entity};

const PACKAGING_ELEMENT: &str = "PackagingElementEntity";
const COMPOSITE_PACKAGING_ELEMENT: &str = "CompositePackagingElementEntity";

const COMPOSITE_SUPERTYPES: &[&str] = &[COMPOSITE_PACKAGING_ELEMENT, PACKAGING_ELEMENT];
const LEAF_SUPERTYPES: &[&str] = &[PACKAGING_ELEMENT];

/// Composite element → its children, of any element kind.
pub const COMPOSITE_CHILDREN: ConnectionId = ConnectionId::new(
    COMPOSITE_PACKAGING_ELEMENT,
    PACKAGING_ELEMENT,
    ConnectionType::AbstractOneToMany,
    true,
);

/// Library → the element packaging its files. Owned: the element is
/// removed with its library.
pub const LIBRARY_FILES_ELEMENT: ConnectionId = ConnectionId::new(
    "LibraryEntity",
    "LibraryFilesPackagingElementEntity",
    ConnectionType::OneToOne,
    false,
);

/// Extension field `LibraryEntity#libraryFilesPackagingElement`.
pub const LIBRARY_FILES_KEY: ExtRefKey = ExtRefKey::child(
    "LibraryFilesPackagingElementEntity",
    "libraryFilesPackagingElement",
    LIBRARY_FILES_ELEMENT,
);

/// Artifact → the element packaging its output. Owned: the element is
/// removed with its artifact.
pub const ARTIFACT_OUTPUT_ELEMENT_LINK: ConnectionId = ConnectionId::new(
    "ArtifactEntity",
    "ArtifactOutputPackagingElementEntity",
    ConnectionType::OneToOne,
    false,
);

/// Extension field `ArtifactEntity#artifactOutputPackagingElement`.
pub const ARTIFACT_OUTPUT_KEY: ExtRefKey = ExtRefKey::child(
    "ArtifactOutputPackagingElementEntity",
    "artifactOutputPackagingElement",
    ARTIFACT_OUTPUT_ELEMENT_LINK,
);

fn composite(name: &'static str) -> EntitySchema {
    EntitySchema::new(name)
        .with_supertypes(COMPOSITE_SUPERTYPES)
        .with_connection(ConnectionSchema::children("children", COMPOSITE_CHILDREN))
        .with_connection(ConnectionSchema::parent("parentEntity", COMPOSITE_CHILDREN))
        .with_connection(ConnectionSchema::parent("artifact", ARTIFACT_ROOT_ELEMENT))
}

fn leaf(name: &'static str) -> EntitySchema {
    EntitySchema::new(name)
        .with_supertypes(LEAF_SUPERTYPES)
        .with_connection(ConnectionSchema::parent("parentEntity", COMPOSITE_CHILDREN))
}

/// Schema of `ArtifactRootElementEntity`.
pub static ARTIFACT_ROOT_ELEMENT_SCHEMA: LazyLock<EntitySchema> =
    LazyLock::new(|| composite("ArtifactRootElementEntity"));

/// Schema of `DirectoryPackagingElementEntity`.
pub static DIRECTORY_ELEMENT: LazyLock<EntitySchema> = LazyLock::new(|| {
    composite("DirectoryPackagingElementEntity")
        .with_field(FieldSchema::required("directoryName", FieldType::String))
});

/// Schema of `FileCopyPackagingElementEntity`.
pub static FILE_COPY_ELEMENT: LazyLock<EntitySchema> = LazyLock::new(|| {
    leaf("FileCopyPackagingElementEntity")
        .with_field(FieldSchema::required("filePath", FieldType::Url).indexed())
        .with_field(FieldSchema::optional(
            "renamedOutputFileName",
            FieldType::option(FieldType::String),
        ))
});

/// Schema of `LibraryFilesPackagingElementEntity`.
pub static LIBRARY_FILES_ELEMENT_SCHEMA: LazyLock<EntitySchema> = LazyLock::new(|| {
    leaf("LibraryFilesPackagingElementEntity")
        .with_field(FieldSchema::optional(
            "libraryId",
            FieldType::option(FieldType::Id(LIBRARY_ID)),
        ))
});

/// Schema of `ArtifactOutputPackagingElementEntity`.
pub static ARTIFACT_OUTPUT_ELEMENT: LazyLock<EntitySchema> = LazyLock::new(|| {
    leaf("ArtifactOutputPackagingElementEntity").with_field(FieldSchema::optional(
        "artifactId",
        FieldType::option(FieldType::Id(ARTIFACT_ID)),
    ))
});

fn link(id: Option<PersistentId>) -> Value {
    id.map_or(Value::Null, Value::from)
}

typed_entity! {
    /// Any packaging element.
    PackagingElementEntity => "PackagingElementEntity"
}

impl<'s> PackagingElementEntity<'s> {
    /// Returns the composite element holding this one.
    ///
    /// # Errors
    ///
    /// Returns an error if the relationship table holds a dead id.
    pub fn parent_entity(&self) -> Result<Option<CompositePackagingElementEntity<'s>>> {
        Ok(self
            .0
            .ext_parent(COMPOSITE_CHILDREN)?
            .and_then(CompositePackagingElementEntity::cast))
    }

    /// Returns true if this element holds children.
    #[must_use]
    pub fn is_composite(&self) -> bool {
        self.0.data().schema().is_subtype_of(COMPOSITE_PACKAGING_ELEMENT)
    }
}

typed_entity! {
    /// A packaging element holding an ordered list of child elements.
    CompositePackagingElementEntity => "CompositePackagingElementEntity"
}

impl<'s> CompositePackagingElementEntity<'s> {
    /// Returns the child elements in order.
    ///
    /// # Errors
    ///
    /// Returns an error if the relationship table holds a dead id.
    pub fn children(&self) -> Result<Vec<PackagingElementEntity<'s>>> {
        Ok(cast_all(self.0.ext_children(COMPOSITE_CHILDREN)?))
    }

    /// Returns the artifact this element is the root of.
    ///
    /// # Errors
    ///
    /// Returns an error if the relationship table holds a dead id.
    pub fn artifact(&self) -> Result<Option<ArtifactEntity<'s>>> {
        Ok(self
            .0
            .ext_parent(ARTIFACT_ROOT_ELEMENT)?
            .and_then(ArtifactEntity::cast))
    }

    /// Views this composite as a plain element.
    #[must_use]
    pub fn as_element(&self) -> PackagingElementEntity<'s> {
        PackagingElementEntity::wrap(self.0)
    }
}

typed_entity! {
    /// Root of an artifact's packaging tree.
    ArtifactRootElementEntity => "ArtifactRootElementEntity"
}

impl ArtifactRootElementEntity<'_> {
    /// Starts a builder.
    ///
    /// # Errors
    ///
    /// Propagates builder errors.
    pub fn builder(source: EntitySource) -> Result<EntityBuilder> {
        EntityBuilder::new(&ARTIFACT_ROOT_ELEMENT_SCHEMA).with_source(source)
    }
}

typed_entity! {
    /// A directory in the artifact layout.
    DirectoryPackagingElementEntity => "DirectoryPackagingElementEntity"
}

impl<'s> DirectoryPackagingElementEntity<'s> {
    /// Starts a builder.
    ///
    /// # Errors
    ///
    /// Propagates builder errors.
    pub fn builder(directory_name: &str, source: EntitySource) -> Result<EntityBuilder> {
        EntityBuilder::new(&DIRECTORY_ELEMENT)
            .with_source(source)?
            .with("directoryName", directory_name)
    }

    /// Returns the directory name.
    ///
    /// # Errors
    ///
    /// Returns an error if the field is not a string.
    pub fn directory_name(&self) -> Result<&'s str> {
        self.0.get_str("directoryName")
    }
}

typed_entity! {
    /// Copies one file into the layout.
    FileCopyPackagingElementEntity => "FileCopyPackagingElementEntity"
}

impl<'s> FileCopyPackagingElementEntity<'s> {
    /// Starts a builder.
    ///
    /// # Errors
    ///
    /// Propagates builder errors.
    pub fn builder(file_path: VirtualFileUrl, source: EntitySource) -> Result<EntityBuilder> {
        EntityBuilder::new(&FILE_COPY_ELEMENT)
            .with_source(source)?
            .with("filePath", file_path)
    }

    /// Returns the copied file.
    ///
    /// # Errors
    ///
    /// Returns an error if the field does not hold a url.
    pub fn file_path(&self) -> Result<&'s VirtualFileUrl> {
        self.0.get_url("filePath")
    }

    /// Returns the name of the file in the output, if renamed.
    #[must_use]
    pub fn renamed_output_file_name(&self) -> Option<&'s str> {
        self.0
            .get("renamedOutputFileName")
            .ok()
            .and_then(Value::as_str)
    }
}

typed_entity! {
    /// Packs the files of a library.
    LibraryFilesPackagingElementEntity => "LibraryFilesPackagingElementEntity"
}

impl<'s> LibraryFilesPackagingElementEntity<'s> {
    /// Starts a builder linking to a library by persistent id.
    ///
    /// # Errors
    ///
    /// Propagates builder errors.
    pub fn builder(library: Option<PersistentId>, source: EntitySource) -> Result<EntityBuilder> {
        EntityBuilder::new(&LIBRARY_FILES_ELEMENT_SCHEMA)
            .with_source(source)?
            .with("libraryId", link(library))
    }

    /// Returns the soft link to the packed library.
    #[must_use]
    pub fn library_id(&self) -> Option<&'s PersistentId> {
        self.0.get("libraryId").ok().and_then(Value::as_id)
    }

    /// Returns the library this element was attached to.
    ///
    /// # Errors
    ///
    /// Returns an error if the relationship table holds a dead id.
    pub fn library(&self) -> Result<Option<LibraryEntity<'s>>> {
        Ok(self
            .0
            .ext_parent(LIBRARY_FILES_ELEMENT)?
            .and_then(LibraryEntity::cast))
    }
}

typed_entity! {
    /// Packs the output of another artifact.
    ArtifactOutputPackagingElementEntity => "ArtifactOutputPackagingElementEntity"
}

impl<'s> ArtifactOutputPackagingElementEntity<'s> {
    /// Starts a builder linking to an artifact by persistent id.
    ///
    /// # Errors
    ///
    /// Propagates builder errors.
    pub fn builder(artifact: Option<PersistentId>, source: EntitySource) -> Result<EntityBuilder> {
        EntityBuilder::new(&ARTIFACT_OUTPUT_ELEMENT)
            .with_source(source)?
            .with("artifactId", link(artifact))
    }

    /// Returns the soft link to the packed artifact.
    #[must_use]
    pub fn artifact_id(&self) -> Option<&'s PersistentId> {
        self.0.get("artifactId").ok().and_then(Value::as_id)
    }

    /// Returns the artifact this element was attached to.
    ///
    /// # Errors
    ///
    /// Returns an error if the relationship table holds a dead id.
    pub fn artifact(&self) -> Result<Option<ArtifactEntity<'s>>> {
        Ok(self
            .0
            .ext_parent(ARTIFACT_OUTPUT_ELEMENT_LINK)?
            .and_then(ArtifactEntity::cast))
    }
}
