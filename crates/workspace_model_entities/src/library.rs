//! Libraries, their sdks, and library properties.

use std::sync::LazyLock;

use workspace_model_foundation::{
    EntitySource, Error, FieldType, PersistentId, Result, Value, VirtualFileUrl,
};
use workspace_model_storage::{
    ConnectionId, ConnectionSchema, ConnectionType, EntityBuilder, EntityData, EntitySchema,
    FieldSchema,
};

use crate::ids::{LIBRARY_ID, LIBRARY_ROOT, LIBRARY_TABLE_ID, LibraryRoot, LibraryTableId, library_id};
use crate::packaging::{LIBRARY_FILES_ELEMENT, LibraryFilesPackagingElementEntity};
use crate::typed::{TypedEntity, typed_entity};

/// Library → its sdk.
pub const LIBRARY_SDK: ConnectionId =
    ConnectionId::new("LibraryEntity", "SdkEntity", ConnectionType::OneToOne, false);

/// Library → its properties.
pub const LIBRARY_PROPERTIES: ConnectionId = ConnectionId::new(
    "LibraryEntity",
    "LibraryPropertiesEntity",
    ConnectionType::OneToOne,
    false,
);

fn library_pid(data: &EntityData) -> Result<PersistentId> {
    Ok(PersistentId::new(
        LIBRARY_ID,
        [data.get("name")?.clone(), data.get("tableId")?.clone()],
    ))
}

/// Schema of `LibraryEntity`.
pub static LIBRARY: LazyLock<EntitySchema> = LazyLock::new(|| {
    EntitySchema::new("LibraryEntity")
        .with_field(FieldSchema::required("name", FieldType::String))
        .with_field(FieldSchema::required("tableId", FieldType::Record(LIBRARY_TABLE_ID)))
        .with_field(
            FieldSchema::required("roots", FieldType::list(FieldType::Record(LIBRARY_ROOT))).indexed(),
        )
        .with_field(FieldSchema::required("excludedRoots", FieldType::list(FieldType::Url)).indexed())
        .with_connection(ConnectionSchema::child("sdk", LIBRARY_SDK))
        .with_connection(ConnectionSchema::child("libraryProperties", LIBRARY_PROPERTIES))
        .with_persistent_id(library_pid)
});

/// Schema of `SdkEntity`.
pub static SDK: LazyLock<EntitySchema> = LazyLock::new(|| {
    EntitySchema::new("SdkEntity")
        .with_field(FieldSchema::required("homeUrl", FieldType::Url).indexed())
        .with_connection(ConnectionSchema::parent("library", LIBRARY_SDK))
});

/// Schema of `LibraryPropertiesEntity`.
pub static LIBRARY_PROPERTIES_SCHEMA: LazyLock<EntitySchema> = LazyLock::new(|| {
    EntitySchema::new("LibraryPropertiesEntity")
        .with_field(FieldSchema::required("libraryType", FieldType::String))
        .with_field(FieldSchema::optional(
            "propertiesXmlTag",
            FieldType::option(FieldType::String),
        ))
        .with_connection(ConnectionSchema::parent("library", LIBRARY_PROPERTIES))
});

typed_entity! {
    /// A library in a project, global, or module library table.
    LibraryEntity => "LibraryEntity"
}

impl<'s> LibraryEntity<'s> {
    /// Starts a builder with every required field set.
    ///
    /// # Errors
    ///
    /// Propagates builder errors.
    pub fn builder(
        name: &str,
        table: &LibraryTableId,
        roots: Vec<LibraryRoot>,
        excluded_roots: Vec<VirtualFileUrl>,
        source: EntitySource,
    ) -> Result<EntityBuilder> {
        EntityBuilder::new(&LIBRARY)
            .with_source(source)?
            .with("name", name)?
            .with("tableId", table.to_value())?
            .with("roots", Value::list(roots.into_iter().map(Value::from)))?
            .with("excludedRoots", Value::list(excluded_roots.into_iter().map(Value::from)))
    }

    /// Returns the library name.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is not a string.
    pub fn name(&self) -> Result<&'s str> {
        self.0.get_str("name")
    }

    /// Returns the table the library is declared in.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` if the field does not hold a table id.
    pub fn table_id(&self) -> Result<LibraryTableId> {
        let value = self.0.get("tableId")?;
        LibraryTableId::from_value(value).ok_or_else(|| {
            Error::type_mismatch(
                self.0.entity_type(),
                "tableId",
                FieldType::Record(LIBRARY_TABLE_ID),
                value.type_name().to_string(),
            )
        })
    }

    /// Returns `LibraryId(name, tableId)`.
    ///
    /// # Errors
    ///
    /// Returns an error if either component is malformed.
    pub fn persistent_id(&self) -> Result<PersistentId> {
        Ok(library_id(self.name()?, &self.table_id()?))
    }

    /// Returns the roots in order.
    ///
    /// # Errors
    ///
    /// Returns an error if the field is not a list of roots.
    pub fn roots(&self) -> Result<Vec<LibraryRoot>> {
        self.0
            .get_list("roots")?
            .iter()
            .map(|value| {
                value
                    .as_record()
                    .and_then(LibraryRoot::from_record)
                    .ok_or_else(|| {
                        Error::type_mismatch(
                            self.0.entity_type(),
                            "roots",
                            FieldType::Record(LIBRARY_ROOT),
                            value.type_name().to_string(),
                        )
                    })
            })
            .collect()
    }

    /// Returns the excluded roots.
    ///
    /// # Errors
    ///
    /// Returns an error if the field is not a list.
    pub fn excluded_roots(&self) -> Result<Vec<VirtualFileUrl>> {
        Ok(self
            .0
            .get_list("excludedRoots")?
            .iter()
            .filter_map(Value::as_url)
            .cloned()
            .collect())
    }

    /// Returns the sdk, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the relationship table holds a dead id.
    pub fn sdk(&self) -> Result<Option<SdkEntity<'s>>> {
        Ok(self.0.child("sdk")?.and_then(SdkEntity::cast))
    }

    /// Returns the library properties, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the relationship table holds a dead id.
    pub fn library_properties(&self) -> Result<Option<LibraryPropertiesEntity<'s>>> {
        Ok(self
            .0
            .child("libraryProperties")?
            .and_then(LibraryPropertiesEntity::cast))
    }

    /// Returns the packaging element attached to this library, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the relationship table holds a dead id.
    pub fn library_files_element(&self) -> Result<Option<LibraryFilesPackagingElementEntity<'s>>> {
        Ok(self
            .0
            .ext_child(LIBRARY_FILES_ELEMENT)?
            .and_then(LibraryFilesPackagingElementEntity::cast))
    }
}

typed_entity! {
    /// Sdk attached to a library.
    SdkEntity => "SdkEntity"
}

impl<'s> SdkEntity<'s> {
    /// Starts a builder.
    ///
    /// # Errors
    ///
    /// Propagates builder errors.
    pub fn builder(home_url: VirtualFileUrl, source: EntitySource) -> Result<EntityBuilder> {
        EntityBuilder::new(&SDK)
            .with_source(source)?
            .with("homeUrl", home_url)
    }

    /// Returns the sdk home.
    ///
    /// # Errors
    ///
    /// Returns an error if the field does not hold a url.
    pub fn home_url(&self) -> Result<&'s VirtualFileUrl> {
        self.0.get_url("homeUrl")
    }

    /// Returns the owning library.
    ///
    /// # Errors
    ///
    /// Returns an error if the relationship table holds a dead id.
    pub fn library(&self) -> Result<Option<LibraryEntity<'s>>> {
        Ok(self.0.parent("library")?.and_then(LibraryEntity::cast))
    }
}

typed_entity! {
    /// Kind-specific properties of a library.
    LibraryPropertiesEntity => "LibraryPropertiesEntity"
}

impl<'s> LibraryPropertiesEntity<'s> {
    /// Starts a builder.
    ///
    /// # Errors
    ///
    /// Propagates builder errors.
    pub fn builder(library_type: &str, source: EntitySource) -> Result<EntityBuilder> {
        EntityBuilder::new(&LIBRARY_PROPERTIES_SCHEMA)
            .with_source(source)?
            .with("libraryType", library_type)
    }

    /// Returns the library kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the field is not a string.
    pub fn library_type(&self) -> Result<&'s str> {
        self.0.get_str("libraryType")
    }

    /// Returns the serialized properties, if any.
    #[must_use]
    pub fn properties_xml_tag(&self) -> Option<&'s str> {
        self.0.get("propertiesXmlTag").ok().and_then(Value::as_str)
    }

    /// Returns the owning library.
    ///
    /// # Errors
    ///
    /// Returns an error if the relationship table holds a dead id.
    pub fn library(&self) -> Result<Option<LibraryEntity<'s>>> {
        Ok(self.0.parent("library")?.and_then(LibraryEntity::cast))
    }
}
