//! Modules, their source roots, and custom source root properties.

use std::sync::LazyLock;

use workspace_model_foundation::{EntitySource, FieldType, PersistentId, Result, Value, VirtualFileUrl};
use workspace_model_storage::{
    ConnectionId, ConnectionSchema, ConnectionType, EntityBuilder, EntityData, EntitySchema,
    FieldSchema,
};

use crate::ids::{MODULE_ID, module_id};
use crate::typed::{TypedEntity, cast_all, typed_entity};

/// Module → its source roots.
pub const MODULE_SOURCE_ROOTS: ConnectionId =
    ConnectionId::new("ModuleEntity", "SourceRootEntity", ConnectionType::OneToMany, false);

/// Source root → its custom properties.
pub const SOURCE_ROOT_CUSTOM_PROPERTIES: ConnectionId = ConnectionId::new(
    "SourceRootEntity",
    "CustomSourceRootPropertiesEntity",
    ConnectionType::OneToOne,
    false,
);

fn module_pid(data: &EntityData) -> Result<PersistentId> {
    let name = data.get("name")?;
    Ok(PersistentId::new(MODULE_ID, [name.clone()]))
}

/// Schema of `ModuleEntity`.
pub static MODULE: LazyLock<EntitySchema> = LazyLock::new(|| {
    EntitySchema::new("ModuleEntity")
        .with_field(FieldSchema::required("name", FieldType::String))
        .with_field(FieldSchema::optional("moduleType", FieldType::option(FieldType::String)))
        .with_connection(ConnectionSchema::children("sourceRoots", MODULE_SOURCE_ROOTS))
        .with_persistent_id(module_pid)
});

/// Schema of `SourceRootEntity`.
pub static SOURCE_ROOT: LazyLock<EntitySchema> = LazyLock::new(|| {
    EntitySchema::new("SourceRootEntity")
        .with_field(FieldSchema::required("url", FieldType::Url).indexed())
        .with_field(FieldSchema::required("rootType", FieldType::String))
        .with_connection(ConnectionSchema::parent("module", MODULE_SOURCE_ROOTS))
        .with_connection(ConnectionSchema::child(
            "customSourceRootProperties",
            SOURCE_ROOT_CUSTOM_PROPERTIES,
        ))
});

/// Schema of `CustomSourceRootPropertiesEntity`.
pub static CUSTOM_SOURCE_ROOT_PROPERTIES: LazyLock<EntitySchema> = LazyLock::new(|| {
    EntitySchema::new("CustomSourceRootPropertiesEntity")
        .with_field(FieldSchema::required("propertiesXmlTag", FieldType::String))
        .with_connection(ConnectionSchema::parent("sourceRoot", SOURCE_ROOT_CUSTOM_PROPERTIES))
});

typed_entity! {
    /// A module of the project.
    ModuleEntity => "ModuleEntity"
}

impl<'s> ModuleEntity<'s> {
    /// Starts a builder for a module.
    ///
    /// # Errors
    ///
    /// Propagates builder errors.
    pub fn builder(name: &str, source: EntitySource) -> Result<EntityBuilder> {
        EntityBuilder::new(&MODULE)
            .with_source(source)?
            .with("name", name)
    }

    /// Returns the module name.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is not a string.
    pub fn name(&self) -> Result<&'s str> {
        self.0.get_str("name")
    }

    /// Returns the module type, if any.
    #[must_use]
    pub fn module_type(&self) -> Option<&'s str> {
        self.0.get("moduleType").ok().and_then(Value::as_str)
    }

    /// Returns `ModuleId(name)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is not a string.
    pub fn persistent_id(&self) -> Result<PersistentId> {
        Ok(module_id(self.name()?))
    }

    /// Returns the source roots in order.
    ///
    /// # Errors
    ///
    /// Returns an error if the relationship table holds a dead id.
    pub fn source_roots(&self) -> Result<Vec<SourceRootEntity<'s>>> {
        Ok(cast_all(self.0.children("sourceRoots")?))
    }
}

typed_entity! {
    /// A content or source root of a module.
    SourceRootEntity => "SourceRootEntity"
}

impl<'s> SourceRootEntity<'s> {
    /// Starts a builder for a source root.
    ///
    /// # Errors
    ///
    /// Propagates builder errors.
    pub fn builder(url: VirtualFileUrl, root_type: &str, source: EntitySource) -> Result<EntityBuilder> {
        EntityBuilder::new(&SOURCE_ROOT)
            .with_source(source)?
            .with("url", url)?
            .with("rootType", root_type)
    }

    /// Returns the root url.
    ///
    /// # Errors
    ///
    /// Returns an error if the field does not hold a url.
    pub fn url(&self) -> Result<&'s VirtualFileUrl> {
        self.0.get_url("url")
    }

    /// Returns the root type, e.g. `"java-source"`.
    ///
    /// # Errors
    ///
    /// Returns an error if the field is not a string.
    pub fn root_type(&self) -> Result<&'s str> {
        self.0.get_str("rootType")
    }

    /// Returns the owning module.
    ///
    /// # Errors
    ///
    /// Returns an error if the relationship table holds a dead id.
    pub fn module(&self) -> Result<Option<ModuleEntity<'s>>> {
        Ok(self.0.parent("module")?.and_then(ModuleEntity::cast))
    }

    /// Returns the custom properties, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the relationship table holds a dead id.
    pub fn custom_properties(&self) -> Result<Option<CustomSourceRootPropertiesEntity<'s>>> {
        Ok(self
            .0
            .child("customSourceRootProperties")?
            .and_then(CustomSourceRootPropertiesEntity::cast))
    }
}

typed_entity! {
    /// Serialized properties of a source root of a custom type.
    CustomSourceRootPropertiesEntity => "CustomSourceRootPropertiesEntity"
}

impl<'s> CustomSourceRootPropertiesEntity<'s> {
    /// Starts a builder.
    ///
    /// # Errors
    ///
    /// Propagates builder errors.
    pub fn builder(properties_xml_tag: &str, source: EntitySource) -> Result<EntityBuilder> {
        EntityBuilder::new(&CUSTOM_SOURCE_ROOT_PROPERTIES)
            .with_source(source)?
            .with("propertiesXmlTag", properties_xml_tag)
    }

    /// Returns the serialized properties.
    ///
    /// # Errors
    ///
    /// Returns an error if the field is not a string.
    pub fn properties_xml_tag(&self) -> Result<&'s str> {
        self.0.get_str("propertiesXmlTag")
    }

    /// Returns the source root these properties belong to.
    ///
    /// # Errors
    ///
    /// Returns an error if the relationship table holds a dead id.
    pub fn source_root(&self) -> Result<Option<SourceRootEntity<'s>>> {
        Ok(self.0.parent("sourceRoot")?.and_then(SourceRootEntity::cast))
    }
}
