//! Artifacts and their custom properties.

use std::sync::LazyLock;

use workspace_model_foundation::{
    EntitySource, FieldType, PersistentId, Result, Value, VirtualFileUrl,
};
use workspace_model_storage::{
    ConnectionId, ConnectionSchema, ConnectionType, EntityBuilder, EntityData, EntitySchema,
    FieldSchema,
};

use crate::ids::{ARTIFACT_ID, artifact_id};
use crate::packaging::{
    ARTIFACT_OUTPUT_ELEMENT_LINK, ArtifactOutputPackagingElementEntity,
    CompositePackagingElementEntity,
};
use crate::typed::{TypedEntity, cast_all, typed_entity};

/// Artifact → its root packaging element.
pub const ARTIFACT_ROOT_ELEMENT: ConnectionId = ConnectionId::new(
    "ArtifactEntity",
    "CompositePackagingElementEntity",
    ConnectionType::AbstractOneToOne,
    true,
);

/// Artifact → its custom properties.
pub const ARTIFACT_CUSTOM_PROPERTIES: ConnectionId = ConnectionId::new(
    "ArtifactEntity",
    "ArtifactPropertiesEntity",
    ConnectionType::OneToMany,
    false,
);

fn artifact_pid(data: &EntityData) -> Result<PersistentId> {
    Ok(PersistentId::new(ARTIFACT_ID, [data.get("name")?.clone()]))
}

/// Schema of `ArtifactEntity`.
pub static ARTIFACT: LazyLock<EntitySchema> = LazyLock::new(|| {
    EntitySchema::new("ArtifactEntity")
        .with_field(FieldSchema::required("name", FieldType::String))
        .with_field(FieldSchema::required("artifactType", FieldType::String))
        .with_field(
            FieldSchema::optional("includeInProjectBuild", FieldType::Bool)
                .with_default(Value::Bool(false)),
        )
        .with_field(FieldSchema::optional("outputUrl", FieldType::option(FieldType::Url)).indexed())
        .with_connection(ConnectionSchema::child("rootElement", ARTIFACT_ROOT_ELEMENT).required())
        .with_connection(ConnectionSchema::children("customProperties", ARTIFACT_CUSTOM_PROPERTIES))
        .with_persistent_id(artifact_pid)
});

/// Schema of `ArtifactPropertiesEntity`.
pub static ARTIFACT_PROPERTIES: LazyLock<EntitySchema> = LazyLock::new(|| {
    EntitySchema::new("ArtifactPropertiesEntity")
        .with_field(FieldSchema::required("providerType", FieldType::String))
        .with_field(FieldSchema::optional(
            "propertiesXmlTag",
            FieldType::option(FieldType::String),
        ))
        .with_connection(ConnectionSchema::parent("artifact", ARTIFACT_CUSTOM_PROPERTIES))
});

typed_entity! {
    /// A build artifact and its packaging layout.
    ArtifactEntity => "ArtifactEntity"
}

impl<'s> ArtifactEntity<'s> {
    /// Starts a builder. The root element must still be set before adding.
    ///
    /// # Errors
    ///
    /// Propagates builder errors.
    pub fn builder(name: &str, artifact_type: &str, source: EntitySource) -> Result<EntityBuilder> {
        EntityBuilder::new(&ARTIFACT)
            .with_source(source)?
            .with("name", name)?
            .with("artifactType", artifact_type)
    }

    /// Returns the artifact name.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is not a string.
    pub fn name(&self) -> Result<&'s str> {
        self.0.get_str("name")
    }

    /// Returns the artifact type id, e.g. `"jar"`.
    ///
    /// # Errors
    ///
    /// Returns an error if the field is not a string.
    pub fn artifact_type(&self) -> Result<&'s str> {
        self.0.get_str("artifactType")
    }

    /// Returns true if the artifact is built with the project.
    #[must_use]
    pub fn include_in_project_build(&self) -> bool {
        self.0
            .get("includeInProjectBuild")
            .ok()
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Returns the output directory, if set.
    #[must_use]
    pub fn output_url(&self) -> Option<&'s VirtualFileUrl> {
        self.0.get("outputUrl").ok().and_then(Value::as_url)
    }

    /// Returns `ArtifactId(name)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is not a string.
    pub fn persistent_id(&self) -> Result<PersistentId> {
        Ok(artifact_id(self.name()?))
    }

    /// Returns the root packaging element.
    ///
    /// # Errors
    ///
    /// Returns an error if the relationship table holds a dead id.
    pub fn root_element(&self) -> Result<Option<CompositePackagingElementEntity<'s>>> {
        Ok(self
            .0
            .child("rootElement")?
            .and_then(CompositePackagingElementEntity::cast))
    }

    /// Returns the output packaging element attached to this artifact, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the relationship table holds a dead id.
    pub fn artifact_output_packaging_element(
        &self,
    ) -> Result<Option<ArtifactOutputPackagingElementEntity<'s>>> {
        Ok(self
            .0
            .ext_child(ARTIFACT_OUTPUT_ELEMENT_LINK)?
            .and_then(ArtifactOutputPackagingElementEntity::cast))
    }

    /// Returns the custom properties in order.
    ///
    /// # Errors
    ///
    /// Returns an error if the relationship table holds a dead id.
    pub fn custom_properties(&self) -> Result<Vec<ArtifactPropertiesEntity<'s>>> {
        Ok(cast_all(self.0.children("customProperties")?))
    }
}

typed_entity! {
    /// Properties contributed to an artifact by one provider.
    ArtifactPropertiesEntity => "ArtifactPropertiesEntity"
}

impl<'s> ArtifactPropertiesEntity<'s> {
    /// Starts a builder.
    ///
    /// # Errors
    ///
    /// Propagates builder errors.
    pub fn builder(provider_type: &str, source: EntitySource) -> Result<EntityBuilder> {
        EntityBuilder::new(&ARTIFACT_PROPERTIES)
            .with_source(source)?
            .with("providerType", provider_type)
    }

    /// Returns the provider id.
    ///
    /// # Errors
    ///
    /// Returns an error if the field is not a string.
    pub fn provider_type(&self) -> Result<&'s str> {
        self.0.get_str("providerType")
    }

    /// Returns the serialized properties, if any.
    #[must_use]
    pub fn properties_xml_tag(&self) -> Option<&'s str> {
        self.0.get("propertiesXmlTag").ok().and_then(Value::as_str)
    }

    /// Returns the owning artifact.
    ///
    /// # Errors
    ///
    /// Returns an error if the relationship table holds a dead id.
    pub fn artifact(&self) -> Result<Option<ArtifactEntity<'s>>> {
        Ok(self.0.parent("artifact")?.and_then(ArtifactEntity::cast))
    }
}
