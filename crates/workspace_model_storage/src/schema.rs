//! Schema descriptors for entity types.
//!
//! Schemas define the scalar fields and relationship slots of each entity
//! type. Builders, consistency checks and indices are all driven by them.
//! Schemas are process-wide `&'static` singletons, normally declared in a
//! `LazyLock` next to the typed entity façade that uses them.

use std::collections::BTreeMap;
use std::fmt;

use workspace_model_foundation::{Error, ErrorKind, FieldType, PersistentId, Result, Value};

use crate::config::{GENERATOR_API_VERSION, GENERATOR_IMPL_VERSION, StorageConfig};
use crate::connection::ConnectionId;
use crate::data::EntityData;

/// Computes the persistent id of an entity from its data.
pub type PersistentIdFn = fn(&EntityData) -> Result<PersistentId>;

/// Schema definition for one scalar field.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldSchema {
    /// Field name.
    pub name: &'static str,
    /// Field type.
    pub ty: FieldType,
    /// Whether the field must be set before the entity is committed.
    pub required: bool,
    /// Whether urls stored in this field are indexed.
    pub indexed: bool,
    /// Value read when an optional field is unset.
    pub default: Option<Value>,
}

impl FieldSchema {
    /// Creates a required field.
    #[must_use]
    pub fn required(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            required: true,
            indexed: false,
            default: None,
        }
    }

    /// Creates an optional field that reads as null while unset.
    #[must_use]
    pub fn optional(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            required: false,
            indexed: false,
            default: None,
        }
    }

    /// Sets the value read while the field is unset.
    #[must_use]
    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Marks the field's urls for the url index.
    #[must_use]
    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }
}

/// Which end of a connection a relationship slot holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RelationSide {
    /// The slot holds the child or children of this entity.
    Children,
    /// The slot holds the parent of this entity.
    Parent,
}

/// Schema definition for one relationship slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionSchema {
    /// Slot name.
    pub name: &'static str,
    /// Connection the slot is stored under.
    pub connection: ConnectionId,
    /// Which end of the connection the slot holds.
    pub side: RelationSide,
    /// Whether the slot must resolve before the entity is committed.
    pub required: bool,
    /// Whether the slot holds a list.
    pub list: bool,
}

impl ConnectionSchema {
    /// Slot holding an ordered list of children.
    #[must_use]
    pub const fn children(name: &'static str, connection: ConnectionId) -> Self {
        Self {
            name,
            connection,
            side: RelationSide::Children,
            required: false,
            list: true,
        }
    }

    /// Slot holding at most one child.
    #[must_use]
    pub const fn child(name: &'static str, connection: ConnectionId) -> Self {
        Self {
            name,
            connection,
            side: RelationSide::Children,
            required: false,
            list: false,
        }
    }

    /// Slot holding the parent.
    #[must_use]
    pub const fn parent(name: &'static str, connection: ConnectionId) -> Self {
        Self {
            name,
            connection,
            side: RelationSide::Parent,
            required: false,
            list: false,
        }
    }

    /// Marks the slot as required.
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Returns true if the slot must hold an entity at commit time.
    ///
    /// Parent slots of owning connections are always required. List slots are
    /// never checked; an empty list is a valid value.
    #[must_use]
    pub const fn must_resolve(&self) -> bool {
        if self.list {
            return false;
        }
        match self.side {
            RelationSide::Children => self.required,
            RelationSide::Parent => self.required || self.connection.owns_children(),
        }
    }

    /// Returns the entity type the slot points at.
    #[must_use]
    pub const fn target_type(&self) -> &'static str {
        match self.side {
            RelationSide::Children => self.connection.child,
            RelationSide::Parent => self.connection.parent,
        }
    }
}

/// Schema of one concrete entity type.
#[derive(Clone)]
pub struct EntitySchema {
    /// Entity type name.
    pub name: &'static str,
    /// Abstract supertypes, nearest first.
    pub supertypes: &'static [&'static str],
    /// Scalar fields in declaration order.
    pub fields: Vec<FieldSchema>,
    /// Relationship slots in declaration order.
    pub connections: Vec<ConnectionSchema>,
    /// Persistent id function, if the type has one.
    pub persistent_id: Option<PersistentIdFn>,
    /// Api version the schema was written against.
    pub api_version: u32,
    /// Implementation version the schema was written against.
    pub impl_version: u32,
}

impl EntitySchema {
    /// Creates an empty schema marked with the current generator versions.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            supertypes: &[],
            fields: Vec::new(),
            connections: Vec::new(),
            persistent_id: None,
            api_version: GENERATOR_API_VERSION,
            impl_version: GENERATOR_IMPL_VERSION,
        }
    }

    /// Sets the abstract supertypes.
    #[must_use]
    pub fn with_supertypes(mut self, supertypes: &'static [&'static str]) -> Self {
        self.supertypes = supertypes;
        self
    }

    /// Adds a scalar field.
    #[must_use]
    pub fn with_field(mut self, field: FieldSchema) -> Self {
        self.fields.push(field);
        self
    }

    /// Adds a relationship slot.
    #[must_use]
    pub fn with_connection(mut self, connection: ConnectionSchema) -> Self {
        self.connections.push(connection);
        self
    }

    /// Sets the persistent id function.
    #[must_use]
    pub fn with_persistent_id(mut self, f: PersistentIdFn) -> Self {
        self.persistent_id = Some(f);
        self
    }

    /// Overrides the version markers.
    #[must_use]
    pub fn with_versions(mut self, api_version: u32, impl_version: u32) -> Self {
        self.api_version = api_version;
        self.impl_version = impl_version;
        self
    }

    /// Returns a scalar field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Returns a scalar field by name or an `UnknownField` error.
    ///
    /// # Errors
    ///
    /// Returns an error if the type declares no such field.
    pub fn expect_field(&self, name: &str) -> Result<&FieldSchema> {
        self.field(name)
            .ok_or_else(|| Error::unknown_field(self.name, name))
    }

    /// Returns a relationship slot by name.
    #[must_use]
    pub fn connection(&self, name: &str) -> Option<&ConnectionSchema> {
        self.connections.iter().find(|c| c.name == name)
    }

    /// Returns a relationship slot by name or an `UnknownField` error.
    ///
    /// # Errors
    ///
    /// Returns an error if the type declares no such slot.
    pub fn expect_connection(&self, name: &str) -> Result<&ConnectionSchema> {
        self.connection(name)
            .ok_or_else(|| Error::unknown_field(self.name, name))
    }

    /// Returns the slot declared for one end of a connection.
    #[must_use]
    pub fn connection_for(&self, connection: ConnectionId, side: RelationSide) -> Option<&ConnectionSchema> {
        self.connections
            .iter()
            .find(|c| c.connection == connection && c.side == side)
    }

    /// Returns true if this type is `name` or one of its subtypes.
    #[must_use]
    pub fn is_subtype_of(&self, name: &str) -> bool {
        self.name == name || self.supertypes.contains(&name)
    }

    /// Iterates over fields whose urls are indexed.
    pub fn indexed_fields(&self) -> impl Iterator<Item = &FieldSchema> {
        self.fields.iter().filter(|f| f.indexed)
    }

    fn validate(&self, config: &StorageConfig) -> Result<()> {
        if config.check_api_version && self.api_version != config.api_version {
            return Err(Error::new(ErrorKind::IncompatibleGeneratedCode {
                entity_type: self.name.to_string(),
                expected: config.api_version,
                found: self.api_version,
            }));
        }
        if config.check_impl_version && self.impl_version != config.impl_version {
            return Err(Error::new(ErrorKind::IncompatibleGeneratedCode {
                entity_type: self.name.to_string(),
                expected: config.impl_version,
                found: self.impl_version,
            }));
        }

        for slot in &self.connections {
            let connection = slot.connection;
            match slot.side {
                RelationSide::Parent if slot.list => {
                    return Err(Error::unresolved_parent_list(self.name, slot.name));
                }
                RelationSide::Parent if !self.is_subtype_of(connection.child) => {
                    return Err(Error::invalid_connection(connection.to_string(), self.name));
                }
                RelationSide::Children if !self.is_subtype_of(connection.parent) => {
                    return Err(Error::invalid_connection(connection.to_string(), self.name));
                }
                RelationSide::Children if slot.list == connection.is_one_to_one() => {
                    return Err(Error::invalid_connection(connection.to_string(), self.name));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

impl PartialEq for EntitySchema {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for EntitySchema {}

impl fmt::Debug for EntitySchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntitySchema")
            .field("name", &self.name)
            .field("fields", &self.fields.len())
            .field("connections", &self.connections.len())
            .finish_non_exhaustive()
    }
}

/// Loaded, validated set of entity schemas plus the storage configuration.
#[derive(Clone, Debug)]
pub struct SchemaRegistry {
    config: StorageConfig,
    schemas: BTreeMap<&'static str, &'static EntitySchema>,
}

impl SchemaRegistry {
    /// Validates and indexes the given schemas.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A schema's version markers do not match the configuration
    /// - A parent slot is declared as a list
    /// - A slot does not fit the endpoint types of its connection
    /// - Two schemas share a name
    pub fn load<I>(config: StorageConfig, schemas: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'static EntitySchema>,
    {
        let mut by_name = BTreeMap::new();
        for schema in schemas {
            schema.validate(&config)?;
            if by_name.insert(schema.name, schema).is_some() {
                return Err(Error::internal(format!(
                    "entity schema registered twice: {}",
                    schema.name
                )));
            }
        }
        tracing::debug!("loaded {} entity schemas", by_name.len());
        Ok(Self {
            config,
            schemas: by_name,
        })
    }

    /// Returns the storage configuration.
    #[must_use]
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Returns a schema by entity type name.
    ///
    /// # Errors
    ///
    /// Returns `UnknownEntityType` if no schema has that name.
    pub fn get(&self, name: &str) -> Result<&'static EntitySchema> {
        self.schemas
            .get(name)
            .copied()
            .ok_or_else(|| Error::unknown_entity_type(name))
    }

    /// Returns true if a schema with that name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// Returns true if `name` is a registered type or an abstract supertype of one.
    #[must_use]
    pub fn knows_type(&self, name: &str) -> bool {
        self.contains(name) || self.schemas.values().any(|s| s.is_subtype_of(name))
    }

    /// Iterates over the concrete schemas that are `name` or its subtypes.
    pub fn subtypes_of<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'static EntitySchema> + 'a {
        self.schemas
            .values()
            .copied()
            .filter(move |s| s.is_subtype_of(name))
    }

    /// Iterates over all registered schemas in name order.
    pub fn schemas(&self) -> impl Iterator<Item = &'static EntitySchema> + '_ {
        self.schemas.values().copied()
    }
}
