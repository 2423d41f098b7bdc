//! Read-only entity views bound to a storage state.

use std::fmt;

use workspace_model_foundation::{
    EntityId, EntitySource, Error, FieldType, PersistentId, Result, Value, VirtualFileUrl,
};

use crate::connection::ConnectionId;
use crate::data::EntityData;
use crate::schema::{ConnectionSchema, RelationSide};
use crate::state::StorageState;

/// An immutable entity as seen through one snapshot.
///
/// Relationship getters resolve through the snapshot's relationship table, so
/// two views of the same id taken from different snapshots may disagree.
#[derive(Clone, Copy)]
pub struct Entity<'s> {
    id: EntityId,
    data: &'s EntityData,
    state: &'s StorageState,
}

impl<'s> Entity<'s> {
    pub(crate) fn new(id: EntityId, data: &'s EntityData, state: &'s StorageState) -> Self {
        Self { id, data, state }
    }

    /// Returns the entity id.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Returns the entity type name.
    #[must_use]
    pub fn entity_type(&self) -> &'static str {
        self.data.entity_type()
    }

    /// Returns the underlying data.
    #[must_use]
    pub fn data(&self) -> &'s EntityData {
        self.data
    }

    /// Returns the provenance tag.
    #[must_use]
    pub fn source(&self) -> &'s EntitySource {
        self.data.source()
    }

    /// Reads a scalar field.
    ///
    /// # Errors
    ///
    /// Returns `UnknownField` for undeclared fields.
    pub fn get(&self, field: &str) -> Result<&'s Value> {
        self.data.get(field)
    }

    /// Reads a string field.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` if the field does not hold a string.
    pub fn get_str(&self, field: &str) -> Result<&'s str> {
        let value = self.get(field)?;
        value.as_str().ok_or_else(|| self.mismatch(field, FieldType::String, value))
    }

    /// Reads a url field.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` if the field does not hold a url.
    pub fn get_url(&self, field: &str) -> Result<&'s VirtualFileUrl> {
        let value = self.get(field)?;
        value.as_url().ok_or_else(|| self.mismatch(field, FieldType::Url, value))
    }

    /// Reads a list field.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` if the field does not hold a list.
    pub fn get_list(&self, field: &str) -> Result<&'s im::Vector<Value>> {
        let value = self.get(field)?;
        value
            .as_list()
            .ok_or_else(|| self.mismatch(field, FieldType::list(FieldType::Any), value))
    }

    fn mismatch(&self, field: &str, expected: FieldType, value: &Value) -> Error {
        Error::type_mismatch(self.entity_type(), field, expected, value.type_name().to_string())
    }

    /// Returns the persistent id, if the type has one.
    #[must_use]
    pub fn persistent_id(&self) -> Option<&'s PersistentId> {
        self.state.persistent_ids.persistent_id_of(self.id)
    }

    fn slot(&self, field: &str, side: RelationSide) -> Result<&'static ConnectionSchema> {
        let schema = self.data.schema();
        let slot = schema.expect_connection(field)?;
        if slot.side == side {
            Ok(slot)
        } else {
            Err(Error::invalid_connection(
                format!("{}#{}", schema.name, slot.name),
                schema.name,
            ))
        }
    }

    fn view(&self, id: EntityId) -> Result<Entity<'s>> {
        self.state.entity(id)
    }

    /// Returns the children held in a slot, in order.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot is unknown or holds a parent.
    pub fn children(&self, field: &str) -> Result<Vec<Entity<'s>>> {
        let slot = self.slot(field, RelationSide::Children)?;
        self.ext_children(slot.connection)
    }

    /// Returns the child held in a single-child slot.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot is unknown or holds a parent.
    pub fn child(&self, field: &str) -> Result<Option<Entity<'s>>> {
        let slot = self.slot(field, RelationSide::Children)?;
        self.ext_child(slot.connection)
    }

    /// Returns the parent held in a parent slot.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot is unknown or holds children.
    pub fn parent(&self, field: &str) -> Result<Option<Entity<'s>>> {
        let slot = self.slot(field, RelationSide::Parent)?;
        self.ext_parent(slot.connection)
    }

    /// Returns the children under any connection, declared or not.
    ///
    /// # Errors
    ///
    /// Returns an error if the table holds a dead id.
    pub fn ext_children(&self, connection: ConnectionId) -> Result<Vec<Entity<'s>>> {
        self.state
            .refs
            .extract_children(connection, self.id)
            .iter()
            .map(|id| self.view(*id))
            .collect()
    }

    /// Returns the single child under any connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the table holds a dead id.
    pub fn ext_child(&self, connection: ConnectionId) -> Result<Option<Entity<'s>>> {
        self.state
            .refs
            .extract_child(connection, self.id)
            .map(|id| self.view(id))
            .transpose()
    }

    /// Returns the parent under any connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the table holds a dead id.
    pub fn ext_parent(&self, connection: ConnectionId) -> Result<Option<Entity<'s>>> {
        self.state
            .refs
            .extract_parent(connection, self.id)
            .map(|id| self.view(id))
            .transpose()
    }

    /// Returns the entities that soft-link to this entity's persistent id.
    ///
    /// # Errors
    ///
    /// Returns an error if the index holds a dead id.
    pub fn soft_referrers(&self) -> Result<Vec<Entity<'s>>> {
        let Some(pid) = self.persistent_id() else {
            return Ok(Vec::new());
        };
        self.state
            .soft_links
            .referrers(pid)
            .map(|id| self.view(id))
            .collect()
    }
}

impl PartialEq for Entity<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.data == other.data
    }
}

impl fmt::Debug for Entity<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {:?}", self.id, self.data)
    }
}
