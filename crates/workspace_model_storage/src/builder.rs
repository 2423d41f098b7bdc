//! Mutable entity façade.
//!
//! An [`EntityBuilder`] collects scalar values and relationship assignments
//! for one entity. Fresh builders are committed with
//! [`MutableEntityStorage::add_entity`](crate::MutableEntityStorage::add_entity);
//! builders for existing entities are handed out by
//! [`MutableEntityStorage::modify_entity`](crate::MutableEntityStorage::modify_entity).
//!
//! Unsaved entities referenced from relationship slots are owned by value
//! (`EntityRef::New`), so a builder graph is always a tree and adding the
//! root adds the whole subgraph.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use workspace_model_foundation::{EntityId, EntitySource, Error, Result, Value};

use crate::connection::{ConnectionId, ExtRefKey};
use crate::data::{EntityData, read_unset};
use crate::schema::{ConnectionSchema, EntitySchema, RelationSide};
use crate::state::StorageState;

const ENTITY_SOURCE: &str = "entitySource";

/// Reference to a relationship endpoint.
#[derive(Debug)]
pub enum EntityRef {
    /// An entity already present in the target storage.
    Existing(EntityId),
    /// An unsaved entity, added together with its holder.
    New(Box<EntityBuilder>),
}

impl EntityRef {
    fn view(&self) -> RefView<'_> {
        match self {
            Self::Existing(id) => RefView::Existing(*id),
            Self::New(builder) => RefView::New(builder),
        }
    }
}

impl From<EntityId> for EntityRef {
    fn from(id: EntityId) -> Self {
        Self::Existing(id)
    }
}

impl From<EntityBuilder> for EntityRef {
    fn from(builder: EntityBuilder) -> Self {
        Self::New(Box::new(builder))
    }
}

/// Borrowed view of a relationship endpoint held by a builder.
#[derive(Clone, Copy, Debug)]
pub enum RefView<'a> {
    /// An entity already present in storage.
    Existing(EntityId),
    /// An unsaved entity.
    New(&'a EntityBuilder),
}

impl RefView<'_> {
    /// Returns the id of an existing entity.
    #[must_use]
    pub fn id(&self) -> Option<EntityId> {
        match self {
            Self::Existing(id) => Some(*id),
            Self::New(builder) => builder.id(),
        }
    }
}

/// Records that a builder is held in a relationship slot of another builder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackPointer {
    /// Connection of the enclosing slot.
    pub connection: ConnectionId,
    /// `Children` if the enclosing builder is this builder's parent,
    /// `Parent` if it is this builder's child.
    pub enclosed_as: RelationSide,
}

#[derive(Debug)]
pub(crate) enum PendingSlot {
    Children { refs: Vec<EntityRef>, append: bool },
    Parent(Option<EntityRef>),
}

impl PendingSlot {
    fn builders_mut(&mut self) -> impl Iterator<Item = &mut EntityBuilder> {
        let refs: Vec<&mut EntityRef> = match self {
            Self::Children { refs, .. } => refs.iter_mut().collect(),
            Self::Parent(r) => r.iter_mut().collect(),
        };
        refs.into_iter().filter_map(|r| match r {
            EntityRef::New(builder) => Some(&mut **builder),
            EntityRef::Existing(_) => None,
        })
    }

    fn views(&self) -> Vec<RefView<'_>> {
        match self {
            Self::Children { refs, .. } => refs.iter().map(EntityRef::view).collect(),
            Self::Parent(r) => r.iter().map(EntityRef::view).collect(),
        }
    }
}

#[derive(Debug)]
pub(crate) enum Phase {
    Detached,
    Modifying {
        id: EntityId,
        base: Arc<EntityData>,
        base_refs: BTreeMap<&'static str, im::Vector<EntityId>>,
    },
    Committed {
        id: EntityId,
        data: Arc<EntityData>,
    },
}

/// Mutable façade over one entity.
///
/// Every setter checks that the builder is still mutable, validates the
/// field against the schema, and records the field in the changed-property
/// set.
#[derive(Debug)]
pub struct EntityBuilder {
    pub(crate) schema: &'static EntitySchema,
    pub(crate) phase: Phase,
    pub(crate) source: Option<EntitySource>,
    pub(crate) fields: im::OrdMap<&'static str, Value>,
    pub(crate) changed: BTreeSet<&'static str>,
    pub(crate) slots: BTreeMap<&'static str, PendingSlot>,
    pub(crate) ext_refs: BTreeMap<ExtRefKey, PendingSlot>,
    back_pointer: Option<BackPointer>,
    /// Id assigned during an in-flight add; cleared if the add fails.
    pub(crate) staged: Option<EntityId>,
}

impl EntityBuilder {
    /// Creates a detached builder for a new entity.
    #[must_use]
    pub fn new(schema: &'static EntitySchema) -> Self {
        Self {
            schema,
            phase: Phase::Detached,
            source: None,
            fields: im::OrdMap::new(),
            changed: BTreeSet::new(),
            slots: BTreeMap::new(),
            ext_refs: BTreeMap::new(),
            back_pointer: None,
            staged: None,
        }
    }

    pub(crate) fn modifying(
        id: EntityId,
        base: Arc<EntityData>,
        base_refs: BTreeMap<&'static str, im::Vector<EntityId>>,
    ) -> Self {
        let mut builder = Self::new(base.schema());
        builder.source = Some(base.source().clone());
        builder.phase = Phase::Modifying {
            id,
            base,
            base_refs,
        };
        builder
    }

    /// Returns the schema.
    #[must_use]
    pub fn schema(&self) -> &'static EntitySchema {
        self.schema
    }

    /// Returns the entity type name.
    #[must_use]
    pub fn entity_type(&self) -> &'static str {
        self.schema.name
    }

    /// Returns the entity id once the builder is bound to a storage.
    #[must_use]
    pub fn id(&self) -> Option<EntityId> {
        match &self.phase {
            Phase::Detached => None,
            Phase::Modifying { id, .. } | Phase::Committed { id, .. } => Some(*id),
        }
    }

    /// Returns true once the builder has been added to a storage.
    #[must_use]
    pub fn is_committed(&self) -> bool {
        matches!(self.phase, Phase::Committed { .. })
    }

    /// Returns the slot this builder is held in, if any.
    #[must_use]
    pub fn back_pointer(&self) -> Option<BackPointer> {
        self.back_pointer
    }

    /// Iterates over the names of every field and slot set on this builder.
    pub fn changed_properties(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.changed.iter().copied()
    }

    fn check_modification_allowed(&self) -> Result<()> {
        match self.phase {
            Phase::Committed { .. } => Err(Error::frozen_entity(self.schema.name)),
            Phase::Detached | Phase::Modifying { .. } => Ok(()),
        }
    }

    // ------------------------------------------------------------------------
    // Scalars
    // ------------------------------------------------------------------------

    /// Sets the provenance tag.
    ///
    /// # Errors
    ///
    /// Returns `FrozenEntity` if the builder was already committed.
    pub fn set_source(&mut self, source: EntitySource) -> Result<()> {
        self.check_modification_allowed()?;
        self.source = Some(source);
        self.changed.insert(ENTITY_SOURCE);
        Ok(())
    }

    /// Sets the provenance tag, consuming and returning the builder.
    ///
    /// # Errors
    ///
    /// Returns `FrozenEntity` if the builder was already committed.
    pub fn with_source(mut self, source: EntitySource) -> Result<Self> {
        self.set_source(source)?;
        Ok(self)
    }

    /// Returns the provenance tag.
    ///
    /// # Errors
    ///
    /// Returns `UninitializedField` if no source was set yet.
    pub fn source(&self) -> Result<&EntitySource> {
        match &self.phase {
            Phase::Committed { data, .. } => Ok(data.source()),
            Phase::Detached | Phase::Modifying { .. } => self
                .source
                .as_ref()
                .ok_or_else(|| Error::uninitialized_field(self.schema.name, ENTITY_SOURCE)),
        }
    }

    /// Sets a scalar field.
    ///
    /// # Errors
    ///
    /// Returns an error if the builder is frozen, the field is unknown, or the
    /// value does not match the field type.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> Result<()> {
        self.check_modification_allowed()?;
        let entity: &'static EntitySchema = self.schema;
        let schema = entity.expect_field(field)?;
        let value = value.into();
        if !schema.ty.accepts(&value) {
            return Err(Error::type_mismatch(
                entity.name,
                schema.name,
                schema.ty.clone(),
                value.type_name().to_string(),
            ));
        }
        self.fields.insert(schema.name, value);
        self.changed.insert(schema.name);
        Ok(())
    }

    /// Sets a scalar field, consuming and returning the builder.
    ///
    /// # Errors
    ///
    /// See [`set`](Self::set).
    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Result<Self> {
        self.set(field, value)?;
        Ok(self)
    }

    /// Reads a scalar field.
    ///
    /// Values set on this builder win; otherwise modifying builders read
    /// through to the committed data.
    ///
    /// # Errors
    ///
    /// Returns `UnknownField` for undeclared fields and `UninitializedField`
    /// for required fields that were never set.
    pub fn get(&self, field: &str) -> Result<&Value> {
        let entity: &'static EntitySchema = self.schema;
        let schema = entity.expect_field(field)?;
        if let Some(value) = self.fields.get(field) {
            return Ok(value);
        }
        match &self.phase {
            Phase::Modifying { base: data, .. } | Phase::Committed { data, .. } => data.get(field),
            Phase::Detached => read_unset(entity, schema),
        }
    }

    /// Returns true if the field has a value.
    #[must_use]
    pub fn is_initialized(&self, field: &str) -> bool {
        self.fields.contains_key(field)
            || match &self.phase {
                Phase::Modifying { base: data, .. } | Phase::Committed { data, .. } => {
                    data.is_initialized(field)
                }
                Phase::Detached => false,
            }
    }

    /// Builds the data of a detached builder, checking required scalars.
    pub(crate) fn build_data(&self) -> Result<EntityData> {
        let source = self
            .source
            .clone()
            .ok_or_else(|| Error::missing_required_field(self.schema.name, ENTITY_SOURCE))?;
        let data = EntityData::new(self.schema, source, self.fields.clone());
        data.check_initialized()?;
        Ok(data)
    }

    // ------------------------------------------------------------------------
    // Relationships
    // ------------------------------------------------------------------------

    fn slot_schema(&self, field: &str, side: RelationSide, list: bool) -> Result<&'static ConnectionSchema> {
        let schema: &'static EntitySchema = self.schema;
        let slot = schema.expect_connection(field)?;
        if slot.side != side || slot.list != list {
            return Err(Error::invalid_connection(
                format!("{}#{}", schema.name, slot.name),
                schema.name,
            ));
        }
        Ok(slot)
    }

    /// Validates a referenced builder and records where it is held.
    fn enclose(r: &mut EntityRef, connection: ConnectionId, enclosed_as: RelationSide) -> Result<()> {
        match r {
            EntityRef::New(builder) => builder.set_back_pointer(connection, enclosed_as),
            EntityRef::Existing(_) => Ok(()),
        }
    }

    /// Records that this builder is held by another builder's slot.
    ///
    /// A pending parent assignment for the same connection is dropped: the
    /// enclosing builder becomes the parent.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConnection` if this builder's type does not fit the
    /// connection end it is placed on.
    pub fn set_back_pointer(&mut self, connection: ConnectionId, enclosed_as: RelationSide) -> Result<()> {
        let expected = match enclosed_as {
            RelationSide::Children => connection.child,
            RelationSide::Parent => connection.parent,
        };
        if !self.schema.is_subtype_of(expected) {
            return Err(Error::invalid_connection(connection.to_string(), self.schema.name));
        }
        if self.is_committed() {
            return Ok(());
        }
        let schema: &'static EntitySchema = self.schema;
        if enclosed_as == RelationSide::Children {
            if let Some(slot) = schema.connection_for(connection, RelationSide::Parent) {
                self.slots.remove(slot.name);
            }
            self.ext_refs
                .retain(|key, _| key.is_child || key.connection != connection);
        }
        self.back_pointer = Some(BackPointer {
            connection,
            enclosed_as,
        });
        Ok(())
    }

    /// Replaces the children held in a list slot.
    ///
    /// # Errors
    ///
    /// Returns an error if the builder is frozen, the slot is unknown or not
    /// a child list, or a new child has the wrong type.
    pub fn set_children(&mut self, field: &str, mut refs: Vec<EntityRef>) -> Result<()> {
        self.check_modification_allowed()?;
        let slot = self.slot_schema(field, RelationSide::Children, true)?;
        for r in &mut refs {
            Self::enclose(r, slot.connection, RelationSide::Children)?;
        }
        self.slots
            .insert(slot.name, PendingSlot::Children { refs, append: false });
        self.changed.insert(slot.name);
        Ok(())
    }

    /// Appends a child to a list slot, keeping the existing children.
    ///
    /// # Errors
    ///
    /// See [`set_children`](Self::set_children).
    pub fn add_child(&mut self, field: &str, mut child: EntityRef) -> Result<()> {
        self.check_modification_allowed()?;
        let slot = self.slot_schema(field, RelationSide::Children, true)?;
        Self::enclose(&mut child, slot.connection, RelationSide::Children)?;
        match self.slots.get_mut(slot.name) {
            Some(PendingSlot::Children { refs, .. }) => refs.push(child),
            _ => {
                self.slots.insert(
                    slot.name,
                    PendingSlot::Children {
                        refs: vec![child],
                        append: true,
                    },
                );
            }
        }
        self.changed.insert(slot.name);
        Ok(())
    }

    /// Sets or clears the child held in a single-child slot.
    ///
    /// # Errors
    ///
    /// See [`set_children`](Self::set_children).
    pub fn set_child(&mut self, field: &str, child: Option<EntityRef>) -> Result<()> {
        self.check_modification_allowed()?;
        let slot = self.slot_schema(field, RelationSide::Children, false)?;
        let mut refs: Vec<EntityRef> = child.into_iter().collect();
        for r in &mut refs {
            Self::enclose(r, slot.connection, RelationSide::Children)?;
        }
        self.slots
            .insert(slot.name, PendingSlot::Children { refs, append: false });
        self.changed.insert(slot.name);
        Ok(())
    }

    /// Sets or clears the parent.
    ///
    /// # Errors
    ///
    /// Returns an error if the builder is frozen, the slot is unknown or not a
    /// parent slot, or a new parent has the wrong type.
    pub fn set_parent(&mut self, field: &str, parent: Option<EntityRef>) -> Result<()> {
        self.check_modification_allowed()?;
        let slot = self.slot_schema(field, RelationSide::Parent, false)?;
        let mut parent = parent;
        if let Some(r) = parent.as_mut() {
            Self::enclose(r, slot.connection, RelationSide::Parent)?;
        }
        self.slots.insert(slot.name, PendingSlot::Parent(parent));
        self.changed.insert(slot.name);
        Ok(())
    }

    fn check_ext_holder(&self, key: &ExtRefKey) -> Result<()> {
        let holder_type = if key.is_child {
            key.connection.parent
        } else {
            key.connection.child
        };
        if self.schema.is_subtype_of(holder_type) {
            Ok(())
        } else {
            Err(Error::invalid_connection(key.connection.to_string(), self.schema.name))
        }
    }

    /// Sets the children held by an extension field.
    ///
    /// # Errors
    ///
    /// Returns `UnresolvedParentList` if the key names a parent, plus the
    /// errors of [`set_children`](Self::set_children).
    pub fn set_ext_children(&mut self, key: ExtRefKey, mut refs: Vec<EntityRef>) -> Result<()> {
        self.check_modification_allowed()?;
        if !key.is_child {
            return Err(Error::unresolved_parent_list(key.declaring_type, key.field));
        }
        self.check_ext_holder(&key)?;
        if key.connection.is_one_to_one() && refs.len() > 1 {
            return Err(Error::invalid_connection(key.connection.to_string(), self.schema.name));
        }
        for r in &mut refs {
            Self::enclose(r, key.connection, RelationSide::Children)?;
        }
        self.ext_refs
            .insert(key, PendingSlot::Children { refs, append: false });
        self.changed.insert(key.field);
        Ok(())
    }

    /// Sets or clears the single child held by an extension field.
    ///
    /// # Errors
    ///
    /// See [`set_ext_children`](Self::set_ext_children).
    pub fn set_ext_child(&mut self, key: ExtRefKey, child: Option<EntityRef>) -> Result<()> {
        self.set_ext_children(key, child.into_iter().collect())
    }

    /// Sets or clears the parent held by an extension field.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConnection` if the key names children or the types do
    /// not fit the connection.
    pub fn set_ext_parent(&mut self, key: ExtRefKey, parent: Option<EntityRef>) -> Result<()> {
        self.check_modification_allowed()?;
        if key.is_child {
            return Err(Error::invalid_connection(key.connection.to_string(), self.schema.name));
        }
        self.check_ext_holder(&key)?;
        let mut parent = parent;
        if let Some(r) = parent.as_mut() {
            Self::enclose(r, key.connection, RelationSide::Parent)?;
        }
        self.ext_refs.insert(key, PendingSlot::Parent(parent));
        self.changed.insert(key.field);
        Ok(())
    }

    /// Returns the children of a slot as this builder sees them.
    ///
    /// For a modifying builder the committed children are merged with the
    /// children appended on this builder; a replacing assignment hides them.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot is unknown or holds a parent.
    pub fn children(&self, field: &str) -> Result<Vec<RefView<'_>>> {
        let slot = self.schema.expect_connection(field)?;
        if slot.side != RelationSide::Children {
            return Err(Error::invalid_connection(
                format!("{}#{}", self.schema.name, slot.name),
                self.schema.name,
            ));
        }
        let base: Vec<RefView<'_>> = self
            .base_refs(slot.name)
            .into_iter()
            .map(RefView::Existing)
            .collect();
        Ok(match self.slots.get(slot.name) {
            None => base,
            Some(pending @ PendingSlot::Children { append: true, .. }) => {
                let mut merged = base;
                merged.extend(pending.views());
                merged
            }
            Some(pending) => pending.views(),
        })
    }

    /// Returns the parent of a slot as this builder sees it.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot is unknown or holds children.
    pub fn parent(&self, field: &str) -> Result<Option<RefView<'_>>> {
        let slot = self.slot_schema(field, RelationSide::Parent, false)?;
        Ok(match self.slots.get(slot.name) {
            Some(pending) => pending.views().into_iter().next(),
            None => self.base_refs(slot.name).into_iter().next().map(RefView::Existing),
        })
    }

    fn base_refs(&self, field: &str) -> im::Vector<EntityId> {
        match &self.phase {
            Phase::Modifying { base_refs, .. } => base_refs.get(field).cloned().unwrap_or_default(),
            Phase::Detached | Phase::Committed { .. } => im::Vector::new(),
        }
    }

    // ------------------------------------------------------------------------
    // Commit bookkeeping
    // ------------------------------------------------------------------------

    /// Freezes the builder after its add was committed.
    pub(crate) fn mark_committed(&mut self, state: &StorageState) {
        for slot in self.slots.values_mut().chain(self.ext_refs.values_mut()) {
            for builder in slot.builders_mut() {
                builder.mark_committed(state);
            }
        }
        let Some(id) = self.staged.take() else {
            return;
        };
        if let Some(data) = state.data_of(id) {
            self.phase = Phase::Committed {
                id,
                data: Arc::clone(data),
            };
            self.source = None;
            self.fields = im::OrdMap::new();
            self.slots.clear();
            self.ext_refs.clear();
        }
    }

    /// Forgets ids staged by a failed add, for the whole subgraph.
    pub(crate) fn unstage(&mut self) {
        self.staged = None;
        for slot in self.slots.values_mut().chain(self.ext_refs.values_mut()) {
            for builder in slot.builders_mut() {
                builder.unstage();
            }
        }
    }
}
