//! Copy-on-write storage state and the mutation primitives behind
//! [`MutableEntityStorage`](crate::MutableEntityStorage).
//!
//! Every collection here is persistent, so cloning a state is O(1). A
//! mutation clones the current state, edits the clone, and only swaps it in
//! once the whole operation succeeded. Readers of the old state never see a
//! partial edit.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use workspace_model_foundation::{EntityId, Error, PersistentId, Result};

use crate::builder::{EntityBuilder, EntityRef, PendingSlot, Phase};
use crate::change::EntityChange;
use crate::config::StorageConfig;
use crate::connection::ConnectionId;
use crate::data::EntityData;
use crate::entity::Entity;
use crate::index::{PersistentIdIndex, SoftLinkIndex, UrlIndex};
use crate::refs::RefsTable;
use crate::schema::{EntitySchema, RelationSide};
use crate::slots::SlotTable;

/// The complete entity graph: data, edges and indices.
#[derive(Clone, Debug, Default)]
pub struct StorageState {
    pub(crate) slots: SlotTable,
    pub(crate) data: im::OrdMap<EntityId, Arc<EntityData>>,
    pub(crate) by_type: im::HashMap<&'static str, im::OrdSet<EntityId>>,
    pub(crate) refs: RefsTable,
    pub(crate) persistent_ids: PersistentIdIndex,
    pub(crate) soft_links: SoftLinkIndex,
    pub(crate) urls: UrlIndex,
}

/// Bookkeeping for one in-flight mutation.
#[derive(Debug, Default)]
pub(crate) struct Mutation {
    pub(crate) events: Vec<EntityChange>,
    /// Owned children that lost their parent; removed unless re-attached.
    orphans: Vec<(ConnectionId, EntityId)>,
    /// Entities whose initialization is checked before the commit. Dead
    /// entries are skipped.
    to_check: BTreeSet<EntityId>,
}

impl StorageState {
    /// Returns the data of a live entity.
    #[must_use]
    pub fn data_of(&self, id: EntityId) -> Option<&Arc<EntityData>> {
        if self.slots.is_live(id) {
            self.data.get(&id)
        } else {
            None
        }
    }

    /// Returns a read view of an entity.
    ///
    /// # Errors
    ///
    /// Returns `StaleEntity` or `EntityNotFound` if the id is not live.
    pub fn entity(&self, id: EntityId) -> Result<Entity<'_>> {
        self.slots.validate(id)?;
        let data = self
            .data
            .get(&id)
            .ok_or_else(|| Error::internal(format!("live entity {id:?} has no data")))?;
        Ok(data.create_entity(id, self))
    }

    /// Iterates over the entities of one concrete type, in id order.
    pub fn ids_of_type<'a>(&'a self, entity_type: &str) -> impl Iterator<Item = EntityId> + use<'a> {
        self.by_type
            .get(entity_type)
            .into_iter()
            .flat_map(|ids| ids.iter().copied())
    }

    /// Iterates over all live entities, in id order.
    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.data.keys().copied()
    }

    /// Returns the number of live entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if no entity is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns the relationship table.
    #[must_use]
    pub fn refs(&self) -> &RefsTable {
        &self.refs
    }

    /// Returns the persistent id index.
    #[must_use]
    pub fn persistent_ids(&self) -> &PersistentIdIndex {
        &self.persistent_ids
    }

    /// Returns the soft link index.
    #[must_use]
    pub fn soft_links(&self) -> &SoftLinkIndex {
        &self.soft_links
    }

    /// Returns the url index.
    #[must_use]
    pub fn urls(&self) -> &UrlIndex {
        &self.urls
    }

    /// Snapshot of the committed edges of every slot, by slot name.
    pub(crate) fn slot_refs(
        &self,
        schema: &'static EntitySchema,
        id: EntityId,
    ) -> BTreeMap<&'static str, im::Vector<EntityId>> {
        schema
            .connections
            .iter()
            .map(|slot| {
                let ids = match slot.side {
                    RelationSide::Children => self.refs.extract_children(slot.connection, id),
                    RelationSide::Parent => self
                        .refs
                        .extract_parent(slot.connection, id)
                        .into_iter()
                        .collect(),
                };
                (slot.name, ids)
            })
            .collect()
    }

    // ------------------------------------------------------------------------
    // Data and indices
    // ------------------------------------------------------------------------

    /// Stores data for a live id and re-indexes it.
    ///
    /// Returns the `(old, new)` persistent ids if the id changed.
    fn store(
        &mut self,
        id: EntityId,
        data: Arc<EntityData>,
    ) -> Result<Option<(PersistentId, PersistentId)>> {
        let before = self.persistent_ids.persistent_id_of(id).cloned();
        let after = data.persistent_id()?;
        match &after {
            Some(pid) => self.persistent_ids.insert(id, pid.clone())?,
            None => {
                self.persistent_ids.remove(id);
            }
        }
        self.soft_links.update(id, &data.soft_links());
        for (field, urls) in data.indexed_urls() {
            self.urls.index(id, field, &urls);
        }
        self.by_type
            .entry(data.entity_type())
            .or_insert_with(im::OrdSet::new)
            .insert(id);
        self.data.insert(id, data);

        Ok(match (before, after) {
            (Some(before), Some(after)) if before != after => Some((before, after)),
            _ => None,
        })
    }

    /// Rewrites every soft link to `old` into a link to `new`.
    ///
    /// Referrers whose own persistent id changes as a result propagate the
    /// rename further.
    pub(crate) fn rename_links(
        &mut self,
        old: &PersistentId,
        new: &PersistentId,
        m: &mut Mutation,
    ) -> Result<()> {
        let mut work = vec![(old.clone(), new.clone())];
        while let Some((old, new)) = work.pop() {
            let referrers: Vec<EntityId> = self.soft_links.referrers(&old).collect();
            for referrer in referrers {
                let Some(current) = self.data.get(&referrer).cloned() else {
                    continue;
                };
                let mut data = EntityData::clone(&current);
                if !data.update_link(&old, &new)? {
                    continue;
                }
                let changed = data.changed_fields(&current);
                if let Some(rename) = self.store(referrer, Arc::new(data))? {
                    work.push(rename);
                }
                tracing::trace!(%referrer, from = %old, to = %new, "renamed soft link");
                m.events.push(EntityChange::Replaced {
                    id: referrer,
                    entity_type: current.entity_type(),
                    changed,
                });
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Add
    // ------------------------------------------------------------------------

    /// Adds a builder and its unsaved subgraph.
    ///
    /// A builder that was already committed into this storage resolves to
    /// its id. A builder committed elsewhere, or one issued for modification,
    /// is rejected with `CrossBuilderEntity`.
    pub(crate) fn attach(&mut self, builder: &mut EntityBuilder, m: &mut Mutation) -> Result<EntityId> {
        let entity_type = builder.entity_type();
        match &builder.phase {
            Phase::Committed { id, data } => {
                return match self.data_of(*id) {
                    Some(current) if current.origin() == data.origin() => Ok(*id),
                    _ => Err(Error::cross_builder(entity_type)),
                };
            }
            Phase::Modifying { .. } => return Err(Error::cross_builder(entity_type)),
            Phase::Detached => {}
        }
        if let Some(id) = builder.staged {
            return Ok(id);
        }

        self.attach_detached(builder, m)
            .map_err(|e| e.in_frame(format!("attach {entity_type}")))
    }

    fn attach_detached(&mut self, builder: &mut EntityBuilder, m: &mut Mutation) -> Result<EntityId> {
        let data = builder.build_data()?;
        let id = self.slots.allocate();
        builder.staged = Some(id);
        self.store(id, Arc::new(data))?;
        tracing::trace!(%id, entity_type = builder.entity_type(), "attached entity");

        m.events.push(EntityChange::Added {
            id,
            entity_type: builder.entity_type(),
        });
        m.to_check.insert(id);
        self.apply_pending(id, builder, m)?;
        Ok(id)
    }

    /// Installs the pending relationship assignments of a builder.
    ///
    /// Schema slots come first, then extension children, then extension
    /// parents.
    fn apply_pending(&mut self, holder: EntityId, builder: &mut EntityBuilder, m: &mut Mutation) -> Result<()> {
        let schema: &'static EntitySchema = builder.schema;
        for (name, pending) in &mut builder.slots {
            let slot = schema.expect_connection(name)?;
            self.apply_slot(holder, slot.connection, slot.side, pending, m)?;
        }
        for children_pass in [true, false] {
            for (key, pending) in &mut builder.ext_refs {
                if key.is_child != children_pass {
                    continue;
                }
                let side = if key.is_child {
                    RelationSide::Children
                } else {
                    RelationSide::Parent
                };
                self.apply_slot(holder, key.connection, side, pending, m)?;
            }
        }
        Ok(())
    }

    fn apply_slot(
        &mut self,
        holder: EntityId,
        connection: ConnectionId,
        side: RelationSide,
        pending: &mut PendingSlot,
        m: &mut Mutation,
    ) -> Result<()> {
        match (side, pending) {
            (RelationSide::Children, PendingSlot::Children { refs, append }) => {
                let mut children = Vec::with_capacity(refs.len());
                for r in refs.iter_mut() {
                    children.push(self.resolve_ref(r, connection, connection.child, m)?);
                }
                if *append {
                    for child in children {
                        let displaced = self.refs.add_child(connection, holder, child);
                        self.detached(connection, displaced, m);
                    }
                } else {
                    let detached = self
                        .refs
                        .update_children_of_parent(connection, holder, &children)?;
                    self.detached(connection, detached, m);
                }
                Ok(())
            }
            (RelationSide::Parent, PendingSlot::Parent(r)) => {
                let parent = match r {
                    Some(r) => Some(self.resolve_ref(r, connection, connection.parent, m)?),
                    None => None,
                };
                let displaced = self.refs.update_parent_of_child(connection, holder, parent);
                self.detached(connection, displaced, m);
                Ok(())
            }
            _ => Err(Error::internal(format!(
                "pending assignment does not match slot side of {connection}"
            ))),
        }
    }

    fn detached(&mut self, connection: ConnectionId, children: Vec<EntityId>, m: &mut Mutation) {
        if connection.owns_children() {
            m.orphans
                .extend(children.into_iter().map(|child| (connection, child)));
        }
    }

    fn resolve_ref(
        &mut self,
        r: &mut EntityRef,
        connection: ConnectionId,
        endpoint: &str,
        m: &mut Mutation,
    ) -> Result<EntityId> {
        let id = match r {
            EntityRef::Existing(id) => {
                self.slots.validate(*id)?;
                *id
            }
            EntityRef::New(builder) => self.attach(builder, m)?,
        };
        let schema = self
            .data
            .get(&id)
            .map(|d| d.schema())
            .ok_or_else(|| Error::entity_not_found(id))?;
        if !schema.is_subtype_of(endpoint) {
            return Err(Error::invalid_connection(connection.to_string(), schema.name));
        }
        Ok(id)
    }

    // ------------------------------------------------------------------------
    // Modify
    // ------------------------------------------------------------------------

    /// Applies the overrides and pending assignments of a modifying builder.
    pub(crate) fn modify(&mut self, id: EntityId, builder: &mut EntityBuilder, m: &mut Mutation) -> Result<()> {
        let Phase::Modifying { id: target, base, .. } = &builder.phase else {
            return Err(Error::internal("modify expects a modifying builder"));
        };
        if *target != id {
            return Err(Error::cross_builder(builder.entity_type()));
        }
        let base = Arc::clone(base);

        let source_changed = builder.source.as_ref().is_some_and(|s| s != base.source());
        if source_changed || !builder.fields.is_empty() {
            let data = base.with_overrides(builder.source.as_ref(), &builder.fields);
            if let Some((old, new)) = self.store(id, Arc::new(data))? {
                tracing::debug!(%id, from = %old, to = %new, "persistent id changed");
                self.rename_links(&old, &new, m)?;
            }
        }
        self.apply_pending(id, builder, m)?;

        m.to_check.insert(id);
        m.events.push(EntityChange::Replaced {
            id,
            entity_type: builder.entity_type(),
            changed: builder.changed.iter().copied().collect(),
        });
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Remove
    // ------------------------------------------------------------------------

    /// Removes an entity and, transitively, every child it owns.
    ///
    /// Endpoints that survive the removal of an edge are re-checked before
    /// the commit, so a removal that leaves a required relationship
    /// unresolved fails with `MissingRequiredField`.
    pub(crate) fn remove(&mut self, id: EntityId, m: &mut Mutation) -> Result<()> {
        self.slots.validate(id)?;
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            if !self.slots.is_live(id) {
                continue;
            }
            m.to_check
                .extend(self.refs.parents_of(id).map(|(_, parent)| parent));
            m.to_check.extend(
                self.refs
                    .children_of(id)
                    .flat_map(|(_, children)| children.iter().copied()),
            );
            stack.extend(self.refs.remove_entity(id));
            self.persistent_ids.remove(id);
            self.soft_links.remove(id);
            self.urls.remove(id);
            let data = self
                .data
                .remove(&id)
                .ok_or_else(|| Error::internal(format!("live entity {id:?} has no data")))?;
            let entity_type = data.entity_type();
            let now_empty = match self.by_type.get_mut(entity_type) {
                Some(ids) => {
                    ids.remove(&id);
                    ids.is_empty()
                }
                None => false,
            };
            if now_empty {
                self.by_type.remove(entity_type);
            }
            self.slots.free(id)?;
            tracing::trace!(%id, entity_type, "removed entity");
            m.events.push(EntityChange::Removed { id, entity_type });
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Commit checks
    // ------------------------------------------------------------------------

    /// Settles a mutation: removes orphaned owned children, then checks the
    /// initialization of every added or modified entity and of every
    /// surviving endpoint of a removed edge.
    pub(crate) fn finish(&mut self, m: &mut Mutation, config: &StorageConfig) -> Result<()> {
        while let Some((connection, child)) = m.orphans.pop() {
            if self.slots.is_live(child) && self.refs.extract_parent(connection, child).is_none() {
                self.remove(child, m)?;
            }
        }
        for id in std::mem::take(&mut m.to_check) {
            if self.slots.is_live(id) {
                self.check_committed(id)?;
            }
        }
        if config.assert_consistency {
            self.check_consistency()?;
        }
        Ok(())
    }

    /// Verifies required scalars and required relationships of one entity.
    fn check_committed(&self, id: EntityId) -> Result<()> {
        let data = self
            .data
            .get(&id)
            .ok_or_else(|| Error::entity_not_found(id))?;
        data.check_initialized()?;
        let schema = data.schema();
        for slot in schema.connections.iter().filter(|s| s.must_resolve()) {
            let resolved = match slot.side {
                RelationSide::Children => self.refs.extract_child(slot.connection, id).is_some(),
                RelationSide::Parent => self.refs.extract_parent(slot.connection, id).is_some(),
            };
            if !resolved {
                return Err(Error::missing_required_field(schema.name, slot.name));
            }
        }
        Ok(())
    }
}
