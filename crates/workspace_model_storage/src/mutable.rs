//! The single-writer mutable storage.
//!
//! A [`MutableEntityStorage`] starts from a frozen [`EntityStorage`] and keeps
//! a working copy of its state. Every operation runs against a clone of the
//! working copy and replaces it only on success, so a failed add, modify or
//! remove leaves no trace. [`to_snapshot`](MutableEntityStorage::to_snapshot)
//! freezes the working copy into a new snapshot; the base snapshot is never
//! touched.

use std::sync::Arc;

use workspace_model_foundation::{EntityId, Error, PersistentId, Result};

use crate::builder::EntityBuilder;
use crate::change::{ChangeLog, EntityChange};
use crate::data::EntityData;
use crate::schema::SchemaRegistry;
use crate::state::{Mutation, StorageState};
use crate::storage::{EntityStorage, ReadStorage};

/// Mutable storage layered over a base snapshot.
#[derive(Debug)]
pub struct MutableEntityStorage {
    base: EntityStorage,
    state: StorageState,
    log: ChangeLog,
}

impl MutableEntityStorage {
    /// Creates an empty mutable storage.
    #[must_use]
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self::from_snapshot(EntityStorage::empty(registry))
    }

    /// Starts mutating a snapshot.
    #[must_use]
    pub fn from_snapshot(base: EntityStorage) -> Self {
        let state = StorageState::clone(base.state_arc());
        Self {
            base,
            state,
            log: ChangeLog::new(),
        }
    }

    /// Returns the snapshot this storage started from.
    #[must_use]
    pub fn base(&self) -> &EntityStorage {
        &self.base
    }

    /// Creates a detached builder for a registered entity type.
    ///
    /// # Errors
    ///
    /// Returns `UnknownEntityType` if the type is not registered.
    pub fn create_builder(&self, entity_type: &str) -> Result<EntityBuilder> {
        Ok(EntityBuilder::new(self.registry().get(entity_type)?))
    }

    /// Runs one mutation against a copy of the working state and swaps the
    /// copy in if it succeeds.
    fn transact<T>(
        &mut self,
        op: impl FnOnce(&mut StorageState, &mut Mutation) -> Result<T>,
    ) -> Result<(T, usize)> {
        let mut working = self.state.clone();
        let mut m = Mutation::default();
        let value = op(&mut working, &mut m)?;
        working.finish(&mut m, self.base.registry_arc().config())?;

        self.state = working;
        let count = m.events.len();
        self.log.extend(m.events);
        Ok((value, count))
    }

    /// Adds a builder together with every unsaved entity it references.
    ///
    /// The add is all-or-nothing: if any entity of the subgraph fails its
    /// initialization check, nothing is added and the builders stay
    /// detached. Adding a builder that was already committed into this
    /// storage returns its id without changes.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The entity type is not registered
    /// - The builder was committed into a different storage
    /// - A required field or relationship is missing
    /// - A relationship endpoint does not fit its connection
    /// - The persistent id is already taken
    pub fn add_entity(&mut self, builder: &mut EntityBuilder) -> Result<EntityId> {
        let entity_type = builder.entity_type();
        let result = self
            .registry()
            .get(entity_type)
            .and_then(|_| self.transact(|state, m| state.attach(builder, m)));
        match result {
            Ok((id, changes)) => {
                builder.mark_committed(&self.state);
                tracing::debug!(%id, entity_type, changes, "added entity");
                Ok(id)
            }
            Err(e) => {
                builder.unstage();
                tracing::warn!(entity_type, error = %e, "add aborted");
                Err(e.in_frame(format!("add {entity_type}")))
            }
        }
    }

    /// Modifies an existing entity through a builder.
    ///
    /// The closure receives a builder in the modifying phase: reads fall
    /// through to the committed data, writes are collected as overrides. If
    /// the entity's persistent id changes, every soft link to the old id is
    /// rewritten.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is not live, the closure fails, or the
    /// modified entity fails its initialization check. The storage is then
    /// left unchanged.
    pub fn modify_entity<F>(&mut self, id: EntityId, f: F) -> Result<()>
    where
        F: FnOnce(&mut EntityBuilder) -> Result<()>,
    {
        self.state.slots.validate(id)?;
        let data = self
            .state
            .data_of(id)
            .cloned()
            .ok_or_else(|| Error::entity_not_found(id))?;
        let entity_type = data.entity_type();
        let base_refs = self.state.slot_refs(data.schema(), id);
        let mut builder = EntityData::wrap_as_modifiable(&data, id, base_refs);

        let result = f(&mut builder)
            .and_then(|()| self.transact(|state, m| state.modify(id, &mut builder, m)));
        match result {
            Ok(((), changes)) => {
                tracing::debug!(%id, entity_type, changes, "modified entity");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(%id, entity_type, error = %e, "modification aborted");
                Err(e.in_frame(format!("modify {entity_type}")))
            }
        }
    }

    /// Removes an entity and every child it owns.
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` or `StaleEntity` if the id is not live.
    pub fn remove_entity(&mut self, id: EntityId) -> Result<()> {
        match self.transact(|state, m| state.remove(id, m)) {
            Ok(((), changes)) => {
                tracing::debug!(%id, changes, "removed entity");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(%id, error = %e, "removal aborted");
                Err(e.in_frame(format!("remove {id:?}")))
            }
        }
    }

    /// Rewrites every soft link to `old` into a link to `new`.
    ///
    /// # Errors
    ///
    /// Returns an error if a rewritten referrer would collide with another
    /// entity's persistent id, or `TypeMismatch` if a rewritten field cannot
    /// hold `new`. Nothing is changed in either case.
    pub fn update_soft_links(&mut self, old: &PersistentId, new: &PersistentId) -> Result<()> {
        let ((), changes) = self
            .transact(|state, m| state.rename_links(old, new, m))
            .map_err(|e| e.in_frame(format!("update links {old} -> {new}")))?;
        tracing::debug!(from = %old, to = %new, changes, "updated soft links");
        Ok(())
    }

    /// Returns the net changes since the base snapshot.
    #[must_use]
    pub fn changes(&self) -> Vec<EntityChange> {
        self.log.changes()
    }

    /// Returns true if anything changed since the base snapshot.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.log.is_empty()
    }

    /// Freezes the current state into a new snapshot.
    #[must_use]
    pub fn to_snapshot(&self) -> EntityStorage {
        tracing::debug!(
            entities = self.state.len(),
            changes = self.log.len(),
            "created snapshot"
        );
        EntityStorage::from_parts(
            Arc::clone(self.base.registry_arc()),
            Arc::new(self.state.clone()),
        )
    }
}

impl ReadStorage for MutableEntityStorage {
    fn state(&self) -> &StorageState {
        &self.state
    }

    fn registry(&self) -> &SchemaRegistry {
        self.base.registry_arc()
    }
}
