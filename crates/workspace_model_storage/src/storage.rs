//! Frozen snapshots and the read-only query surface shared with
//! [`MutableEntityStorage`].

use std::sync::Arc;

use workspace_model_foundation::{EntityId, Error, PersistentId, Result, VirtualFileUrl};

use crate::connection::ConnectionId;
use crate::entity::Entity;
use crate::mutable::MutableEntityStorage;
use crate::schema::SchemaRegistry;
use crate::state::StorageState;

/// Read-only query surface over a storage state.
///
/// Implemented by frozen snapshots and by mutable storages; the latter answer
/// from their working state, so reads observe their own uncommitted edits.
pub trait ReadStorage {
    /// Returns the storage state.
    fn state(&self) -> &StorageState;

    /// Returns the schema registry.
    fn registry(&self) -> &SchemaRegistry;

    /// Returns the entity with the given id.
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` or `StaleEntity` if the id is not live.
    fn entity(&self, id: EntityId) -> Result<Entity<'_>> {
        self.state().entity(id)
    }

    /// Returns true if the id is live.
    fn contains(&self, id: EntityId) -> bool {
        self.state().data_of(id).is_some()
    }

    /// Returns every entity of a type, including subtypes of abstract types,
    /// in id order.
    ///
    /// # Errors
    ///
    /// Returns `UnknownEntityType` if the type is not registered.
    fn entities_of_type(&self, entity_type: &str) -> Result<Vec<Entity<'_>>> {
        let registry = self.registry();
        if !registry.knows_type(entity_type) {
            return Err(Error::unknown_entity_type(entity_type));
        }
        let state = self.state();
        let mut ids: Vec<EntityId> = registry
            .subtypes_of(entity_type)
            .flat_map(|schema| state.ids_of_type(schema.name))
            .collect();
        ids.sort_unstable();
        ids.into_iter().map(|id| state.entity(id)).collect()
    }

    /// Iterates over every entity in id order.
    fn entities(&self) -> Vec<Entity<'_>> {
        let state = self.state();
        state.ids().filter_map(|id| state.entity(id).ok()).collect()
    }

    /// Resolves a persistent id.
    fn resolve(&self, pid: &PersistentId) -> Option<Entity<'_>> {
        let state = self.state();
        let id = state.persistent_ids.get(pid)?;
        state.entity(id).ok()
    }

    /// Returns the entities on the other end of `connection`: the children
    /// of `id` followed by its parent.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is not live.
    fn referrers(&self, id: EntityId, connection: ConnectionId) -> Result<Vec<Entity<'_>>> {
        let state = self.state();
        state.slots.validate(id)?;
        let children = state.refs.extract_children(connection, id);
        let parent = state.refs.extract_parent(connection, id);
        children
            .iter()
            .copied()
            .chain(parent)
            .map(|other| state.entity(other))
            .collect()
    }

    /// Returns the entities that soft-link to a persistent id.
    ///
    /// # Errors
    ///
    /// Returns an error if the index holds a dead id.
    fn soft_referrers(&self, pid: &PersistentId) -> Result<Vec<Entity<'_>>> {
        let state = self.state();
        let ids: Vec<EntityId> = state.soft_links.referrers(pid).collect();
        ids.into_iter().map(|id| state.entity(id)).collect()
    }

    /// Returns the entities whose indexed fields hold `url`, with the field.
    ///
    /// # Errors
    ///
    /// Returns an error if the index holds a dead id.
    fn find_by_url(&self, url: &VirtualFileUrl) -> Result<Vec<(Entity<'_>, &'static str)>> {
        let state = self.state();
        state
            .urls
            .find(url)
            .into_iter()
            .map(|(id, field)| Ok((state.entity(id)?, field)))
            .collect()
    }

    /// Returns the entities whose indexed fields hold `url` or a url below it.
    ///
    /// # Errors
    ///
    /// Returns an error if the index holds a dead id.
    fn find_under_url(&self, url: &VirtualFileUrl) -> Result<Vec<(Entity<'_>, &'static str)>> {
        let state = self.state();
        state
            .urls
            .find_under(url)
            .into_iter()
            .map(|(id, field)| Ok((state.entity(id)?, field)))
            .collect()
    }

    /// Returns the ordered children of a parent.
    fn extract_children(&self, connection: ConnectionId, parent: EntityId) -> im::Vector<EntityId> {
        self.state().refs.extract_children(connection, parent)
    }

    /// Returns the single child of a parent.
    fn extract_child(&self, connection: ConnectionId, parent: EntityId) -> Option<EntityId> {
        self.state().refs.extract_child(connection, parent)
    }

    /// Returns the parent of a child.
    fn extract_parent(&self, connection: ConnectionId, child: EntityId) -> Option<EntityId> {
        self.state().refs.extract_parent(connection, child)
    }

    /// Returns the number of live entities.
    fn entity_count(&self) -> usize {
        self.state().len()
    }

    /// Runs the full consistency check.
    ///
    /// # Errors
    ///
    /// Returns an internal error naming the first broken invariant.
    fn check_consistency(&self) -> Result<()> {
        self.state().check_consistency()
    }
}

/// An immutable point-in-time view of the entity graph.
///
/// Cloning is O(1). Snapshots are `Send + Sync` and can be read from any
/// number of threads without locking.
#[derive(Clone, Debug)]
pub struct EntityStorage {
    registry: Arc<SchemaRegistry>,
    state: Arc<StorageState>,
}

impl EntityStorage {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn empty(registry: Arc<SchemaRegistry>) -> Self {
        Self {
            registry,
            state: Arc::new(StorageState::default()),
        }
    }

    pub(crate) fn from_parts(registry: Arc<SchemaRegistry>, state: Arc<StorageState>) -> Self {
        Self { registry, state }
    }

    /// Returns the shared schema registry.
    #[must_use]
    pub fn registry_arc(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    pub(crate) fn state_arc(&self) -> &Arc<StorageState> {
        &self.state
    }

    /// Starts a mutable storage based on this snapshot.
    #[must_use]
    pub fn to_builder(&self) -> MutableEntityStorage {
        MutableEntityStorage::from_snapshot(self.clone())
    }

    /// Returns true if both snapshots share the same state.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

impl ReadStorage for EntityStorage {
    fn state(&self) -> &StorageState {
        &self.state
    }

    fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }
}
