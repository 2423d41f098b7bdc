//! Full consistency check of a storage state.
//!
//! Recomputes every index from the entity data and walks both directions of
//! the relationship table. Cheap enough for tests, too slow for production
//! paths unless `StorageConfig::assert_consistency` is set.

use std::collections::BTreeSet;

use thiserror::Error;
use workspace_model_foundation::{EntityId, Error as StorageError, Result, VirtualFileUrl};

use crate::connection::ConnectionId;
use crate::schema::RelationSide;
use crate::state::StorageState;

/// One broken invariant found by [`StorageState::violations`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConsistencyViolation {
    /// Data is stored for a slot that is not live.
    #[error("entity {0:?} has data but its slot is free")]
    DeadEntity(EntityId),

    /// A live slot has no data.
    #[error("live entity {0:?} has no data")]
    MissingData(EntityId),

    /// The per-type index disagrees with the stored data.
    #[error("type index entry {entity_type} of {id:?} is wrong")]
    TypeIndexMismatch {
        /// The entity.
        id: EntityId,
        /// Type named by the index.
        entity_type: &'static str,
    },

    /// An edge points at an entity that is not live.
    #[error("edge of {connection} touches dead entity {id:?}")]
    DanglingEdge {
        /// The connection.
        connection: ConnectionId,
        /// The dead endpoint.
        id: EntityId,
    },

    /// Forward and back maps disagree.
    #[error("{connection}: forward and back pointers of {child:?} disagree")]
    BrokenBackPointer {
        /// The connection.
        connection: ConnectionId,
        /// The child whose edge is broken.
        child: EntityId,
    },

    /// A one-to-one parent has several children.
    #[error("{connection}: parent {parent:?} has {count} children")]
    MultipleChildren {
        /// The connection.
        connection: ConnectionId,
        /// The parent.
        parent: EntityId,
        /// Number of children found.
        count: usize,
    },

    /// An endpoint's type does not fit the connection.
    #[error("{connection}: {id:?} of type {entity_type} does not fit")]
    WrongEndpointType {
        /// The connection.
        connection: ConnectionId,
        /// The endpoint.
        id: EntityId,
        /// Its type.
        entity_type: &'static str,
    },

    /// A required relationship does not resolve.
    #[error("relationship {entity_type}#{field} of {id:?} is unresolved")]
    MissingRelationship {
        /// The holder.
        id: EntityId,
        /// Its type.
        entity_type: &'static str,
        /// The slot.
        field: &'static str,
    },

    /// A required scalar is unset.
    #[error("field {entity_type}#{field} of {id:?} is unset")]
    MissingField {
        /// The entity.
        id: EntityId,
        /// Its type.
        entity_type: &'static str,
        /// The unset field.
        field: &'static str,
    },

    /// A set field holds a value its type does not accept.
    #[error("field {entity_type}#{field} of {id:?} holds a value of the wrong type")]
    MistypedField {
        /// The entity.
        id: EntityId,
        /// Its type.
        entity_type: &'static str,
        /// The offending field.
        field: &'static str,
    },

    /// The persistent id index disagrees with the recomputed id.
    #[error("persistent id index is stale for {0:?}")]
    PersistentIdMismatch(EntityId),

    /// The soft link index disagrees with the stored links.
    #[error("soft link index is stale for {0:?}")]
    SoftLinkMismatch(EntityId),

    /// The url index disagrees with the stored urls.
    #[error("url index is stale for {0:?}")]
    UrlIndexMismatch(EntityId),
}

impl StorageState {
    /// Collects every broken invariant.
    #[must_use]
    pub fn violations(&self) -> Vec<ConsistencyViolation> {
        let mut found = Vec::new();
        self.check_entities(&mut found);
        self.check_edges(&mut found);
        self.check_indices(&mut found);
        found
    }

    /// Fails on the first broken invariant.
    ///
    /// # Errors
    ///
    /// Returns an internal error describing the first violation.
    pub fn check_consistency(&self) -> Result<()> {
        let found = self.violations();
        match found.first() {
            None => Ok(()),
            Some(first) => {
                tracing::warn!(violations = found.len(), "storage is inconsistent");
                Err(StorageError::internal(format!("inconsistent storage: {first}")))
            }
        }
    }

    fn check_entities(&self, found: &mut Vec<ConsistencyViolation>) {
        for (id, data) in &self.data {
            let id = *id;
            if !self.slots.is_live(id) {
                found.push(ConsistencyViolation::DeadEntity(id));
                continue;
            }
            let entity_type = data.entity_type();
            if !self
                .by_type
                .get(entity_type)
                .is_some_and(|ids| ids.contains(&id))
            {
                found.push(ConsistencyViolation::TypeIndexMismatch { id, entity_type });
            }

            let schema = data.schema();
            for field in schema.fields.iter().filter(|f| f.required) {
                if !data.is_initialized(field.name) {
                    found.push(ConsistencyViolation::MissingField {
                        id,
                        entity_type,
                        field: field.name,
                    });
                }
            }
            for field in data.mistyped_fields() {
                found.push(ConsistencyViolation::MistypedField {
                    id,
                    entity_type,
                    field,
                });
            }
            for slot in schema.connections.iter().filter(|s| s.must_resolve()) {
                let resolved = match slot.side {
                    RelationSide::Children => self.refs.extract_child(slot.connection, id).is_some(),
                    RelationSide::Parent => self.refs.extract_parent(slot.connection, id).is_some(),
                };
                if !resolved {
                    found.push(ConsistencyViolation::MissingRelationship {
                        id,
                        entity_type,
                        field: slot.name,
                    });
                }
            }
        }

        for id in self.slots.iter() {
            if !self.data.contains_key(&id) {
                found.push(ConsistencyViolation::MissingData(id));
            }
        }
        for (entity_type, ids) in &self.by_type {
            for id in ids {
                if self.data.get(id).map(|d| d.entity_type()) != Some(*entity_type) {
                    found.push(ConsistencyViolation::TypeIndexMismatch {
                        id: *id,
                        entity_type: *entity_type,
                    });
                }
            }
        }
    }

    fn check_endpoint(
        &self,
        connection: ConnectionId,
        id: EntityId,
        expected: &str,
        found: &mut Vec<ConsistencyViolation>,
    ) {
        match self.data_of(id) {
            None => found.push(ConsistencyViolation::DanglingEdge { connection, id }),
            Some(data) if !data.schema().is_subtype_of(expected) => {
                found.push(ConsistencyViolation::WrongEndpointType {
                    connection,
                    id,
                    entity_type: data.entity_type(),
                });
            }
            Some(_) => {}
        }
    }

    fn check_edges(&self, found: &mut Vec<ConsistencyViolation>) {
        for (connection, parent, children) in self.refs.forward_edges() {
            self.check_endpoint(connection, parent, connection.parent, found);
            if connection.is_one_to_one() && children.len() > 1 {
                found.push(ConsistencyViolation::MultipleChildren {
                    connection,
                    parent,
                    count: children.len(),
                });
            }
            for child in children {
                self.check_endpoint(connection, *child, connection.child, found);
                if self.refs.extract_parent(connection, *child) != Some(parent) {
                    found.push(ConsistencyViolation::BrokenBackPointer {
                        connection,
                        child: *child,
                    });
                }
            }
        }
        for (connection, child, parent) in self.refs.back_edges() {
            if !self.refs.extract_children(connection, parent).contains(&child) {
                found.push(ConsistencyViolation::BrokenBackPointer { connection, child });
            }
        }
    }

    fn check_indices(&self, found: &mut Vec<ConsistencyViolation>) {
        let mut with_pid = 0;
        for (id, data) in &self.data {
            let id = *id;
            match data.persistent_id() {
                Ok(Some(pid)) => {
                    with_pid += 1;
                    if self.persistent_ids.get(&pid) != Some(id)
                        || self.persistent_ids.persistent_id_of(id) != Some(&pid)
                    {
                        found.push(ConsistencyViolation::PersistentIdMismatch(id));
                    }
                }
                Ok(None) => {
                    if self.persistent_ids.persistent_id_of(id).is_some() {
                        found.push(ConsistencyViolation::PersistentIdMismatch(id));
                    }
                }
                Err(_) => found.push(ConsistencyViolation::PersistentIdMismatch(id)),
            }

            if self.soft_links.links_of(id) != data.soft_links() {
                found.push(ConsistencyViolation::SoftLinkMismatch(id));
            }

            for (field, urls) in data.indexed_urls() {
                let stored: BTreeSet<VirtualFileUrl> = self.urls.urls_of(id, field).into_iter().collect();
                let expected: BTreeSet<VirtualFileUrl> = urls.into_iter().collect();
                if stored != expected {
                    found.push(ConsistencyViolation::UrlIndexMismatch(id));
                }
            }
        }
        if with_pid != self.persistent_ids.len() {
            tracing::trace!(
                indexed = self.persistent_ids.len(),
                expected = with_pid,
                "persistent id index has extra entries"
            );
            for id in self.slots.iter() {
                let stale = self
                    .persistent_ids
                    .persistent_id_of(id)
                    .is_some_and(|pid| self.persistent_ids.get(pid) != Some(id));
                if stale {
                    found.push(ConsistencyViolation::PersistentIdMismatch(id));
                }
            }
        }
    }
}
