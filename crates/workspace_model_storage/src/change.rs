//! Change log of a mutable storage relative to its base snapshot.

use std::collections::BTreeSet;
use std::fmt;

use workspace_model_foundation::EntityId;

/// One entity-level change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntityChange {
    /// The entity did not exist in the base snapshot.
    Added {
        /// Id of the new entity.
        id: EntityId,
        /// Its type.
        entity_type: &'static str,
    },
    /// The entity existed in the base snapshot and was modified.
    Replaced {
        /// Id of the entity.
        id: EntityId,
        /// Its type.
        entity_type: &'static str,
        /// Fields and slots that were set, in name order.
        changed: Vec<&'static str>,
    },
    /// The entity existed in the base snapshot and was removed.
    Removed {
        /// Id of the removed entity.
        id: EntityId,
        /// Its type.
        entity_type: &'static str,
    },
}

impl EntityChange {
    /// Returns the id of the changed entity.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        match self {
            Self::Added { id, .. } | Self::Replaced { id, .. } | Self::Removed { id, .. } => *id,
        }
    }

    /// Returns the type of the changed entity.
    #[must_use]
    pub const fn entity_type(&self) -> &'static str {
        match self {
            Self::Added { entity_type, .. }
            | Self::Replaced { entity_type, .. }
            | Self::Removed { entity_type, .. } => *entity_type,
        }
    }
}

impl fmt::Display for EntityChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added { id, entity_type } => write!(f, "+ {entity_type} {id}"),
            Self::Replaced {
                id,
                entity_type,
                changed,
            } => write!(f, "~ {entity_type} {id} [{}]", changed.join(", ")),
            Self::Removed { id, entity_type } => write!(f, "- {entity_type} {id}"),
        }
    }
}

/// Net changes since a base snapshot, one entry per entity.
///
/// Events are folded as they arrive: a modification of an added entity stays
/// an addition, a removal of an added entity cancels both, and repeated
/// modifications merge their changed-property sets.
#[derive(Clone, Debug, Default)]
pub struct ChangeLog {
    entries: im::OrdMap<EntityId, (u64, EntityChange)>,
    next_seq: u64,
}

impl ChangeLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one event into the log.
    pub fn record(&mut self, change: EntityChange) {
        let id = change.id();
        let seq = self.next_seq;
        self.next_seq += 1;

        let merged = match (self.entries.remove(&id), change) {
            (None, change) => Some((seq, change)),
            (Some((s, added @ EntityChange::Added { .. })), EntityChange::Replaced { .. }) => {
                Some((s, added))
            }
            (Some((_, EntityChange::Added { .. })), EntityChange::Removed { .. }) => None,
            (
                Some((s, EntityChange::Replaced { changed: before, .. })),
                EntityChange::Replaced {
                    id,
                    entity_type,
                    changed,
                },
            ) => {
                let union: BTreeSet<&'static str> = before.into_iter().chain(changed).collect();
                Some((
                    s,
                    EntityChange::Replaced {
                        id,
                        entity_type,
                        changed: union.into_iter().collect(),
                    },
                ))
            }
            (Some((s, EntityChange::Replaced { .. })), removed @ EntityChange::Removed { .. }) => {
                Some((s, removed))
            }
            (Some(previous), change) => {
                tracing::trace!(%id, ?previous, ?change, "unexpected change sequence");
                Some((seq, change))
            }
        };
        if let Some(entry) = merged {
            self.entries.insert(id, entry);
        }
    }

    /// Folds a batch of events.
    pub fn extend(&mut self, changes: impl IntoIterator<Item = EntityChange>) {
        for change in changes {
            self.record(change);
        }
    }

    /// Returns the net changes in first-seen order.
    #[must_use]
    pub fn changes(&self) -> Vec<EntityChange> {
        let mut entries: Vec<_> = self.entries.values().cloned().collect();
        entries.sort_by_key(|(seq, _)| *seq);
        entries.into_iter().map(|(_, change)| change).collect()
    }

    /// Returns true if nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of changed entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
