//! Entity identifiers with generation-stamped slot indices.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Identity of one entity inside a storage lineage.
///
/// The slot index is reused after an entity is removed; the generation is
/// bumped on every reuse so an id captured before the removal never resolves
/// to the entity that later occupies the same slot.
///
/// Odd generations mark live slots, even generations mark free ones.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EntityId {
    /// Slot index into entity storage.
    pub index: u64,
    /// Generation stamp of the slot at allocation time.
    pub generation: u32,
}

impl EntityId {
    /// Creates an entity id from a slot index and generation.
    #[must_use]
    pub const fn new(index: u64, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Returns true if the generation marks a live slot.
    #[must_use]
    pub const fn is_live_generation(self) -> bool {
        self.generation % 2 == 1
    }

    /// Returns the id that the same slot receives on its next reuse.
    #[must_use]
    pub const fn next_generation(self) -> Self {
        Self {
            index: self.index,
            generation: self.generation + 2,
        }
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({}v{})", self.index, self.generation)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index)
    }
}
