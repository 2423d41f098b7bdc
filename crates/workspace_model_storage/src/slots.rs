//! Entity slot allocation with generational indices.
//!
//! The `SlotTable` hands out entity ids and tracks generations so that ids of
//! removed entities are detected as stale. It is persistent: cloning a table
//! is O(1) and edits on the clone never show through to the original.

// Allow u64 to usize casts - we target 64-bit systems
#![allow(clippy::cast_possible_truncation)]

use workspace_model_foundation::{EntityId, Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Generational slot allocator.
///
/// Freed slots are reused in LIFO order; every reuse bumps the generation by
/// two so the slot's previous ids stay stale forever.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SlotTable {
    /// Generation counter per slot. Even = free, odd = alive.
    generations: im::Vector<u32>,
    free_list: im::Vector<u64>,
    live_count: usize,
}

impl SlotTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a slot and returns its id.
    pub fn allocate(&mut self) -> EntityId {
        self.live_count += 1;

        if let Some(index) = self.free_list.pop_back() {
            let idx = index as usize;
            let generation = self.generations[idx] + 1;
            self.generations.set(idx, generation);
            EntityId::new(index, generation)
        } else {
            let index = self.generations.len() as u64;
            self.generations.push_back(1);
            EntityId::new(index, 1)
        }
    }

    /// Frees the slot of a live entity.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is stale or was never allocated.
    pub fn free(&mut self, id: EntityId) -> Result<()> {
        self.validate(id)?;

        let idx = id.index as usize;
        self.generations.set(idx, id.generation + 1);
        self.free_list.push_back(id.index);
        self.live_count -= 1;

        Ok(())
    }

    /// Returns true if the id refers to a live entity.
    #[must_use]
    pub fn is_live(&self, id: EntityId) -> bool {
        self.generations
            .get(id.index as usize)
            .is_some_and(|&generation| generation == id.generation && id.is_live_generation())
    }

    /// Validates that an id refers to a live entity.
    ///
    /// # Errors
    ///
    /// Returns `StaleEntity` if the slot was reused or freed since the id was
    /// issued, `EntityNotFound` if the slot never held a live entity.
    pub fn validate(&self, id: EntityId) -> Result<()> {
        let Some(&current) = self.generations.get(id.index as usize) else {
            return Err(Error::entity_not_found(id));
        };

        if current != id.generation {
            return Err(if id.generation < current && id.is_live_generation() {
                Error::stale_entity(id)
            } else {
                Error::entity_not_found(id)
            });
        }

        if current % 2 == 0 {
            return Err(Error::entity_not_found(id));
        }

        Ok(())
    }

    /// Returns the number of live entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live_count
    }

    /// Returns true if there are no live entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live_count == 0
    }

    /// Iterates over all live entity ids in slot order.
    pub fn iter(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.generations
            .iter()
            .enumerate()
            .filter(|(_, generation)| *generation % 2 == 1)
            .map(|(idx, generation)| EntityId::new(idx as u64, *generation))
    }

    /// Returns the current generation of a slot.
    #[must_use]
    pub fn generation(&self, index: u64) -> Option<u32> {
        self.generations.get(index as usize).copied()
    }
}
