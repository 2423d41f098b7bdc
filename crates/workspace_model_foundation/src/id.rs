//! Persistent (symbolic) entity identifiers.

use std::fmt;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Stable, human-meaningful identifier of an entity.
///
/// Unlike [`EntityId`](crate::EntityId), a persistent id is computed from the
/// entity's own data (for example `LibraryId(name, tableId)`) and therefore
/// survives removal and re-creation of the entity. Entities refer to each
/// other by persistent id through soft links.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PersistentId {
    kind: Arc<str>,
    parts: im::Vector<Value>,
}

impl PersistentId {
    /// Creates a persistent id of the given kind from its components.
    #[must_use]
    pub fn new<I>(kind: &str, parts: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        Self {
            kind: Arc::from(kind),
            parts: parts.into_iter().collect(),
        }
    }

    /// Returns the id kind, e.g. `"LibraryId"`.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns the id components in declaration order.
    #[must_use]
    pub fn parts(&self) -> &im::Vector<Value> {
        &self.parts
    }

    /// Returns one component by position.
    #[must_use]
    pub fn part(&self, index: usize) -> Option<&Value> {
        self.parts.get(index)
    }

    /// Returns the name shown to users: the first string component.
    #[must_use]
    pub fn presentable_name(&self) -> &str {
        self.parts.iter().find_map(Value::as_str).unwrap_or(&self.kind)
    }

    /// Returns a copy with every nested occurrence of `old` replaced by `new`.
    ///
    /// Returns `None` if `old` does not occur.
    #[must_use]
    pub fn replace_id(&self, old: &PersistentId, new: &PersistentId) -> Option<PersistentId> {
        if self == old {
            return Some(new.clone());
        }
        let mut changed = false;
        let parts = self
            .parts
            .iter()
            .map(|part| match part.replace_id(old, new) {
                Some(replaced) => {
                    changed = true;
                    replaced
                }
                None => part.clone(),
            })
            .collect();
        changed.then(|| Self {
            kind: self.kind.clone(),
            parts,
        })
    }
}

impl fmt::Debug for PersistentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for PersistentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.kind)?;
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{part}")?;
        }
        write!(f, ")")
    }
}
