//! Relationship table keyed by connection.
//!
//! Each connection keeps a forward map (parent to ordered children) and a
//! back map (child to parent). Both live in persistent maps, so the table is
//! versioned by copy-on-write: a snapshot holding a clone never observes
//! edits made to the mutable copy, and no intermediate state of a
//! re-parenting is visible to anyone but the writer.

use workspace_model_foundation::{EntityId, Error, Result};

use crate::connection::ConnectionId;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct ConnectionTable {
    children: im::OrdMap<EntityId, im::Vector<EntityId>>,
    parents: im::OrdMap<EntityId, EntityId>,
}

impl ConnectionTable {
    /// Detaches a child from its current parent, returning that parent.
    fn detach(&mut self, child: EntityId) -> Option<EntityId> {
        let parent = self.parents.remove(&child)?;
        let now_empty = match self.children.get_mut(&parent) {
            Some(list) => {
                list.retain(|c| *c != child);
                list.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.children.remove(&parent);
        }
        Some(parent)
    }
}

/// Bidirectional parent/child edges for every connection.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RefsTable {
    tables: im::OrdMap<ConnectionId, ConnectionTable>,
}

impl RefsTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn table_mut(&mut self, connection: ConnectionId) -> &mut ConnectionTable {
        self.tables
            .entry(connection)
            .or_insert_with(ConnectionTable::default)
    }

    /// Returns the ordered children of a parent.
    #[must_use]
    pub fn extract_children(&self, connection: ConnectionId, parent: EntityId) -> im::Vector<EntityId> {
        self.tables
            .get(&connection)
            .and_then(|t| t.children.get(&parent))
            .cloned()
            .unwrap_or_default()
    }

    /// Returns the single child of a parent.
    #[must_use]
    pub fn extract_child(&self, connection: ConnectionId, parent: EntityId) -> Option<EntityId> {
        self.tables
            .get(&connection)
            .and_then(|t| t.children.get(&parent))
            .and_then(|list| list.front().copied())
    }

    /// Returns the parent of a child.
    #[must_use]
    pub fn extract_parent(&self, connection: ConnectionId, child: EntityId) -> Option<EntityId> {
        self.tables
            .get(&connection)
            .and_then(|t| t.parents.get(&child))
            .copied()
    }

    /// Replaces the children of a parent.
    ///
    /// Children that belonged to another parent are moved. Returns the former
    /// children that are no longer attached to any parent.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConnection` if more than one child is given for a
    /// one-to-one connection.
    pub fn update_children_of_parent(
        &mut self,
        connection: ConnectionId,
        parent: EntityId,
        children: &[EntityId],
    ) -> Result<Vec<EntityId>> {
        let mut unique: im::Vector<EntityId> = im::Vector::new();
        for child in children {
            if !unique.contains(child) {
                unique.push_back(*child);
            }
        }
        if connection.is_one_to_one() && unique.len() > 1 {
            return Err(Error::invalid_connection(connection.to_string(), connection.parent));
        }
        Ok(self.replace_children(connection, parent, unique))
    }

    fn replace_children(
        &mut self,
        connection: ConnectionId,
        parent: EntityId,
        children: im::Vector<EntityId>,
    ) -> Vec<EntityId> {
        let table = self.table_mut(connection);
        let old = table.children.remove(&parent).unwrap_or_default();

        let detached: Vec<EntityId> = old
            .iter()
            .copied()
            .filter(|c| !children.contains(c))
            .collect();
        for child in &detached {
            table.parents.remove(child);
        }

        for child in &children {
            match table.parents.get(child).copied() {
                Some(previous) if previous == parent => {}
                Some(_) => {
                    table.detach(*child);
                }
                None => {}
            }
            table.parents.insert(*child, parent);
        }
        if !children.is_empty() {
            table.children.insert(parent, children);
        }

        tracing::trace!(%connection, %parent, detached = detached.len(), "replaced children");
        detached
    }

    /// Appends a child to a parent, moving it from its previous parent.
    ///
    /// For one-to-one connections the parent's previous child is displaced
    /// and returned.
    pub fn add_child(&mut self, connection: ConnectionId, parent: EntityId, child: EntityId) -> Vec<EntityId> {
        if connection.is_one_to_one() {
            return self.replace_children(connection, parent, im::vector![child]);
        }

        let table = self.table_mut(connection);
        if table.parents.get(&child) == Some(&parent) {
            return Vec::new();
        }
        table.detach(child);
        table.parents.insert(child, parent);
        table
            .children
            .entry(parent)
            .or_insert_with(im::Vector::new)
            .push_back(child);

        tracing::trace!(%connection, %parent, %child, "added child");
        Vec::new()
    }

    /// Sets or clears the parent of a child.
    ///
    /// The child is detached from its old parent first. Returns any child the
    /// new parent had to give up (one-to-one connections only).
    pub fn update_parent_of_child(
        &mut self,
        connection: ConnectionId,
        child: EntityId,
        parent: Option<EntityId>,
    ) -> Vec<EntityId> {
        match parent {
            Some(parent) => self.add_child(connection, parent, child),
            None => {
                self.remove_child(connection, child);
                Vec::new()
            }
        }
    }

    /// Detaches a child from its parent, returning the former parent.
    pub fn remove_child(&mut self, connection: ConnectionId, child: EntityId) -> Option<EntityId> {
        let parent = self.tables.get_mut(&connection)?.detach(child);
        if let Some(parent) = parent {
            tracing::trace!(%connection, %parent, %child, "removed child");
        }
        parent
    }

    /// Drops every edge touching an entity.
    ///
    /// Returns the children that were owned by the entity through
    /// connections whose parent is not nullable.
    pub fn remove_entity(&mut self, id: EntityId) -> Vec<EntityId> {
        let mut owned = Vec::new();
        let connections: Vec<ConnectionId> = self.tables.keys().copied().collect();
        for connection in connections {
            let Some(table) = self.tables.get_mut(&connection) else {
                continue;
            };
            if let Some(children) = table.children.remove(&id) {
                for child in &children {
                    table.parents.remove(child);
                }
                if connection.owns_children() {
                    owned.extend(children.iter().copied());
                }
            }
            table.detach(id);
        }
        tracing::trace!(%id, owned = owned.len(), "removed entity edges");
        owned
    }

    /// Iterates over every parent of an entity, across connections.
    pub fn parents_of(&self, child: EntityId) -> impl Iterator<Item = (ConnectionId, EntityId)> + '_ {
        self.tables
            .iter()
            .filter_map(move |(c, t)| t.parents.get(&child).map(|p| (*c, *p)))
    }

    /// Iterates over every child list of an entity, across connections.
    pub fn children_of(&self, parent: EntityId) -> impl Iterator<Item = (ConnectionId, &im::Vector<EntityId>)> + '_ {
        self.tables
            .iter()
            .filter_map(move |(c, t)| t.children.get(&parent).map(|list| (*c, list)))
    }

    /// Iterates over all forward edges as `(connection, parent, children)`.
    pub fn forward_edges(&self) -> impl Iterator<Item = (ConnectionId, EntityId, &im::Vector<EntityId>)> + '_ {
        self.tables.iter().flat_map(|(c, t)| {
            t.children.iter().map(move |(p, list)| (*c, *p, list))
        })
    }

    /// Iterates over all back edges as `(connection, child, parent)`.
    pub fn back_edges(&self) -> impl Iterator<Item = (ConnectionId, EntityId, EntityId)> + '_ {
        self.tables
            .iter()
            .flat_map(|(c, t)| t.parents.iter().map(move |(ch, p)| (*c, *ch, *p)))
    }

    /// Returns the total number of parent/child edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.tables.values().map(|t| t.parents.len()).sum()
    }
}
