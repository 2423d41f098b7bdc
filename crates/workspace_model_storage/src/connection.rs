//! Typed identifiers of relationship slots.

use std::fmt;

/// Cardinality kind of a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConnectionType {
    /// Parent holds at most one child of a concrete type.
    OneToOne,
    /// Parent holds an ordered list of children of a concrete type.
    OneToMany,
    /// Parent holds at most one child of any subtype of an abstract type.
    AbstractOneToOne,
    /// Parent holds an ordered list of children of any subtype of an abstract type.
    AbstractOneToMany,
}

impl ConnectionType {
    /// Returns true if the parent holds at most one child.
    #[must_use]
    pub const fn is_one_to_one(self) -> bool {
        matches!(self, Self::OneToOne | Self::AbstractOneToOne)
    }

    /// Returns true if the child type is polymorphic.
    #[must_use]
    pub const fn is_abstract(self) -> bool {
        matches!(self, Self::AbstractOneToOne | Self::AbstractOneToMany)
    }
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::OneToOne => "one-to-one",
            Self::OneToMany => "one-to-many",
            Self::AbstractOneToOne => "abstract-one-to-one",
            Self::AbstractOneToMany => "abstract-one-to-many",
        })
    }
}

/// Identity of one relationship slot between two entity types.
///
/// Connection ids are plain values: two ids declared separately for the same
/// type pair and kind are the same connection. They are meant to be declared
/// once as `const` items next to the schemas that use them.
///
/// For abstract kinds, `child` names the nearest common abstract ancestor of
/// every concrete child type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId {
    /// Parent entity type.
    pub parent: &'static str,
    /// Child entity type, or its abstract ancestor.
    pub child: &'static str,
    /// Cardinality kind.
    pub kind: ConnectionType,
    /// If false, the child cannot exist without a parent and is removed with it.
    pub is_parent_nullable: bool,
}

impl ConnectionId {
    /// Declares a connection.
    #[must_use]
    pub const fn new(
        parent: &'static str,
        child: &'static str,
        kind: ConnectionType,
        is_parent_nullable: bool,
    ) -> Self {
        Self {
            parent,
            child,
            kind,
            is_parent_nullable,
        }
    }

    /// Returns true if the parent holds at most one child.
    #[must_use]
    pub const fn is_one_to_one(&self) -> bool {
        self.kind.is_one_to_one()
    }

    /// Returns true if children are owned by their parent.
    #[must_use]
    pub const fn owns_children(&self) -> bool {
        !self.is_parent_nullable
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} ({})", self.parent, self.child, self.kind)
    }
}

/// Key of a relationship that is not declared in the holder's schema.
///
/// Extension references let one entity type attach relationships to another
/// without changing it, e.g. a packaging element that hangs off a library.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExtRefKey {
    /// Entity type that declares the extension field.
    pub declaring_type: &'static str,
    /// Extension field name.
    pub field: &'static str,
    /// True if the referenced entities are children of the holder.
    pub is_child: bool,
    /// Connection the reference is stored under.
    pub connection: ConnectionId,
}

impl ExtRefKey {
    /// Declares an extension field holding children of the holder.
    #[must_use]
    pub const fn child(declaring_type: &'static str, field: &'static str, connection: ConnectionId) -> Self {
        Self {
            declaring_type,
            field,
            is_child: true,
            connection,
        }
    }

    /// Declares an extension field holding the parent of the holder.
    #[must_use]
    pub const fn parent(declaring_type: &'static str, field: &'static str, connection: ConnectionId) -> Self {
        Self {
            declaring_type,
            field,
            is_child: false,
            connection,
        }
    }
}

impl fmt::Display for ExtRefKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.declaring_type, self.field)
    }
}
