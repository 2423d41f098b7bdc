//! Error types for the workspace model.
//!
//! Uses `thiserror` for ergonomic error definition with rich context.

use std::fmt;

use thiserror::Error;

use crate::entity::EntityId;
use crate::id::PersistentId;
use crate::types::FieldType;

/// The main error type for workspace model operations.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional context about where the error occurred.
    pub context: Option<ErrorContext>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Adds context to this error, replacing any existing context.
    #[must_use]
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Pushes an operation frame onto the error context, creating it if needed.
    #[must_use]
    pub fn in_frame(mut self, frame: impl Into<String>) -> Self {
        let context = self.context.take().unwrap_or_default();
        self.context = Some(context.with_frame(frame));
        self
    }

    /// Creates an uninitialized field error.
    #[must_use]
    pub fn uninitialized_field(entity_type: &str, field: &str) -> Self {
        Self::new(ErrorKind::UninitializedField {
            entity_type: entity_type.to_string(),
            field: field.to_string(),
        })
    }

    /// Creates a frozen entity error.
    #[must_use]
    pub fn frozen_entity(entity_type: &str) -> Self {
        Self::new(ErrorKind::FrozenEntity {
            entity_type: entity_type.to_string(),
        })
    }

    /// Creates a cross-builder error.
    #[must_use]
    pub fn cross_builder(entity_type: &str) -> Self {
        Self::new(ErrorKind::CrossBuilderEntity {
            entity_type: entity_type.to_string(),
        })
    }

    /// Creates a missing required field error.
    #[must_use]
    pub fn missing_required_field(entity_type: &str, field: &str) -> Self {
        Self::new(ErrorKind::MissingRequiredField {
            entity_type: entity_type.to_string(),
            field: field.to_string(),
        })
    }

    /// Creates an unresolved parent list error.
    #[must_use]
    pub fn unresolved_parent_list(entity_type: &str, field: &str) -> Self {
        Self::new(ErrorKind::UnresolvedParentList {
            entity_type: entity_type.to_string(),
            field: field.to_string(),
        })
    }

    /// Creates an entity not found error.
    #[must_use]
    pub fn entity_not_found(id: EntityId) -> Self {
        Self::new(ErrorKind::EntityNotFound(id))
    }

    /// Creates a stale entity reference error.
    #[must_use]
    pub fn stale_entity(id: EntityId) -> Self {
        Self::new(ErrorKind::StaleEntity(id))
    }

    /// Creates an unknown entity type error.
    #[must_use]
    pub fn unknown_entity_type(name: &str) -> Self {
        Self::new(ErrorKind::UnknownEntityType(name.to_string()))
    }

    /// Creates an unknown field error.
    #[must_use]
    pub fn unknown_field(entity_type: &str, field: &str) -> Self {
        Self::new(ErrorKind::UnknownField {
            entity_type: entity_type.to_string(),
            field: field.to_string(),
        })
    }

    /// Creates a field type mismatch error.
    #[must_use]
    pub fn type_mismatch(entity_type: &str, field: &str, expected: FieldType, actual: String) -> Self {
        Self::new(ErrorKind::TypeMismatch {
            entity_type: entity_type.to_string(),
            field: field.to_string(),
            expected,
            actual,
        })
    }

    /// Creates an invalid connection error.
    #[must_use]
    pub fn invalid_connection(connection: impl Into<String>, entity_type: &str) -> Self {
        Self::new(ErrorKind::InvalidConnection {
            connection: connection.into(),
            entity_type: entity_type.to_string(),
        })
    }

    /// Creates a duplicate persistent id error.
    #[must_use]
    pub fn duplicate_persistent_id(id: PersistentId) -> Self {
        Self::new(ErrorKind::DuplicatePersistentId(id))
    }

    /// Creates an internal invariant violation error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal(message.into()))
    }
}

/// Categorized error kinds for pattern matching.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// A field was read before it was set.
    #[error("field {entity_type}#{field} is not initialized")]
    UninitializedField {
        /// The entity type declaring the field.
        entity_type: String,
        /// The field that was read.
        field: String,
    },

    /// A builder was mutated outside of a mutable phase.
    #[error("entity {entity_type} is frozen; modify it through its storage")]
    FrozenEntity {
        /// The entity type of the frozen builder.
        entity_type: String,
    },

    /// A builder was attached to a second storage.
    #[error("entity {entity_type} is already created in a different builder")]
    CrossBuilderEntity {
        /// The entity type of the builder.
        entity_type: String,
    },

    /// A required field or relationship was not set at commit time.
    #[error("field {entity_type}#{field} should be initialized")]
    MissingRequiredField {
        /// The entity type declaring the field.
        entity_type: String,
        /// The missing field.
        field: String,
    },

    /// A parent relationship was given a list of entities.
    #[error("cannot have parent lists: {entity_type}#{field}")]
    UnresolvedParentList {
        /// The entity type declaring the relationship.
        entity_type: String,
        /// The relationship field.
        field: String,
    },

    /// Entity was not found in storage.
    #[error("entity not found: {0:?}")]
    EntityNotFound(EntityId),

    /// Entity reference is stale (generation mismatch).
    #[error("stale entity reference: {0:?}")]
    StaleEntity(EntityId),

    /// Entity type is not registered.
    #[error("unknown entity type: {0}")]
    UnknownEntityType(String),

    /// Field is not declared by the entity type.
    #[error("unknown field: {entity_type}#{field}")]
    UnknownField {
        /// The entity type that was queried.
        entity_type: String,
        /// The field name that was not found.
        field: String,
    },

    /// Value does not match the declared field type.
    #[error("type mismatch for {entity_type}#{field}: expected {expected}, got {actual}")]
    TypeMismatch {
        /// The entity type declaring the field.
        entity_type: String,
        /// The field being set.
        field: String,
        /// The declared field type.
        expected: FieldType,
        /// Description of the offered value.
        actual: String,
    },

    /// Relationship endpoint does not fit the connection.
    #[error("entity {entity_type} cannot be used with connection {connection}")]
    InvalidConnection {
        /// The connection description.
        connection: String,
        /// The offending entity type.
        entity_type: String,
    },

    /// Two live entities would share one persistent id.
    #[error("entity with persistent id {0} already exists")]
    DuplicatePersistentId(PersistentId),

    /// Generated schema code does not match the configured generator version.
    #[error("generated code of {entity_type} has version {found}, expected {expected}; regenerate entities")]
    IncompatibleGeneratedCode {
        /// The entity type whose schema was checked.
        entity_type: String,
        /// The configured version.
        expected: u32,
        /// The version recorded in the schema.
        found: u32,
    },

    /// Internal error (should not happen).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Context about where an error occurred.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Entity type being processed.
    pub entity_type: Option<String>,
    /// Entity id being processed, if already assigned.
    pub entity: Option<EntityId>,
    /// Operation frames, innermost first.
    pub stack: Vec<String>,
}

impl ErrorContext {
    /// Creates a new empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the entity type.
    #[must_use]
    pub fn with_entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    /// Sets the entity id.
    #[must_use]
    pub fn with_entity(mut self, entity: EntityId) -> Self {
        self.entity = Some(entity);
        self
    }

    /// Adds an operation frame.
    #[must_use]
    pub fn with_frame(mut self, frame: impl Into<String>) -> Self {
        self.stack.push(frame.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(entity_type) = &self.entity_type {
            write!(f, "in {entity_type}")?;
            if let Some(entity) = self.entity {
                write!(f, " {entity:?}")?;
            }
        }
        if !self.stack.is_empty() {
            writeln!(f)?;
            for frame in &self.stack {
                writeln!(f, "  in {frame}")?;
            }
        }
        Ok(())
    }
}
