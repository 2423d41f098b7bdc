//! Field type descriptors for schema validation.

use std::fmt;

use crate::value::Value;

/// Type descriptor of an entity scalar field.
///
/// Used by entity schemas to validate every value handed to a builder setter.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// Boolean flag.
    Bool,
    /// 64-bit signed integer.
    Int,
    /// String.
    String,
    /// Virtual file url.
    Url,
    /// Persistent id of the named kind (a soft link).
    Id(&'static str),
    /// Structured record with the named type.
    Record(&'static str),
    /// Homogeneous list.
    List(Box<FieldType>),
    /// Value or null.
    Option(Box<FieldType>),
    /// Any value.
    Any,
}

impl FieldType {
    /// Creates a list type with the given element type.
    #[must_use]
    pub fn list(element: FieldType) -> Self {
        Self::List(Box::new(element))
    }

    /// Creates an optional type.
    #[must_use]
    pub fn option(inner: FieldType) -> Self {
        Self::Option(Box::new(inner))
    }

    /// Returns true if a null value is accepted.
    #[must_use]
    pub const fn is_nullable(&self) -> bool {
        matches!(self, Self::Option(_) | Self::Any)
    }

    /// Checks a value against this type, recursing into lists.
    #[must_use]
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Any, _)
            | (Self::Bool, Value::Bool(_))
            | (Self::Int, Value::Int(_))
            | (Self::String, Value::String(_))
            | (Self::Url, Value::Url(_))
            | (Self::Option(_), Value::Null) => true,
            (Self::Option(inner), other) => inner.accepts(other),
            (Self::Id(kind), Value::Id(id)) => id.kind() == *kind,
            (Self::Record(name), Value::Record(record)) => record.name() == *name,
            (Self::List(element), Value::List(items)) => items.iter().all(|v| element.accepts(v)),
            _ => false,
        }
    }
}

impl fmt::Debug for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "bool"),
            Self::Int => write!(f, "int"),
            Self::String => write!(f, "string"),
            Self::Url => write!(f, "url"),
            Self::Id(kind) => write!(f, "id<{kind}>"),
            Self::Record(name) => write!(f, "record<{name}>"),
            Self::List(t) => write!(f, "list<{t:?}>"),
            Self::Option(t) => write!(f, "option<{t:?}>"),
            Self::Any => write!(f, "any"),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
