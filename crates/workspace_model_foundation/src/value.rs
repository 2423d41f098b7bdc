//! Tagged-union representation of entity field values.

use std::fmt;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::id::PersistentId;
use crate::url::VirtualFileUrl;

/// Value of one scalar entity field.
///
/// Values are immutable and cheaply cloneable. Lists and records use
/// persistent collections, so cloning a large value shares its structure.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Value {
    /// Absent value of an optional field.
    #[default]
    Null,
    /// Boolean value.
    Bool(bool),
    /// 64-bit signed integer.
    Int(i64),
    /// String value.
    String(Arc<str>),
    /// Virtual file url.
    Url(VirtualFileUrl),
    /// Persistent id (a soft link to another entity).
    Id(PersistentId),
    /// Persistent list.
    List(im::Vector<Value>),
    /// Named structured record, e.g. a library root.
    Record(Record),
}

/// Named record value with ordered fields.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Record {
    name: Arc<str>,
    fields: im::OrdMap<Arc<str>, Value>,
}

impl Record {
    /// Creates a record from its type name and fields.
    #[must_use]
    pub fn new<'a, I>(name: &str, fields: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, Value)>,
    {
        Self {
            name: Arc::from(name),
            fields: fields
                .into_iter()
                .map(|(k, v)| (Arc::from(k), v))
                .collect(),
        }
    }

    /// Returns the record type name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a field by name.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Iterates fields in name order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_ref(), v))
    }

    /// Returns a copy with one field replaced.
    #[must_use]
    pub fn with(&self, field: &str, value: Value) -> Self {
        Self {
            name: self.name.clone(),
            fields: self.fields.update(Arc::from(field), value),
        }
    }
}

impl Value {
    /// Creates a record value.
    #[must_use]
    pub fn record<'a, I>(name: &str, fields: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, Value)>,
    {
        Self::Record(Record::new(name, fields))
    }

    /// Creates a list value.
    #[must_use]
    pub fn list<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        Self::List(items.into_iter().collect())
    }

    /// Returns a short name of the value's variant, used in error messages.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::String(_) => "string",
            Self::Url(_) => "url",
            Self::Id(_) => "id",
            Self::List(_) => "list",
            Self::Record(_) => "record",
        }
    }

    /// Returns true if this value is null.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Attempts to extract a boolean value.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Attempts to extract an integer value.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Attempts to extract a string reference.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Attempts to extract a url.
    #[must_use]
    pub const fn as_url(&self) -> Option<&VirtualFileUrl> {
        match self {
            Self::Url(url) => Some(url),
            _ => None,
        }
    }

    /// Attempts to extract a persistent id.
    #[must_use]
    pub const fn as_id(&self) -> Option<&PersistentId> {
        match self {
            Self::Id(id) => Some(id),
            _ => None,
        }
    }

    /// Attempts to extract a list.
    #[must_use]
    pub const fn as_list(&self) -> Option<&im::Vector<Value>> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Attempts to extract a record.
    #[must_use]
    pub const fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Visits every persistent id nested in this value, outermost first.
    pub fn visit_ids<'a>(&'a self, f: &mut impl FnMut(&'a PersistentId)) {
        match self {
            Self::Id(id) => {
                f(id);
                for part in id.parts() {
                    part.visit_ids(f);
                }
            }
            Self::List(items) => items.iter().for_each(|v| v.visit_ids(f)),
            Self::Record(record) => record.fields.values().for_each(|v| v.visit_ids(f)),
            _ => {}
        }
    }

    /// Visits every url nested in this value.
    pub fn visit_urls<'a>(&'a self, f: &mut impl FnMut(&'a VirtualFileUrl)) {
        match self {
            Self::Url(url) => f(url),
            Self::List(items) => items.iter().for_each(|v| v.visit_urls(f)),
            Self::Record(record) => record.fields.values().for_each(|v| v.visit_urls(f)),
            _ => {}
        }
    }

    /// Collects the top-level persistent ids of this value.
    ///
    /// Ids nested inside another id are components of that id, not links of
    /// their own, and are skipped.
    #[must_use]
    pub fn linked_ids(&self) -> Vec<PersistentId> {
        let mut out = Vec::new();
        self.collect_linked_ids(&mut out);
        out
    }

    fn collect_linked_ids(&self, out: &mut Vec<PersistentId>) {
        match self {
            Self::Id(id) => out.push(id.clone()),
            Self::List(items) => items.iter().for_each(|v| v.collect_linked_ids(out)),
            Self::Record(record) => record.fields.values().for_each(|v| v.collect_linked_ids(out)),
            _ => {}
        }
    }

    /// Collects every url nested in this value.
    #[must_use]
    pub fn urls(&self) -> Vec<VirtualFileUrl> {
        let mut out = Vec::new();
        self.visit_urls(&mut |url| out.push(url.clone()));
        out
    }

    /// Returns a copy with every nested occurrence of `old` replaced by `new`.
    ///
    /// Returns `None` if `old` does not occur.
    #[must_use]
    pub fn replace_id(&self, old: &PersistentId, new: &PersistentId) -> Option<Value> {
        match self {
            Self::Id(id) => id.replace_id(old, new).map(Self::Id),
            Self::List(items) => {
                let mut changed = false;
                let replaced = items
                    .iter()
                    .map(|item| match item.replace_id(old, new) {
                        Some(v) => {
                            changed = true;
                            v
                        }
                        None => item.clone(),
                    })
                    .collect();
                changed.then_some(Self::List(replaced))
            }
            Self::Record(record) => {
                let mut fields = record.fields.clone();
                let mut changed = false;
                for (key, value) in &record.fields {
                    if let Some(v) = value.replace_id(old, new) {
                        fields.insert(key.clone(), v);
                        changed = true;
                    }
                }
                changed.then(|| {
                    Self::Record(Record {
                        name: record.name.clone(),
                        fields,
                    })
                })
            }
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s:?}"),
            Self::Url(url) => write!(f, "{url:?}"),
            Self::List(items) => f.debug_list().entries(items.iter()).finish(),
            other => fmt::Display::fmt(other, f),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
            Self::Url(url) => write!(f, "{url}"),
            Self::Id(id) => write!(f, "{id}"),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Record(record) => write!(f, "{record}"),
        }
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, (k, v)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{k}={v}")?;
        }
        write!(f, ")")
    }
}

// Convenience From implementations

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(Arc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(Arc::from(s))
    }
}

impl From<VirtualFileUrl> for Value {
    fn from(url: VirtualFileUrl) -> Self {
        Self::Url(url)
    }
}

impl From<PersistentId> for Value {
    fn from(id: PersistentId) -> Self {
        Self::Id(id)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Self::Record(record)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}
