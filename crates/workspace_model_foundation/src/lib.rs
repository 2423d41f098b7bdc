//! Identifiers, field values, urls, and errors for the workspace model.
//!
//! This crate provides:
//! - [`EntityId`] - Generation-stamped entity identifiers
//! - [`Value`] - Tagged-union representation of entity field values
//! - [`FieldType`] - Field type descriptors for schema validation
//! - [`PersistentId`] - Stable symbolic identifiers used by soft links
//! - [`VirtualFileUrl`] - Shared url handles and their interning manager
//! - [`EntitySource`] - Provenance tags
//! - [`Error`] - Rich error types with context

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod entity;
pub mod error;
pub mod id;
pub mod source;
pub mod types;
pub mod url;
pub mod value;

pub use entity::EntityId;
pub use error::{Error, ErrorContext, ErrorKind};
pub use id::PersistentId;
pub use source::EntitySource;
pub use types::FieldType;
pub use url::{VirtualFileUrl, VirtualFileUrlManager};
pub use value::{Record, Value};

/// Result type alias using the workspace model [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;
