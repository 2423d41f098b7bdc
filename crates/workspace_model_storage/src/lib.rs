//! Entity data, builders, relationship table, indices, and snapshots for the
//! workspace model.
//!
//! This crate provides:
//! - [`SchemaRegistry`] - Validated entity schemas plus [`StorageConfig`]
//! - [`EntityBuilder`] - Mutable entity façade with change tracking
//! - [`RefsTable`] - Bidirectional parent/child edges keyed by [`ConnectionId`]
//! - [`PersistentIdIndex`], [`SoftLinkIndex`], [`UrlIndex`] - Secondary indices
//! - [`EntityStorage`] - Immutable, shareable snapshots
//! - [`MutableEntityStorage`] - Single-writer storage with all-or-nothing commits

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod builder;
pub mod change;
pub mod config;
pub mod connection;
pub mod consistency;
pub mod data;
pub mod entity;
pub mod index;
pub mod mutable;
pub mod refs;
pub mod schema;
pub mod slots;
pub mod state;
pub mod storage;


pub use builder::{BackPointer, EntityBuilder, EntityRef, RefView};
pub use change::{ChangeLog, EntityChange};
pub use config::{GENERATOR_API_VERSION, GENERATOR_IMPL_VERSION, StorageConfig};
pub use connection::{ConnectionId, ConnectionType, ExtRefKey};
pub use consistency::ConsistencyViolation;
pub use data::EntityData;
pub use entity::Entity;
pub use index::{PersistentIdIndex, SoftLinkIndex, UrlIndex};
pub use mutable::MutableEntityStorage;
pub use refs::RefsTable;
pub use schema::{
    ConnectionSchema, EntitySchema, FieldSchema, PersistentIdFn, RelationSide, SchemaRegistry,
};
pub use slots::SlotTable;
pub use state::StorageState;
pub use storage::{EntityStorage, ReadStorage};
