//! Workspace model - strongly-typed, copy-on-write entity graph storage
//!
//! This crate re-exports all layers of the workspace model for convenient access.
//! For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 2: workspace_model_entities   - Project-model entities (module, library, artifact)
//! Layer 1: workspace_model_storage    - Builders, relationship table, indices, snapshots
//! Layer 0: workspace_model_foundation - Core types (EntityId, Value, PersistentId, Error)
//! ```

pub use workspace_model_entities as entities;
pub use workspace_model_foundation as foundation;
pub use workspace_model_storage as storage;
