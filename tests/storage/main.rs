//! Integration tests for Layer 1: Storage
//!
//! Tests for builders, the relationship table, snapshots, and soft links,
//! all against a small folder/file schema family.

mod builders;
mod proptests;
mod relationships;
mod snapshots;
mod soft_links;
