//! Integration tests for entity and persistent ids

use std::collections::HashSet;

use workspace_model_foundation::{EntityId, PersistentId, Record, Value};

// =============================================================================
// EntityId
// =============================================================================

#[test]
fn generations_alternate_liveness() {
    let id = EntityId::new(3, 1);
    assert!(id.is_live_generation());
    assert!(!EntityId::new(3, 2).is_live_generation());

    let reused = id.next_generation();
    assert_eq!(reused.index, 3);
    assert_eq!(reused.generation, 3);
    assert!(reused.is_live_generation());
    assert_ne!(id, reused);
}

#[test]
fn entity_id_formats() {
    let id = EntityId::new(12, 5);
    assert_eq!(id.to_string(), "#12");
    assert_eq!(format!("{id:?}"), "EntityId(12v5)");
}

#[test]
fn entity_ids_hash_by_index_and_generation() {
    let set: HashSet<EntityId> = [
        EntityId::new(1, 1),
        EntityId::new(1, 3),
        EntityId::new(1, 1),
    ]
    .into_iter()
    .collect();
    assert_eq!(set.len(), 2);
}

// =============================================================================
// PersistentId
// =============================================================================

fn module(name: &str) -> PersistentId {
    PersistentId::new("ModuleId", [Value::from(name)])
}

fn library(name: &str, module_name: &str) -> PersistentId {
    let table = Record::new(
        "LibraryTableId",
        [("level", Value::from("module")), ("moduleId", Value::from(module(module_name)))],
    );
    PersistentId::new("LibraryId", [Value::from(name), Value::from(table)])
}

#[test]
fn persistent_id_equality_is_structural() {
    assert_eq!(module("core"), module("core"));
    assert_ne!(module("core"), module("util"));
    assert_ne!(
        module("core"),
        PersistentId::new("ArtifactId", [Value::from("core")])
    );
}

#[test]
fn presentable_name_is_first_string_part() {
    assert_eq!(module("core").presentable_name(), "core");
    assert_eq!(library("junit", "core").presentable_name(), "junit");
    assert_eq!(PersistentId::new("Empty", []).presentable_name(), "Empty");
}

#[test]
fn replace_id_reaches_nested_ids() {
    let lib = library("junit", "core");
    let renamed = lib.replace_id(&module("core"), &module("base")).unwrap();
    assert_eq!(renamed, library("junit", "base"));
    assert_eq!(renamed.part(0), Some(&Value::from("junit")));
}

#[test]
fn replace_id_without_occurrence_is_none() {
    let lib = library("junit", "core");
    assert!(lib.replace_id(&module("other"), &module("base")).is_none());
}

#[test]
fn persistent_id_display() {
    assert_eq!(module("core").to_string(), "ModuleId(core)");
}
