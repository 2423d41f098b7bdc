//! Integration tests for entity builders and commits

use workspace_model_foundation::{ErrorKind, Value, VirtualFileUrl};
use workspace_model_storage::{EntityBuilder, EntityChange, ReadStorage};

use crate::fixtures::{
    FILES, FOLDER, README, README_SCHEMA, file, file_without_url, folder, folder_with_files, readme, source,
    storage,
};

// =============================================================================
// Adding Entities
// =============================================================================

#[test]
fn add_commits_the_whole_subgraph() {
    let mut storage = storage();
    let mut root = folder_with_files("src", &["file:///src/a", "file:///src/b"]);
    root.set_child("readme", Some(readme("hello").into())).unwrap();

    let id = storage.add_entity(&mut root).unwrap();

    assert_eq!(storage.entity_count(), 4);
    assert_eq!(storage.extract_children(FILES, id).len(), 2);
    assert!(storage.extract_child(README, id).is_some());
    assert!(root.is_committed());
    assert_eq!(root.id(), Some(id));

    let added: Vec<&str> = storage
        .changes()
        .iter()
        .map(EntityChange::entity_type)
        .collect();
    assert_eq!(added.iter().filter(|t| **t == "FileEntity").count(), 2);
    assert!(
        storage
            .changes()
            .iter()
            .all(|c| matches!(c, EntityChange::Added { .. }))
    );
}

#[test]
fn defaults_fill_unset_optional_fields() {
    let mut storage = storage();
    let mut bare_readme = EntityBuilder::new(&README_SCHEMA).with_source(source()).unwrap();
    let id = storage.add_entity(&mut bare_readme).unwrap();
    let folder_id = storage.add_entity(&mut folder("bare")).unwrap();

    assert_eq!(storage.entity(id).unwrap().get_str("text").unwrap(), "");
    let folder = storage.entity(folder_id).unwrap();
    assert!(folder.get_list("excluded").unwrap().is_empty());
    assert!(folder.get("alias").unwrap().is_null());
}

#[test]
fn builder_sees_pending_children() {
    let root = folder_with_files("src", &["file:///src/a", "file:///src/b"]);
    let children = root.children("files").unwrap();
    assert_eq!(children.len(), 2);
    assert!(children.iter().all(|c| c.id().is_none()));
}

#[test]
fn committed_builder_is_frozen() {
    let mut storage = storage();
    let mut root = folder("src");
    storage.add_entity(&mut root).unwrap();

    let err = root.set("name", "other").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::FrozenEntity { .. }));
    assert_eq!(root.get("name").unwrap(), &Value::from("src"));
}

#[test]
fn re_adding_a_committed_builder_is_a_no_op() {
    let mut storage = storage();
    let mut root = folder("src");
    let id = storage.add_entity(&mut root).unwrap();
    assert_eq!(storage.add_entity(&mut root).unwrap(), id);
    assert_eq!(storage.entity_count(), 1);
}

// =============================================================================
// Validation
// =============================================================================

#[test]
fn setters_check_the_schema() {
    let mut builder = folder("src");
    assert!(matches!(
        builder.set("nmae", "x").unwrap_err().kind,
        ErrorKind::UnknownField { .. }
    ));
    assert!(matches!(
        builder.set("name", 3_i64).unwrap_err().kind,
        ErrorKind::TypeMismatch { .. }
    ));
    assert!(matches!(
        builder.set_child("files", None).unwrap_err().kind,
        ErrorKind::InvalidConnection { .. }
    ));
}

#[test]
fn unknown_entity_type_is_rejected() {
    let storage = storage();
    assert!(matches!(
        storage.create_builder("NoSuchEntity").unwrap_err().kind,
        ErrorKind::UnknownEntityType(_)
    ));
    assert_eq!(
        storage.create_builder("FolderEntity").unwrap().entity_type(),
        "FolderEntity"
    );
}

#[test]
fn owned_child_needs_its_parent() {
    let mut storage = storage();
    let err = storage.add_entity(&mut file("file:///loose")).unwrap_err();
    assert!(matches!(
        err.kind,
        ErrorKind::MissingRequiredField { ref field, .. } if field == "folder"
    ));
    assert_eq!(storage.entity_count(), 0);
}

#[test]
fn nullable_child_may_stand_alone() {
    let mut storage = storage();
    let id = storage.add_entity(&mut readme("alone")).unwrap();
    assert_eq!(storage.extract_parent(README, id), None);
}

#[test]
fn duplicate_persistent_id_is_rejected() {
    let mut storage = storage();
    storage.add_entity(&mut folder("src")).unwrap();
    let err = storage.add_entity(&mut folder("src")).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::DuplicatePersistentId(_)));
    assert_eq!(storage.entity_count(), 1);
}

// =============================================================================
// Commit Atomicity
// =============================================================================

#[test]
fn one_missing_field_aborts_the_whole_commit() {
    let mut storage = storage();
    storage.add_entity(&mut folder("base")).unwrap();
    let before = storage.to_snapshot();

    let mut root = folder("src");
    root.set_children(
        "files",
        vec![
            file("file:///src/a").into(),
            file_without_url().into(),
            file("file:///src/c").into(),
        ],
    )
    .unwrap();

    let err = storage.add_entity(&mut root).unwrap_err();
    assert!(matches!(
        err.kind,
        ErrorKind::MissingRequiredField { ref entity_type, ref field }
            if entity_type == "FileEntity" && field == "url"
    ));
    assert_eq!(storage.entity_count(), 1);
    assert_eq!(before.entity_count(), 1);
    assert!(!root.is_committed());
    assert!(
        storage
            .find_by_url(&VirtualFileUrl::new("file:///src/a"))
            .unwrap()
            .is_empty()
    );
    assert_eq!(storage.changes().len(), 1);
}

#[test]
fn failed_builder_can_be_fixed_and_retried() {
    let mut storage = storage();
    let mut root = EntityBuilder::new(&FOLDER).with_source(source()).unwrap();

    assert!(storage.add_entity(&mut root).is_err());
    root.set("name", "src").unwrap();
    let id = storage.add_entity(&mut root).unwrap();
    assert_eq!(storage.entity(id).unwrap().get_str("name").unwrap(), "src");
}

// =============================================================================
// Cross-Builder Guard
// =============================================================================

#[test]
fn builder_cannot_join_a_second_storage() {
    let mut first = storage();
    let mut second = storage();
    let mut root = folder_with_files("src", &["file:///src/a"]);
    first.add_entity(&mut root).unwrap();

    let err = second.add_entity(&mut root).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::CrossBuilderEntity { .. }));
    assert_eq!(second.entity_count(), 0);
    assert_eq!(first.entity_count(), 2);
}
