//! Integration tests for relationships
//!
//! Tests referential integrity, re-parenting, ownership, and cascades.

use workspace_model_foundation::{EntityId, ErrorKind};
use workspace_model_storage::{MutableEntityStorage, ReadStorage};

use crate::fixtures::{FILES, README, folder, folder_with_files, readme, storage};

fn two_folders_with_readme() -> (MutableEntityStorage, EntityId, EntityId, EntityId) {
    let mut storage = storage();
    let mut first = folder("first");
    first.set_child("readme", Some(readme("doc").into())).unwrap();
    let first = storage.add_entity(&mut first).unwrap();
    let second = storage.add_entity(&mut folder("second")).unwrap();
    let readme = storage.extract_child(README, first).unwrap();
    (storage, first, second, readme)
}

// =============================================================================
// Referential Integrity
// =============================================================================

#[test]
fn both_directions_agree() {
    let (storage, first, _, readme) = two_folders_with_readme();
    assert_eq!(storage.extract_child(README, first), Some(readme));
    assert_eq!(storage.extract_parent(README, readme), Some(first));

    let entity = storage.entity(readme).unwrap();
    assert_eq!(entity.parent("owner").unwrap().unwrap().id(), first);
    assert_eq!(
        storage.entity(first).unwrap().child("readme").unwrap().unwrap().id(),
        readme
    );
}

#[test]
fn children_keep_insertion_order() {
    let mut storage = storage();
    let urls = ["file:///src/c", "file:///src/a", "file:///src/b"];
    let id = storage.add_entity(&mut folder_with_files("src", &urls)).unwrap();

    let files = storage.entity(id).unwrap().children("files").unwrap();
    let stored: Vec<&str> = files
        .iter()
        .map(|f| f.get_url("url").unwrap().as_str())
        .collect();
    assert_eq!(stored, urls);
    for f in &files {
        assert_eq!(storage.extract_parent(FILES, f.id()), Some(id));
    }
}

#[test]
fn referrers_follow_one_connection() {
    let mut storage = storage();
    let id = storage
        .add_entity(&mut folder_with_files("src", &["file:///src/a", "file:///src/b"]))
        .unwrap();
    let file = storage.extract_children(FILES, id)[0];

    let files = storage.referrers(id, FILES).unwrap();
    assert_eq!(files.len(), 2);
    let owner = storage.referrers(file, FILES).unwrap();
    assert_eq!(owner.len(), 1);
    assert_eq!(owner[0].id(), id);
    assert!(storage.referrers(id, README).unwrap().is_empty());
}

// =============================================================================
// Re-parenting
// =============================================================================

#[test]
fn one_to_one_child_moves_to_new_parent() {
    let (mut storage, first, second, readme) = two_folders_with_readme();

    storage
        .modify_entity(second, |b| b.set_child("readme", Some(readme.into())))
        .unwrap();

    assert_eq!(storage.extract_child(README, first), None);
    assert_eq!(storage.extract_child(README, second), Some(readme));
    assert_eq!(storage.extract_parent(README, readme), Some(second));
    assert!(storage.check_consistency().is_ok());
}

#[test]
fn one_to_one_child_moves_from_its_own_side() {
    let (mut storage, first, second, readme) = two_folders_with_readme();

    storage
        .modify_entity(readme, |b| b.set_parent("owner", Some(second.into())))
        .unwrap();

    assert_eq!(storage.extract_child(README, first), None);
    assert_eq!(storage.extract_child(README, second), Some(readme));
}

#[test]
fn one_to_one_displaces_previous_child() {
    let (mut storage, first, _, old) = two_folders_with_readme();
    let new = storage.add_entity(&mut readme("new")).unwrap();

    storage
        .modify_entity(first, |b| b.set_child("readme", Some(new.into())))
        .unwrap();

    assert_eq!(storage.extract_child(README, first), Some(new));
    // Nullable: the displaced readme survives without a parent.
    assert!(storage.contains(old));
    assert_eq!(storage.extract_parent(README, old), None);
}

#[test]
fn file_moves_between_folders() {
    let mut storage = storage();
    let a = storage
        .add_entity(&mut folder_with_files("a", &["file:///a/1", "file:///a/2"]))
        .unwrap();
    let b = storage.add_entity(&mut folder("b")).unwrap();
    let moved = storage.extract_children(FILES, a)[0];

    storage
        .modify_entity(b, |builder| builder.add_child("files", moved.into()))
        .unwrap();

    assert_eq!(storage.extract_children(FILES, a).len(), 1);
    assert_eq!(storage.extract_children(FILES, b), im::vector![moved]);
    assert_eq!(storage.extract_parent(FILES, moved), Some(b));
    assert_eq!(storage.entity_count(), 4);
}

// =============================================================================
// Ownership and Cascades
// =============================================================================

#[test]
fn dropping_an_owned_child_removes_it() {
    let mut storage = storage();
    let id = storage
        .add_entity(&mut folder_with_files("src", &["file:///src/a", "file:///src/b"]))
        .unwrap();
    let kept = storage.extract_children(FILES, id)[1];

    storage
        .modify_entity(id, |b| b.set_children("files", vec![kept.into()]))
        .unwrap();

    assert_eq!(storage.entity_count(), 2);
    assert_eq!(storage.extract_children(FILES, id), im::vector![kept]);
}

#[test]
fn clearing_a_nullable_child_keeps_it() {
    let (mut storage, first, _, readme) = two_folders_with_readme();

    storage
        .modify_entity(first, |b| b.set_child("readme", None))
        .unwrap();

    assert!(storage.contains(readme));
    assert_eq!(storage.extract_parent(README, readme), None);
}

#[test]
fn removal_cascades_over_owned_connections_only() {
    let mut storage = storage();
    let mut root = folder_with_files("src", &["file:///src/a", "file:///src/b"]);
    root.set_child("readme", Some(readme("doc").into())).unwrap();
    let id = storage.add_entity(&mut root).unwrap();
    let files = storage.extract_children(FILES, id);
    let readme = storage.extract_child(README, id).unwrap();

    storage.remove_entity(id).unwrap();

    assert_eq!(storage.entity_count(), 1);
    assert!(files.iter().all(|f| !storage.contains(*f)));
    assert!(storage.contains(readme));
    assert_eq!(storage.extract_parent(README, readme), None);
}

#[test]
fn removed_id_is_stale() {
    let mut storage = storage();
    let id = storage.add_entity(&mut folder("gone")).unwrap();
    storage.remove_entity(id).unwrap();

    assert!(matches!(
        storage.entity(id).unwrap_err().kind,
        ErrorKind::StaleEntity(_)
    ));
    assert!(storage.remove_entity(id).is_err());

    let reused = storage.add_entity(&mut folder("next")).unwrap();
    assert_eq!(reused.index, id.index);
    assert_ne!(reused, id);
    assert!(storage.modify_entity(id, |b| b.set("name", "x")).is_err());
}

#[test]
fn moving_to_a_removed_parent_fails() {
    let mut storage = storage();
    let a = storage
        .add_entity(&mut folder_with_files("a", &["file:///a/1"]))
        .unwrap();
    let gone = storage.add_entity(&mut folder("gone")).unwrap();
    storage.remove_entity(gone).unwrap();
    let file = storage.extract_children(FILES, a)[0];

    let err = storage
        .modify_entity(file, |b| b.set_parent("folder", Some(gone.into())))
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::StaleEntity(_)));
    assert_eq!(storage.extract_parent(FILES, file), Some(a));
}
