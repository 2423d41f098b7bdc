//! Integration tests for snapshots and the change log

use std::thread;

use workspace_model_foundation::VirtualFileUrl;
use workspace_model_storage::{EntityChange, EntityStorage, ReadStorage};

use crate::fixtures::{
    FILES, README, file_without_url, folder, folder_id, folder_with_files, readme, registry, storage,
};

fn project() -> EntityStorage {
    let mut storage = storage();
    let mut src = folder_with_files("src", &["file:///p/src/a", "file:///p/src/b"]);
    src.set_child("readme", Some(readme("sources").into())).unwrap();
    storage.add_entity(&mut src).unwrap();
    storage
        .add_entity(&mut folder_with_files("test", &["file:///p/test/a"]))
        .unwrap();
    storage.to_snapshot()
}

// =============================================================================
// Round Trip
// =============================================================================

#[test]
fn no_op_commit_preserves_every_entity() {
    let snapshot = project();
    let again = snapshot.to_builder().to_snapshot();

    assert_eq!(again.entity_count(), snapshot.entity_count());
    for entity in snapshot.entities() {
        let copy = again.entity(entity.id()).unwrap();
        assert_eq!(copy, entity);
        assert_eq!(
            again.extract_children(FILES, entity.id()),
            snapshot.extract_children(FILES, entity.id())
        );
        assert_eq!(
            again.extract_parent(README, entity.id()),
            snapshot.extract_parent(README, entity.id())
        );
    }
    assert!(again.check_consistency().is_ok());
}

#[test]
fn empty_snapshot_has_nothing() {
    let snapshot = EntityStorage::empty(registry());
    assert_eq!(snapshot.entity_count(), 0);
    assert!(snapshot.entities().is_empty());
    assert!(snapshot.entities_of_type("FolderEntity").unwrap().is_empty());
    assert!(snapshot.entities_of_type("NoSuchEntity").is_err());
}

// =============================================================================
// Isolation
// =============================================================================

#[test]
fn later_edits_do_not_leak_into_a_snapshot() {
    let snapshot = project();
    let mut builder = snapshot.to_builder();
    let src = builder.entities_of_type("FolderEntity").unwrap()[0].id();

    builder.remove_entity(src).unwrap();
    builder.add_entity(&mut folder("docs")).unwrap();

    assert_eq!(snapshot.entity_count(), 6);
    assert!(snapshot.contains(src));
    assert_eq!(snapshot.extract_children(FILES, src).len(), 2);
    assert!(!builder.contains(src));
    // The readme is not owned and stays behind.
    assert_eq!(builder.to_snapshot().entity_count(), 4);
}

#[test]
fn failed_commit_leaves_the_base_untouched() {
    let snapshot = project();
    let mut builder = snapshot.to_builder();

    let mut broken = folder("broken");
    broken
        .set_children("files", vec![file_without_url().into()])
        .unwrap();
    assert!(builder.add_entity(&mut broken).is_err());

    assert!(!builder.has_changes());
    assert_eq!(builder.entity_count(), snapshot.entity_count());
    assert!(builder.base().ptr_eq(&snapshot));
    assert!(snapshot.check_consistency().is_ok());
}

#[test]
fn snapshots_are_shared_across_readers() {
    let snapshot = project();
    let url = VirtualFileUrl::new("file:///p/src/a");

    thread::scope(|scope| {
        for _ in 0..4 {
            let snapshot = snapshot.clone();
            let url = url.clone();
            scope.spawn(move || {
                let hits = snapshot.find_by_url(&url).unwrap();
                assert_eq!(hits.len(), 1);
                assert_eq!(hits[0].1, "url");
                assert_eq!(snapshot.entities_of_type("FileEntity").unwrap().len(), 3);
            });
        }
    });
}

// =============================================================================
// Queries
// =============================================================================

#[test]
fn url_queries_find_indexed_fields() {
    let snapshot = project();

    let under = snapshot
        .find_under_url(&VirtualFileUrl::new("file:///p/src"))
        .unwrap();
    assert_eq!(under.len(), 2);
    assert!(under.iter().all(|(e, field)| e.entity_type() == "FileEntity" && *field == "url"));

    assert!(
        snapshot
            .find_by_url(&VirtualFileUrl::new("file:///p/missing"))
            .unwrap()
            .is_empty()
    );
}

#[test]
fn resolve_by_persistent_id() {
    let snapshot = project();
    let src = snapshot.resolve(&folder_id("src")).unwrap();
    assert_eq!(src.get_str("name").unwrap(), "src");
    assert_eq!(src.persistent_id(), Some(&folder_id("src")));
    assert!(snapshot.resolve(&folder_id("nope")).is_none());
}

// =============================================================================
// Change Log
// =============================================================================

#[test]
fn changes_are_relative_to_the_base() {
    let snapshot = project();
    let mut builder = snapshot.to_builder();
    let test = builder.resolve(&folder_id("test")).unwrap().id();

    builder
        .modify_entity(test, |b| b.set("name", "tests"))
        .unwrap();

    assert_eq!(
        builder.changes(),
        vec![EntityChange::Replaced {
            id: test,
            entity_type: "FolderEntity",
            changed: vec!["name"],
        }]
    );
}

#[test]
fn add_then_remove_cancels_out() {
    let snapshot = project();
    let mut builder = snapshot.to_builder();

    let id = builder.add_entity(&mut folder("tmp")).unwrap();
    assert!(builder.has_changes());
    builder.remove_entity(id).unwrap();

    assert!(!builder.has_changes());
    assert!(builder.changes().is_empty());
}

#[test]
fn removal_lists_the_cascade() {
    let snapshot = project();
    let mut builder = snapshot.to_builder();
    let test = builder.resolve(&folder_id("test")).unwrap().id();
    let file = builder.extract_children(FILES, test)[0];

    builder.remove_entity(test).unwrap();

    let changes = builder.changes();
    assert_eq!(changes.len(), 2);
    assert!(changes.contains(&EntityChange::Removed {
        id: test,
        entity_type: "FolderEntity"
    }));
    assert!(changes.contains(&EntityChange::Removed {
        id: file,
        entity_type: "FileEntity"
    }));
}
