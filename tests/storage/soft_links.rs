//! Integration tests for soft links and attribute indices

use workspace_model_foundation::{Value, VirtualFileUrl};
use workspace_model_storage::{EntityChange, ReadStorage};

use crate::fixtures::{folder, folder_id, storage};

fn alias(name: &str) -> Value {
    Value::Id(folder_id(name))
}

// =============================================================================
// Rename Propagation
// =============================================================================

#[test]
fn renaming_a_target_rewrites_its_referrers() {
    let mut storage = storage();
    let target = storage.add_entity(&mut folder("a")).unwrap();
    let referrer = storage
        .add_entity(&mut folder("b").with("alias", alias("a")).unwrap())
        .unwrap();
    let base = storage.to_snapshot();
    let mut storage = base.to_builder();

    storage
        .modify_entity(target, |b| b.set("name", "c"))
        .unwrap();

    assert_eq!(storage.entity(referrer).unwrap().get("alias").unwrap(), &alias("c"));
    assert!(storage.soft_referrers(&folder_id("a")).unwrap().is_empty());
    let referrers = storage.soft_referrers(&folder_id("c")).unwrap();
    assert_eq!(referrers.len(), 1);
    assert_eq!(referrers[0].id(), referrer);

    assert!(storage.changes().contains(&EntityChange::Replaced {
        id: referrer,
        entity_type: "FolderEntity",
        changed: vec!["alias"],
    }));
    // The base snapshot still links the old name.
    assert_eq!(base.soft_referrers(&folder_id("a")).unwrap().len(), 1);
}

#[test]
fn explicit_update_rewrites_dangling_links() {
    let mut storage = storage();
    let first = storage
        .add_entity(&mut folder("first").with("alias", alias("x")).unwrap())
        .unwrap();
    let second = storage
        .add_entity(&mut folder("second").with("alias", alias("x")).unwrap())
        .unwrap();

    storage
        .update_soft_links(&folder_id("x"), &folder_id("y"))
        .unwrap();

    for id in [first, second] {
        assert_eq!(storage.entity(id).unwrap().get("alias").unwrap(), &alias("y"));
    }
    assert!(storage.soft_referrers(&folder_id("x")).unwrap().is_empty());
    assert_eq!(storage.soft_referrers(&folder_id("y")).unwrap().len(), 2);
}

#[test]
fn update_without_referrers_changes_nothing() {
    let mut storage = storage();
    storage.add_entity(&mut folder("a")).unwrap();
    let snapshot = storage.to_snapshot();
    let mut storage = snapshot.to_builder();

    storage
        .update_soft_links(&folder_id("missing"), &folder_id("other"))
        .unwrap();
    assert!(!storage.has_changes());
}

#[test]
fn removing_a_target_leaves_links_dangling() {
    let mut storage = storage();
    let target = storage.add_entity(&mut folder("a")).unwrap();
    let referrer = storage
        .add_entity(&mut folder("b").with("alias", alias("a")).unwrap())
        .unwrap();

    storage.remove_entity(target).unwrap();

    assert!(storage.resolve(&folder_id("a")).is_none());
    assert_eq!(storage.entity(referrer).unwrap().get("alias").unwrap(), &alias("a"));
    assert_eq!(storage.soft_referrers(&folder_id("a")).unwrap().len(), 1);
}

#[test]
fn entity_view_lists_its_soft_referrers() {
    let mut storage = storage();
    let target = storage.add_entity(&mut folder("a")).unwrap();
    storage
        .add_entity(&mut folder("b").with("alias", alias("a")).unwrap())
        .unwrap();

    let referrers = storage.entity(target).unwrap().soft_referrers().unwrap();
    assert_eq!(referrers.len(), 1);
    assert_eq!(referrers[0].get_str("name").unwrap(), "b");
}

// =============================================================================
// Url Index
// =============================================================================

#[test]
fn list_fields_index_every_url() {
    let mut storage = storage();
    let excluded = Value::list([
        Value::from(VirtualFileUrl::new("file:///p/out")),
        Value::from(VirtualFileUrl::new("file:///p/tmp")),
    ]);
    let id = storage
        .add_entity(&mut folder("p").with("excluded", excluded).unwrap())
        .unwrap();

    for url in ["file:///p/out", "file:///p/tmp"] {
        let hits = storage.find_by_url(&VirtualFileUrl::new(url)).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0.id(), id);
        assert_eq!(hits[0].1, "excluded");
    }

    storage
        .modify_entity(id, |b| {
            b.set(
                "excluded",
                Value::list([Value::from(VirtualFileUrl::new("file:///p/out"))]),
            )
        })
        .unwrap();
    assert!(
        storage
            .find_by_url(&VirtualFileUrl::new("file:///p/tmp"))
            .unwrap()
            .is_empty()
    );
    assert_eq!(
        storage
            .find_by_url(&VirtualFileUrl::new("file:///p/out"))
            .unwrap()
            .len(),
        1
    );
}
