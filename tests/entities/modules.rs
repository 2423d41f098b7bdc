//! Integration tests for modules and their source roots

use workspace_model_entities::packaging::LIBRARY_FILES_KEY;
use workspace_model_entities::{
    CustomSourceRootPropertiesEntity, LibraryEntity, LibraryFilesPackagingElementEntity,
    LibraryRoot, LibraryTableId, ModuleEntity, SourceRootEntity, TypedEntity, library_id,
    module_id, typed,
};
use workspace_model_foundation::{EntityId, VirtualFileUrl};
use workspace_model_storage::{EntityBuilder, EntityRef, MutableEntityStorage, ReadStorage};

use crate::{source, storage};

fn module_with_roots(name: &str, dirs: &[&str]) -> EntityBuilder {
    let mut module = ModuleEntity::builder(name, source()).unwrap();
    let roots: Vec<EntityRef> = dirs
        .iter()
        .map(|dir| {
            SourceRootEntity::builder(
                VirtualFileUrl::new(&format!("file:///p/{name}/{dir}")),
                "java-source",
                source(),
            )
            .unwrap()
            .into()
        })
        .collect();
    module.set_children("sourceRoots", roots).unwrap();
    module
}

/// Module `core`, its module-level library `junit`, and a library-files
/// element linking that library both softly and through the extension slot.
fn project() -> (MutableEntityStorage, EntityId, EntityId, EntityId) {
    let mut storage = storage();
    let module = storage
        .add_entity(&mut module_with_roots("core", &["src", "test"]))
        .unwrap();

    let table = LibraryTableId::Module(module_id("core"));
    let mut library = LibraryEntity::builder(
        "junit",
        &table,
        vec![LibraryRoot::classes(VirtualFileUrl::new("jar:///p/lib/junit.jar!/"))],
        Vec::new(),
        source(),
    )
    .unwrap();
    library
        .set_ext_child(
            LIBRARY_FILES_KEY,
            Some(
                LibraryFilesPackagingElementEntity::builder(
                    Some(library_id("junit", &table)),
                    source(),
                )
                .unwrap()
                .into(),
            ),
        )
        .unwrap();
    let library = storage.add_entity(&mut library).unwrap();
    let element = typed::all::<LibraryFilesPackagingElementEntity<'_>, _>(&storage).unwrap()[0].id();
    (storage, module, library, element)
}

// =============================================================================
// Source Roots
// =============================================================================

#[test]
fn module_owns_ordered_source_roots() {
    let mut storage = storage();
    let id = storage
        .add_entity(&mut module_with_roots("core", &["src", "test", "gen"]))
        .unwrap();

    let module: ModuleEntity<'_> = typed::resolve(&storage, &module_id("core")).unwrap();
    assert_eq!(module.id(), id);
    assert_eq!(module.module_type(), None);
    let urls: Vec<&str> = module
        .source_roots()
        .unwrap()
        .iter()
        .map(|r| r.url().unwrap().as_str())
        .collect();
    assert_eq!(urls, ["file:///p/core/src", "file:///p/core/test", "file:///p/core/gen"]);

    for root in module.source_roots().unwrap() {
        assert_eq!(root.module().unwrap().unwrap(), module);
        assert_eq!(root.root_type().unwrap(), "java-source");
    }

    storage.remove_entity(id).unwrap();
    assert_eq!(storage.entity_count(), 0);
}

#[test]
fn source_roots_are_found_by_directory() {
    let mut storage = storage();
    storage
        .add_entity(&mut module_with_roots("core", &["src", "test"]))
        .unwrap();
    storage
        .add_entity(&mut module_with_roots("util", &["src"]))
        .unwrap();

    let hits = storage
        .find_under_url(&VirtualFileUrl::new("file:///p/core"))
        .unwrap();
    assert_eq!(hits.len(), 2);
    for (entity, field) in hits {
        let root = SourceRootEntity::cast(entity).unwrap();
        assert_eq!(field, "url");
        assert_eq!(root.module().unwrap().unwrap().name().unwrap(), "core");
    }
}

#[test]
fn custom_properties_follow_their_root() {
    let mut storage = storage();
    let mut module = ModuleEntity::builder("core", source()).unwrap();
    let mut root =
        SourceRootEntity::builder(VirtualFileUrl::new("file:///p/core/res"), "java-resource", source())
            .unwrap();
    root.set_child(
        "customSourceRootProperties",
        Some(
            CustomSourceRootPropertiesEntity::builder("<properties/>", source())
                .unwrap()
                .into(),
        ),
    )
    .unwrap();
    module.add_child("sourceRoots", root.into()).unwrap();
    let id = storage.add_entity(&mut module).unwrap();
    assert_eq!(storage.entity_count(), 3);

    let module: ModuleEntity<'_> = typed::get(&storage, id).unwrap().unwrap();
    let root = module.source_roots().unwrap()[0];
    let properties = root.custom_properties().unwrap().unwrap();
    assert_eq!(properties.properties_xml_tag().unwrap(), "<properties/>");
    assert_eq!(properties.source_root().unwrap().unwrap(), root);
}

// =============================================================================
// Renames
// =============================================================================

#[test]
fn module_rename_renames_its_libraries() {
    let (mut storage, module, library, element) = project();

    storage
        .modify_entity(module, |b| b.set("name", "base"))
        .unwrap();

    let old_table = LibraryTableId::Module(module_id("core"));
    let new_table = LibraryTableId::Module(module_id("base"));
    assert!(storage.resolve(&library_id("junit", &old_table)).is_none());

    let renamed: LibraryEntity<'_> =
        typed::resolve(&storage, &library_id("junit", &new_table)).unwrap();
    assert_eq!(renamed.id(), library);
    assert_eq!(renamed.table_id().unwrap(), new_table);

    let element: LibraryFilesPackagingElementEntity<'_> =
        typed::get(&storage, element).unwrap().unwrap();
    assert_eq!(element.library_id(), Some(&library_id("junit", &new_table)));
    assert_eq!(element.library().unwrap().unwrap(), renamed);
    assert!(storage.check_consistency().is_ok());
}

#[test]
fn rename_is_invisible_to_the_base_snapshot() {
    let (storage, module, _, _) = project();
    let snapshot = storage.to_snapshot();
    let mut next = snapshot.to_builder();

    next.modify_entity(module, |b| b.set("name", "base")).unwrap();

    let table = LibraryTableId::Module(module_id("core"));
    assert!(snapshot.resolve(&library_id("junit", &table)).is_some());
    assert_eq!(snapshot.soft_referrers(&module_id("core")).unwrap().len(), 1);
    assert_eq!(next.soft_referrers(&module_id("base")).unwrap().len(), 1);
    assert_eq!(next.changes().len(), 3);
}

#[test]
fn removing_a_library_removes_its_packaging_element() {
    let (mut storage, module, library, element) = project();

    storage.remove_entity(library).unwrap();

    assert!(!storage.contains(element));
    assert!(typed::all::<LibraryFilesPackagingElementEntity<'_>, _>(&storage)
        .unwrap()
        .is_empty());
    assert!(storage.contains(module));
    assert!(storage.soft_referrers(&module_id("core")).unwrap().is_empty());
    assert!(storage.check_consistency().is_ok());
}
