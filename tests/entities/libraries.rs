//! Integration tests for libraries

use workspace_model_entities::library::LIBRARY;
use workspace_model_entities::{
    LibraryEntity, LibraryPropertiesEntity, LibraryRoot, LibraryTableId, SdkEntity, TypedEntity,
    library_id, module_id, typed,
};
use workspace_model_foundation::{ErrorKind, Value, VirtualFileUrl};
use workspace_model_storage::{EntityBuilder, ReadStorage};

use crate::{source, storage};

// =============================================================================
// Creation and Lookup
// =============================================================================

#[test]
fn library_resolves_by_name_and_table() {
    let mut storage = storage();
    let table = LibraryTableId::Project;
    let mut library =
        LibraryEntity::builder("L", &table, Vec::new(), Vec::new(), source()).unwrap();
    let id = storage.add_entity(&mut library).unwrap();

    let found: LibraryEntity<'_> = typed::resolve(&storage, &library_id("L", &table)).unwrap();
    assert_eq!(found.id(), id);
    assert_eq!(found.name().unwrap(), "L");
    assert_eq!(found.table_id().unwrap(), table);
    assert!(found.roots().unwrap().is_empty());
    assert!(found.excluded_roots().unwrap().is_empty());

    let other_table = LibraryTableId::Global("application".to_string());
    assert!(storage.resolve(&library_id("L", &other_table)).is_none());
}

#[test]
fn library_without_roots_is_rejected() {
    let mut storage = storage();
    let mut library = EntityBuilder::new(&LIBRARY)
        .with_source(source())
        .unwrap()
        .with("name", "L")
        .unwrap()
        .with("tableId", LibraryTableId::Project)
        .unwrap()
        .with("excludedRoots", Value::list(Vec::<Value>::new()))
        .unwrap();

    let err = storage.add_entity(&mut library).unwrap_err();
    assert!(matches!(
        err.kind,
        ErrorKind::MissingRequiredField { ref field, .. } if field == "roots"
    ));
    assert_eq!(storage.entity_count(), 0);
    assert!(
        storage
            .resolve(&library_id("L", &LibraryTableId::Project))
            .is_none()
    );
}

#[test]
fn same_name_in_two_tables_is_allowed() {
    let mut storage = storage();
    for table in [
        LibraryTableId::Project,
        LibraryTableId::Module(module_id("core")),
    ] {
        storage
            .add_entity(
                &mut LibraryEntity::builder("junit", &table, Vec::new(), Vec::new(), source())
                    .unwrap(),
            )
            .unwrap();
    }
    let libraries: Vec<LibraryEntity<'_>> = typed::all(&storage).unwrap();
    assert_eq!(libraries.len(), 2);

    let err = storage
        .add_entity(
            &mut LibraryEntity::builder(
                "junit",
                &LibraryTableId::Project,
                Vec::new(),
                Vec::new(),
                source(),
            )
            .unwrap(),
        )
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::DuplicatePersistentId(_)));
}

// =============================================================================
// Roots
// =============================================================================

#[test]
fn roots_round_trip_and_are_indexed() {
    let mut storage = storage();
    let classes = VirtualFileUrl::new("jar:///libs/junit.jar!/");
    let sources = VirtualFileUrl::new("jar:///libs/junit-sources.jar!/");
    let excluded = VirtualFileUrl::new("file:///libs/junit/docs");
    let id = storage
        .add_entity(
            &mut LibraryEntity::builder(
                "junit",
                &LibraryTableId::Project,
                vec![
                    LibraryRoot::classes(classes.clone()),
                    LibraryRoot::sources(sources.clone()),
                ],
                vec![excluded.clone()],
                source(),
            )
            .unwrap(),
        )
        .unwrap();

    let library: LibraryEntity<'_> = typed::get(&storage, id).unwrap().unwrap();
    assert_eq!(
        library.roots().unwrap(),
        vec![LibraryRoot::classes(classes.clone()), LibraryRoot::sources(sources)]
    );
    assert_eq!(library.excluded_roots().unwrap(), vec![excluded.clone()]);

    let hits = storage.find_by_url(&classes).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].1, "roots");
    let hits = storage.find_by_url(&excluded).unwrap();
    assert_eq!(hits[0].1, "excludedRoots");
}

// =============================================================================
// Owned Children
// =============================================================================

#[test]
fn sdk_and_properties_live_and_die_with_the_library() {
    let mut storage = storage();
    let mut library = LibraryEntity::builder(
        "jdk",
        &LibraryTableId::Global("application".to_string()),
        Vec::new(),
        Vec::new(),
        source(),
    )
    .unwrap();
    library
        .set_child(
            "sdk",
            Some(
                SdkEntity::builder(VirtualFileUrl::new("file:///opt/jdk"), source())
                    .unwrap()
                    .into(),
            ),
        )
        .unwrap();
    library
        .set_child(
            "libraryProperties",
            Some(LibraryPropertiesEntity::builder("repository", source()).unwrap().into()),
        )
        .unwrap();
    let id = storage.add_entity(&mut library).unwrap();
    assert_eq!(storage.entity_count(), 3);

    let library: LibraryEntity<'_> = typed::get(&storage, id).unwrap().unwrap();
    let sdk = library.sdk().unwrap().unwrap();
    assert_eq!(sdk.home_url().unwrap().as_str(), "file:///opt/jdk");
    assert_eq!(sdk.library().unwrap().unwrap(), library);
    let properties = library.library_properties().unwrap().unwrap();
    assert_eq!(properties.library_type().unwrap(), "repository");
    assert_eq!(properties.properties_xml_tag(), None);

    storage.remove_entity(id).unwrap();
    assert_eq!(storage.entity_count(), 0);
}

#[test]
fn typed_get_rejects_other_types() {
    let mut storage = storage();
    let mut library =
        LibraryEntity::builder("L", &LibraryTableId::Project, Vec::new(), Vec::new(), source())
            .unwrap();
    let id = storage.add_entity(&mut library).unwrap();

    assert!(typed::get::<SdkEntity<'_>, _>(&storage, id).unwrap().is_none());
    assert!(SdkEntity::cast(storage.entity(id).unwrap()).is_none());
}
