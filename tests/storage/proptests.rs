//! Property tests over random edit sequences

use proptest::prelude::*;
use proptest::sample::Index;
use workspace_model_storage::{EntityRef, MutableEntityStorage, ReadStorage};

use crate::fixtures::{FILES, file, file_without_url, folder, folder_with_files, storage};

#[derive(Clone, Debug)]
enum Op {
    AddFolder(usize),
    RemoveFolder(Index),
    MoveFile(Index, Index),
    Rename(Index),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..4).prop_map(Op::AddFolder),
        any::<Index>().prop_map(Op::RemoveFolder),
        (any::<Index>(), any::<Index>()).prop_map(|(f, t)| Op::MoveFile(f, t)),
        any::<Index>().prop_map(Op::Rename),
    ]
}

fn apply(storage: &mut MutableEntityStorage, op: &Op, n: usize) {
    let folders: Vec<_> = storage
        .entities_of_type("FolderEntity")
        .unwrap()
        .iter()
        .map(|e| e.id())
        .collect();
    match op {
        Op::AddFolder(files) => {
            let urls: Vec<String> = (0..*files).map(|i| format!("file:///f{n}/{i}")).collect();
            let urls: Vec<&str> = urls.iter().map(String::as_str).collect();
            storage
                .add_entity(&mut folder_with_files(&format!("f{n}"), &urls))
                .unwrap();
        }
        Op::RemoveFolder(i) if !folders.is_empty() => {
            storage.remove_entity(*i.get(&folders)).unwrap();
        }
        Op::MoveFile(from, to) if !folders.is_empty() => {
            let files = storage.extract_children(FILES, *from.get(&folders));
            if let Some(&moved) = files.front() {
                storage
                    .modify_entity(*to.get(&folders), |b| b.add_child("files", moved.into()))
                    .unwrap();
            }
        }
        Op::Rename(i) if !folders.is_empty() => {
            storage
                .modify_entity(*i.get(&folders), |b| b.set("name", format!("r{n}")))
                .unwrap();
        }
        _ => {}
    }
}

fn check_graph(storage: &MutableEntityStorage) -> Result<(), TestCaseError> {
    let folders = storage.entities_of_type("FolderEntity").unwrap();
    let files = storage.entities_of_type("FileEntity").unwrap();
    prop_assert_eq!(storage.entity_count(), folders.len() + files.len());

    for f in &files {
        let parent = storage.extract_parent(FILES, f.id());
        prop_assert!(parent.is_some());
        let parent = parent.unwrap();
        prop_assert!(storage.extract_children(FILES, parent).contains(&f.id()));
    }
    for folder in &folders {
        for child in storage.extract_children(FILES, folder.id()) {
            prop_assert_eq!(storage.entity(child).unwrap().entity_type(), "FileEntity");
        }
        prop_assert!(storage.resolve(folder.persistent_id().unwrap()).is_some());
    }
    prop_assert!(storage.check_consistency().is_ok());
    Ok(())
}

proptest! {
    #[test]
    fn random_edits_keep_the_graph_consistent(ops in prop::collection::vec(op(), 1..40)) {
        let mut storage = storage();
        for (n, op) in ops.iter().enumerate() {
            let before = storage.to_snapshot();
            let count = before.entity_count();

            apply(&mut storage, op, n);

            check_graph(&storage)?;
            prop_assert_eq!(before.entity_count(), count);
        }
    }

    #[test]
    fn one_bad_child_rejects_the_whole_add(files in 1usize..8, bad in any::<Index>()) {
        let mut storage = storage();
        storage.add_entity(&mut folder("existing")).unwrap();

        let bad = bad.index(files);
        let children: Vec<EntityRef> = (0..files)
            .map(|i| {
                if i == bad {
                    file_without_url().into()
                } else {
                    file(&format!("file:///new/{i}")).into()
                }
            })
            .collect();
        let mut root = folder("new");
        root.set_children("files", children).unwrap();

        prop_assert!(storage.add_entity(&mut root).is_err());
        prop_assert_eq!(storage.entity_count(), 1);
        prop_assert_eq!(storage.changes().len(), 1);
    }

    #[test]
    fn no_op_commit_round_trips(files in 0usize..6) {
        let mut storage = storage();
        let urls: Vec<String> = (0..files).map(|i| format!("file:///p/{i}")).collect();
        let urls: Vec<&str> = urls.iter().map(String::as_str).collect();
        let id = storage.add_entity(&mut folder_with_files("p", &urls)).unwrap();

        let first = storage.to_snapshot();
        let second = first.to_builder().to_snapshot();
        prop_assert_eq!(second.entity(id).unwrap(), first.entity(id).unwrap());
        prop_assert_eq!(
            second.extract_children(FILES, id),
            first.extract_children(FILES, id)
        );
    }
}
