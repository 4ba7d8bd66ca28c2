use crate::integration::support::{nested_tree, saved, small_tree, snapshot};
use notestore::confirm::{AlwaysOverwrite, NeverOverwrite};
use notestore::{ExportMode, MultiFileStorage, OffsetRange, PendingSyncSet, PersistOutcome, StorageBackend};
use std::cell::RefCell;
use std::rc::Rc;
use tempfile::tempdir;

#[test]
fn declined_overwrite_leaves_directory_unchanged() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("nb");
    saved(&root, &nested_tree());
    let before = snapshot(&root);

    let mut storage = MultiFileStorage::new(Box::new(NeverOverwrite));
    let outcome = storage
        .persist(&root, &small_tree(), &PendingSyncSet::new(), ExportMode::None, OffsetRange::FULL)
        .unwrap();

    assert_eq!(outcome, PersistOutcome::Declined);
    assert_eq!(snapshot(&root), before);
    assert!(storage.root().is_none());
}

#[test]
fn accepted_overwrite_replaces_directory() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("nb");
    saved(&root, &nested_tree());
    std::fs::write(root.join("stray.txt"), "left over").unwrap();

    let mut storage = MultiFileStorage::new(Box::new(AlwaysOverwrite));
    storage
        .persist(&root, &small_tree(), &PendingSyncSet::new(), ExportMode::None, OffsetRange::FULL)
        .unwrap();

    assert!(!root.join("stray.txt").exists());
    assert!(!root.join("6").exists());
    assert!(!root.join("bookmarks.lst").exists());
    assert_eq!(storage.root(), Some(root.as_path()));
}

#[test]
fn confirmation_names_the_target() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("nb");
    std::fs::create_dir(&root).unwrap();

    let asked = Rc::new(RefCell::new(Vec::new()));
    let recorder = Rc::clone(&asked);
    let mut storage = MultiFileStorage::new(Box::new(move |message: &str| {
        recorder.borrow_mut().push(message.to_string());
        false
    }));
    storage
        .persist(&root, &small_tree(), &PendingSyncSet::new(), ExportMode::AllTree, OffsetRange::FULL)
        .unwrap();

    let asked = asked.borrow();
    assert_eq!(asked.len(), 1);
    assert!(asked[0].contains(&root.display().to_string()));
}

#[test]
fn missing_target_is_created_without_asking() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("deep/nested/nb");
    let mut storage = MultiFileStorage::new(Box::new(|_: &str| -> bool {
        panic!("no confirmation expected")
    }));
    let outcome = storage
        .persist(&root, &small_tree(), &PendingSyncSet::new(), ExportMode::None, OffsetRange::FULL)
        .unwrap();
    assert!(outcome.is_completed());
    assert!(root.join("1/node.xml").is_file());
}

#[test]
fn unwritable_location_fails_with_path() {
    let dir = tempdir().unwrap();
    let blocker = dir.path().join("file");
    std::fs::write(&blocker, "not a directory").unwrap();

    let mut storage = MultiFileStorage::new(Box::new(AlwaysOverwrite));
    let err = storage
        .persist(&blocker.join("nb"), &small_tree(), &PendingSyncSet::new(), ExportMode::None, OffsetRange::FULL)
        .unwrap_err();
    assert!(err.to_string().contains("nb"), "{err}");
    assert!(storage.root().is_none());
}
