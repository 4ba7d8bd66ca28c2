use crate::integration::support::{is_tampered, nested_tree, read, saved, tamper};
use notestore::confirm::NeverOverwrite;
use notestore::{ExportMode, MultiFileStorage, NodeSyncState, OffsetRange, PendingSyncSet, StorageBackend};
use tempfile::tempdir;

#[test]
fn removed_subtree_disappears_with_descendants() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("nb");
    let mut tree = nested_tree();
    let mut storage = saved(&root, &tree);
    tamper(&root.join("1/node.xml"));
    tamper(&root.join("1/3/node.xml"));

    tree.remove_subtree(2).unwrap();
    let mut pending = PendingSyncSet::new();
    pending.mark_remove(2);
    pending.mark_bookmarks_changed();
    let report = storage
        .persist(&root, &tree, &pending, ExportMode::None, OffsetRange::FULL)
        .unwrap()
        .report()
        .cloned()
        .unwrap();

    assert_eq!(report.directories_removed, 1);
    assert!(!root.join("1/2").exists());
    assert_eq!(read(&root.join("1/subnodes.lst")), "3");
    assert!(is_tampered(&root.join("1/node.xml")));
    assert!(is_tampered(&root.join("1/3/node.xml")));
    // bookmark 5 lived under 2
    assert!(!root.join("bookmarks.lst").exists());
    assert_eq!(storage.indexed_dir(4), None);
}

#[test]
fn removing_last_child_drops_parent_manifest() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("nb");
    let mut tree = nested_tree();
    let mut storage = saved(&root, &tree);

    tree.remove_subtree(4).unwrap();
    tree.remove_subtree(5).unwrap();
    let mut pending = PendingSyncSet::new();
    pending.mark_remove(4);
    pending.mark_remove(5);
    storage
        .persist(&root, &tree, &pending, ExportMode::None, OffsetRange::FULL)
        .unwrap();

    assert!(root.join("1/2/node.xml").is_file());
    assert!(!root.join("1/2/subnodes.lst").exists());
    assert!(!root.join("1/2/4").exists());
}

#[test]
fn removing_unknown_node_is_a_noop() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("nb");
    let tree = nested_tree();
    let mut storage = saved(&root, &tree);

    let mut pending = PendingSyncSet::new();
    pending.mark_remove(99);
    let report = storage
        .persist(&root, &tree, &pending, ExportMode::None, OffsetRange::FULL)
        .unwrap()
        .report()
        .cloned()
        .unwrap();
    assert_eq!(report.directories_removed, 0);
}

#[test]
fn remove_wins_over_earlier_write() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("nb");
    let mut tree = nested_tree();
    let mut storage = saved(&root, &tree);

    let mut pending = PendingSyncSet::new();
    pending.mark_write(6, NodeSyncState::properties());
    tree.remove_subtree(6).unwrap();
    pending.mark_remove(6);
    pending.mark_write(6, NodeSyncState::buffer());
    storage
        .persist(&root, &tree, &pending, ExportMode::None, OffsetRange::FULL)
        .unwrap();

    assert!(!root.join("6").exists());
    assert_eq!(read(&root.join("subnodes.lst")), "1");

    let mut reader = MultiFileStorage::new(Box::new(NeverOverwrite));
    assert_eq!(reader.populate(&root).unwrap(), tree);
}

#[test]
fn session_loaded_by_populate_can_remove() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("nb");
    saved(&root, &nested_tree());

    let mut storage = MultiFileStorage::new(Box::new(NeverOverwrite));
    let mut tree = storage.populate(&root).unwrap();
    tree.remove_subtree(3).unwrap();
    let mut pending = PendingSyncSet::new();
    pending.mark_remove(3);
    storage
        .persist(&root, &tree, &pending, ExportMode::None, OffsetRange::FULL)
        .unwrap();

    assert!(!root.join("1/3").exists());
    assert_eq!(read(&root.join("1/subnodes.lst")), "2");
}
