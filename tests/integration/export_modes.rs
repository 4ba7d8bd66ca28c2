use crate::integration::support::{nested_tree, read, saved};
use notestore::confirm::{AlwaysOverwrite, NeverOverwrite};
use notestore::store::multifile::read_storage;
use notestore::{
    ExportMode, MultiFileStorage, OffsetRange, PendingSyncSet, StorageBackend, StorageError,
    TreeQuery,
};
use tempfile::tempdir;

fn export(tree: &notestore::NodeTree, target: &std::path::Path, mode: ExportMode, range: OffsetRange) {
    let mut storage = MultiFileStorage::new(Box::new(AlwaysOverwrite));
    let outcome = storage
        .persist(target, tree, &PendingSyncSet::new(), mode, range)
        .unwrap();
    assert!(outcome.report().unwrap().full_rebuild);
    assert!(storage.root().is_none());
}

#[test]
fn node_and_subnodes_export_keeps_subtree_only() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("sub");
    export(&nested_tree(), &target, ExportMode::NodeAndSubnodes(2), OffsetRange::FULL);

    assert_eq!(read(&target.join("subnodes.lst")), "2");
    assert_eq!(read(&target.join("2/subnodes.lst")), "4,5");
    assert!(target.join("2/4/node.xml").is_file());
    assert!(!target.join("1").exists());
    assert!(!target.join("bookmarks.lst").exists());
}

#[test]
fn current_node_export_does_not_descend() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("one");
    export(&nested_tree(), &target, ExportMode::CurrentNode(1), OffsetRange::FULL);

    assert!(target.join("1/node.xml").is_file());
    assert!(!target.join("1/2").exists());
    assert!(!target.join("1/subnodes.lst").exists());

    let (tree, _) = read_storage(&target).unwrap();
    assert_eq!(tree.len(), 1);
    assert_eq!(tree.get(1).unwrap().content.text, "one");
}

#[test]
fn selection_export_windows_text_and_anchors() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("sel");
    let tree = nested_tree();
    // node 4 is "four" with an image at offset 2
    export(&tree, &target, ExportMode::SelectedText(4), OffsetRange::from_raw(1, 3));

    let (exported, _) = read_storage(&target).unwrap();
    let node = exported.get(4).unwrap();
    assert_eq!(node.content.text, "ou");
    assert_eq!(node.content.anchors.len(), 1);
    assert_eq!(node.content.anchors[0].char_offset, 1);
    assert_eq!(exported.children_of(Some(4)), Vec::<i64>::new());
}

#[test]
fn selection_with_end_sentinel_keeps_rest_of_text() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("sel");
    export(&nested_tree(), &target, ExportMode::SelectedText(5), OffsetRange::from_raw(2, -1));

    let (exported, _) = read_storage(&target).unwrap();
    assert_eq!(exported.get(5).unwrap().content.text, "ve");
}

#[test]
fn export_from_bound_session_leaves_binding_alone() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("nb");
    let tree = nested_tree();
    let mut storage = saved(&root, &tree);

    let target = dir.path().join("copy");
    storage
        .persist(&target, &tree, &PendingSyncSet::new(), ExportMode::AllTree, OffsetRange::FULL)
        .unwrap();
    assert_eq!(storage.root(), Some(root.as_path()));
    assert_eq!(read(&target.join("bookmarks.lst")), "5");

    let mut reader = MultiFileStorage::new(Box::new(NeverOverwrite));
    assert_eq!(reader.populate(&target).unwrap(), tree);
}

#[test]
fn export_of_missing_node_is_an_error() {
    let dir = tempdir().unwrap();
    let mut storage = MultiFileStorage::new(Box::new(AlwaysOverwrite));
    let err = storage
        .persist(
            &dir.path().join("x"),
            &nested_tree(),
            &PendingSyncSet::new(),
            ExportMode::NodeAndSubnodes(42),
            OffsetRange::FULL,
        )
        .unwrap_err();
    assert!(matches!(err, StorageError::NodeNotFound(42)));
}
