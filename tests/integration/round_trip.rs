use crate::integration::support::{nested_tree, read, saved, small_tree, snapshot};
use notestore::confirm::NeverOverwrite;
use notestore::store::multifile::read_storage;
use notestore::{
    ExportMode, MultiFileStorage, NodeContent, NodeProperties, NodeTree, OffsetRange,
    PendingSyncSet, StorageBackend,
};
use proptest::prelude::*;
use tempfile::tempdir;

#[test]
fn whole_tree_export_matches_documented_layout() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("export");
    let mut storage = MultiFileStorage::new(Box::new(NeverOverwrite));
    let outcome = storage
        .persist(&root, &small_tree(), &PendingSyncSet::new(), ExportMode::AllTree, OffsetRange::FULL)
        .unwrap();
    assert!(outcome.is_completed());

    assert!(root.join("1/node.xml").is_file());
    assert_eq!(read(&root.join("1/subnodes.lst")), "2,3");
    assert!(root.join("1/2/node.xml").is_file());
    assert!(root.join("1/3/node.xml").is_file());
    assert_eq!(read(&root.join("subnodes.lst")), "1");
    assert!(!root.join("bookmarks.lst").exists());
    assert!(!root.join("1/2/subnodes.lst").exists());
}

#[test]
fn populate_reproduces_saved_tree() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("nb");
    let tree = nested_tree();
    saved(&root, &tree);
    assert_eq!(read(&root.join("bookmarks.lst")), "5");
    assert_eq!(read(&root.join("subnodes.lst")), "1,6");

    let mut reader = MultiFileStorage::new(Box::new(NeverOverwrite));
    let loaded = reader.populate(&root).unwrap();
    assert_eq!(loaded, tree);
    assert_eq!(reader.root(), Some(root.as_path()));
}

#[test]
fn saving_same_tree_twice_is_byte_identical() {
    let dir = tempdir().unwrap();
    let tree = nested_tree();
    saved(&dir.path().join("a"), &tree);
    saved(&dir.path().join("b"), &tree);
    let first = snapshot(&dir.path().join("a"));
    assert_eq!(first, snapshot(&dir.path().join("b")));
    assert!(first.keys().any(|path| path.to_string_lossy().contains("attach_")));
}

#[test]
fn legacy_xml_manifests_are_readable() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("legacy");
    saved(&root, &nested_tree());
    std::fs::remove_file(root.join("subnodes.lst")).unwrap();
    std::fs::remove_file(root.join("bookmarks.lst")).unwrap();
    std::fs::write(
        root.join("subnodes.xml"),
        r#"<?xml version="1.0"?><root><subnodes val="6,1"/><bookmarks val="5,9"/></root>"#,
    )
    .unwrap();

    let (tree, index) = read_storage(&root).unwrap();
    assert_eq!(tree.roots(), &[6, 1]);
    assert_eq!(tree.len(), 6);
    // 9 is not in the tree and is dropped
    assert_eq!(notestore::TreeQuery::bookmarks(&tree), &[5]);
    assert_eq!(index.get(&4).unwrap(), std::path::Path::new("1/2/4"));
}

#[test]
fn manifest_entry_without_directory_is_skipped() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("nb");
    saved(&root, &small_tree());
    std::fs::write(root.join("1/subnodes.lst"), "2,7,3").unwrap();

    let (tree, _) = read_storage(&root).unwrap();
    assert_eq!(notestore::TreeQuery::children_of(&tree, Some(1)), vec![2, 3]);
}

#[test]
fn mismatched_directory_id_is_malformed() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("nb");
    saved(&root, &small_tree());
    std::fs::rename(root.join("1/3"), root.join("1/8")).unwrap();
    std::fs::write(root.join("1/subnodes.lst"), "2,8").unwrap();

    let err = read_storage(&root).unwrap_err();
    assert!(matches!(err, notestore::StorageError::Malformed { .. }), "{err}");
}

/// Random forest: node `i + 1` hangs under an earlier node or becomes a root
fn build_tree(shape: &[(usize, String, String)]) -> NodeTree {
    let mut tree = NodeTree::new();
    for (index, (parent_choice, name, text)) in shape.iter().enumerate() {
        let id = index as i64 + 1;
        let pick = parent_choice % (index + 1);
        let parent = (pick < index).then_some(pick as i64 + 1);
        tree.insert_with_id(id, parent, None, NodeProperties::new(name.clone()), NodeContent::from_text(text.clone()))
            .unwrap();
    }
    tree
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn any_tree_shape_round_trips(
        shape in prop::collection::vec(
            (0usize..64, "[a-zA-Z0-9 &<>']{1,12}", "[a-zA-Z0-9 &<>\"'\n]{0,40}"),
            0..24,
        )
    ) {
        let tree = build_tree(&shape);
        let dir = tempdir().unwrap();
        let root = dir.path().join("nb");
        saved(&root, &tree);

        let mut reader = MultiFileStorage::new(Box::new(NeverOverwrite));
        let loaded = reader.populate(&root).unwrap();
        prop_assert_eq!(loaded, tree);
    }
}
