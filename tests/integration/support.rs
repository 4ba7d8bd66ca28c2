//! Shared fixtures: sample trees and directory snapshots.

use notestore::confirm::AlwaysOverwrite;
use notestore::tree::{AnchorKind, AnchoredObject, Justification};
use notestore::{
    ExportMode, MultiFileStorage, NodeContent, NodeId, NodeProperties, NodeTree, OffsetRange,
    PendingSyncSet, StorageBackend,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Insert node `id` under `parent` with text equal to its name
pub fn add(tree: &mut NodeTree, id: NodeId, parent: Option<NodeId>, name: &str) {
    tree.insert_with_id(id, parent, None, NodeProperties::new(name), NodeContent::from_text(name))
        .unwrap();
}

/// `{1: [2, 3]}`
pub fn small_tree() -> NodeTree {
    let mut tree = NodeTree::new();
    add(&mut tree, 1, None, "one");
    add(&mut tree, 2, Some(1), "two");
    add(&mut tree, 3, Some(1), "three");
    tree
}

/// `{1: [2: [4, 5], 3], 6}` with a bookmark on 5 and an image in 4
pub fn nested_tree() -> NodeTree {
    let mut tree = NodeTree::new();
    add(&mut tree, 1, None, "one");
    add(&mut tree, 2, Some(1), "two");
    add(&mut tree, 4, Some(2), "four");
    add(&mut tree, 5, Some(2), "five");
    add(&mut tree, 3, Some(1), "three");
    add(&mut tree, 6, None, "six");
    tree.get_mut(4).unwrap().content.anchors.push(AnchoredObject {
        char_offset: 2,
        justification: Justification::Center,
        kind: AnchorKind::Image {
            png: vec![0x89, b'P', b'N', b'G', 1, 2, 3],
            link: String::new(),
        },
    });
    tree.add_bookmark(5);
    tree
}

/// Fresh session bound by a first save of `tree` into `root`
pub fn saved(root: &Path, tree: &NodeTree) -> MultiFileStorage {
    let mut storage = MultiFileStorage::new(Box::new(AlwaysOverwrite));
    let outcome = storage
        .persist(root, tree, &PendingSyncSet::new(), ExportMode::None, OffsetRange::FULL)
        .unwrap();
    assert!(outcome.is_completed());
    storage
}

/// Every file under `root` keyed by relative path
pub fn snapshot(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    walkdir::WalkDir::new(root)
        .into_iter()
        .map(|entry| entry.unwrap())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            let relative = entry.path().strip_prefix(root).unwrap().to_path_buf();
            (relative, std::fs::read(entry.path()).unwrap())
        })
        .collect()
}

/// Overwrite a file with a marker so a later rewrite is detectable
pub fn tamper(path: &Path) {
    std::fs::write(path, b"untouched-marker").unwrap();
}

pub fn is_tampered(path: &Path) -> bool {
    std::fs::read(path).unwrap() == b"untouched-marker"
}

pub fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}
