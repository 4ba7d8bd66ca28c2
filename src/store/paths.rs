//! Node directory resolution
//!
//! A node lives at `<root>/<id1>/<id2>/.../<idN>/`, the oldest ancestor first.

use crate::tree::TreeQuery;
use crate::types::NodeId;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Directory of `id` relative to the storage root.
///
/// Returns `None` when the node is not in the live tree, which happens
/// naturally for nodes that were already removed.
pub fn relative_node_dir<T: TreeQuery + ?Sized>(tree: &T, id: NodeId) -> Option<PathBuf> {
    if !tree.contains(id) {
        return None;
    }
    let mut chain = vec![id];
    let mut seen = HashSet::from([id]);
    let mut cursor = tree.parent(id);
    while let Some(ancestor) = cursor {
        if !seen.insert(ancestor) {
            tracing::warn!(node_id = id, ancestor, "Parent cycle while resolving node path");
            return None;
        }
        chain.push(ancestor);
        cursor = tree.parent(ancestor);
    }
    Some(chain.iter().rev().map(|segment| segment.to_string()).collect())
}

/// Absolute directory of `id` under `root`
pub fn node_dir<T: TreeQuery + ?Sized>(root: &Path, tree: &T, id: NodeId) -> Option<PathBuf> {
    relative_node_dir(tree, id).map(|relative| root.join(relative))
}

/// Directory holding the children of `parent` (the root itself for top-level nodes)
pub fn children_dir<T: TreeQuery + ?Sized>(
    root: &Path,
    tree: &T,
    parent: Option<NodeId>,
) -> Option<PathBuf> {
    match parent {
        Some(id) => node_dir(root, tree, id),
        None => Some(root.to_path_buf()),
    }
}

/// Parse a directory name back into a node id
pub fn parse_segment(name: &str) -> Option<NodeId> {
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit() || b == b'-') {
        return None;
    }
    name.parse().ok()
}
