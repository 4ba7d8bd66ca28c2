//! Removal of node directories

use crate::error::StorageError;
use crate::store::paths;
use crate::tree::TreeQuery;
use crate::types::NodeId;
use std::path::{Path, PathBuf};

/// Delete the directory of `id` and everything below it.
///
/// The live tree is asked first; `last_known` (the directory the node was last
/// written to, relative to `root`) covers nodes already gone from the tree.
/// Nothing to resolve or nothing on disk is not an error. Returns the removed
/// directory.
pub fn remove_node_dir<T: TreeQuery + ?Sized>(
    root: &Path,
    tree: &T,
    id: NodeId,
    last_known: Option<&Path>,
) -> Result<Option<PathBuf>, StorageError> {
    let dir = paths::node_dir(root, tree, id)
        .filter(|dir| dir.is_dir())
        .or_else(|| last_known.map(|relative| root.join(relative)));
    let Some(dir) = dir else {
        tracing::debug!(node_id = id, "No directory to remove");
        return Ok(None);
    };
    if !dir.exists() {
        return Ok(None);
    }
    remove_dir_verified(&dir)?;
    tracing::debug!(node_id = id, dir = %dir.display(), "Node directory removed");
    Ok(Some(dir))
}

/// Recursively delete `dir` and check it is really gone
pub fn remove_dir_verified(dir: &Path) -> Result<(), StorageError> {
    std::fs::remove_dir_all(dir).map_err(|source| StorageError::RemoveDir {
        path: dir.to_path_buf(),
        source,
    })?;
    if dir.exists() {
        return Err(StorageError::RemovalIncomplete(dir.to_path_buf()));
    }
    Ok(())
}
