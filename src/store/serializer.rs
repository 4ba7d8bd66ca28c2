//! Node serializer
//!
//! Writes one node into its directory (`node.xml` plus attachments) and, when
//! the pass descends, its children as numbered subdirectories followed by the
//! sibling-order manifest. Children always land on disk before the manifest
//! that names them.

use crate::error::StorageError;
use crate::store::cache::{StorageCache, ATTACHMENT_PREFIX};
use crate::store::document::NodeRenderer;
use crate::store::manifest::write_manifest;
use crate::store::write_atomic;
use crate::sync::OffsetRange;
use crate::tree::{TreeNode, TreeQuery};
use crate::types::{NodeId, NODE_XML};
use std::path::{Path, PathBuf};

/// Counters of one serialization pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SerializeCounters {
    pub documents: usize,
    pub manifests: usize,
    pub attachments_pruned: usize,
}

/// Serialization context shared by every node of one pass
pub struct NodeSerializer<'a, T: TreeQuery + ?Sized, R: NodeRenderer + ?Sized> {
    tree: &'a T,
    renderer: &'a R,
    cache: &'a mut StorageCache,
    descend: bool,
    counters: SerializeCounters,
    written: Vec<(NodeId, PathBuf)>,
}

impl<'a, T: TreeQuery + ?Sized, R: NodeRenderer + ?Sized> NodeSerializer<'a, T, R> {
    pub fn new(tree: &'a T, renderer: &'a R, cache: &'a mut StorageCache, descend: bool) -> Self {
        Self {
            tree,
            renderer,
            cache,
            descend,
            counters: SerializeCounters::default(),
            written: Vec::new(),
        }
    }

    pub fn counters(&self) -> SerializeCounters {
        self.counters
    }

    /// Directories written so far, in write order
    pub fn written(&self) -> &[(NodeId, PathBuf)] {
        &self.written
    }

    /// Write `id` into `parent_dir/<id>/`, recursing into children when the
    /// pass descends. `range` applies to this node only.
    pub fn write_subtree(
        &mut self,
        id: NodeId,
        parent_dir: &Path,
        range: OffsetRange,
    ) -> Result<PathBuf, StorageError> {
        let tree = self.tree;
        let node = tree.node(id).ok_or(StorageError::NodeNotFound(id))?;
        let dir = parent_dir.join(id.to_string());
        ensure_dir(&dir)?;
        self.write_document(node, &dir, range)?;

        let children = if self.descend {
            tree.children_of(Some(id))
        } else {
            Vec::new()
        };
        for child in &children {
            self.write_subtree(*child, &dir, OffsetRange::FULL)?;
        }
        self.write_manifest(&dir, &children, false)?;
        Ok(dir)
    }

    /// Rewrite `node.xml` (and attachments) of a node in `dir`
    pub fn write_document(
        &mut self,
        node: &TreeNode,
        dir: &Path,
        range: OffsetRange,
    ) -> Result<(), StorageError> {
        let rendered = self.renderer.render(node, dir, self.cache, range)?;
        write_atomic(&dir.join(NODE_XML), &rendered.document)?;
        self.counters.documents += 1;
        self.counters.attachments_pruned += prune_attachments(dir, &rendered.attachments)?;
        self.written.push((node.id, dir.to_path_buf()));
        tracing::debug!(node_id = node.id, dir = %dir.display(), "Node document written");
        Ok(())
    }

    /// Rewrite the manifest of `dir` listing `children`
    pub fn write_manifest(
        &mut self,
        dir: &Path,
        children: &[NodeId],
        keep_empty: bool,
    ) -> Result<(), StorageError> {
        if write_manifest(dir, children, keep_empty)? {
            self.counters.manifests += 1;
        }
        Ok(())
    }
}

/// Create `dir` (and missing parents); failure aborts the pass
pub fn ensure_dir(dir: &Path) -> Result<(), StorageError> {
    if dir.is_dir() {
        return Ok(());
    }
    std::fs::create_dir_all(dir).map_err(|source| StorageError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })
}

/// Delete attachment files in `dir` that the new document no longer references
fn prune_attachments(dir: &Path, keep: &[String]) -> Result<usize, StorageError> {
    let entries = std::fs::read_dir(dir).map_err(|source| StorageError::Read {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut pruned = 0;
    for entry in entries {
        let entry = entry.map_err(|source| StorageError::Read {
            path: dir.to_path_buf(),
            source,
        })?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !name.starts_with(ATTACHMENT_PREFIX) || keep.iter().any(|kept| kept == name) {
            continue;
        }
        let path = entry.path();
        if path.is_file() {
            std::fs::remove_file(&path).map_err(|source| StorageError::Write { path, source })?;
            pruned += 1;
        }
    }
    Ok(pruned)
}
