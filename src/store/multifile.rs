//! Multi-file storage session
//!
//! One `MultiFileStorage` serves one open notebook. It starts unbound; the
//! first save (or a populate) binds it to a storage root for the rest of its
//! life. Unbound saves and every export rebuild a directory from scratch;
//! bound saves apply a `PendingSyncSet` in place.

use crate::confirm::OverwriteConfirm;
use crate::error::StorageError;
use crate::store::bookmarks::{read_bookmarks, write_bookmarks};
use crate::store::cache::StorageCache;
use crate::store::document::{read_node_document, NodeRenderer, XmlNodeRenderer};
use crate::store::manifest::read_manifest;
use crate::store::paths;
use crate::store::removal::{remove_dir_verified, remove_node_dir};
use crate::store::serializer::{ensure_dir, NodeSerializer};
use crate::store::{PersistOutcome, PersistReport, StorageBackend};
use crate::sync::{ExportMode, NodeSyncState, OffsetRange, PendingSyncSet};
use crate::tree::{NodeContent, NodeTree, TreeQuery};
use crate::types::NodeId;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Directory-per-node storage session
pub struct MultiFileStorage {
    root: Option<PathBuf>,
    /// node id -> directory (relative to root) it was last written to or read from
    disk_index: HashMap<NodeId, PathBuf>,
    confirm: Box<dyn OverwriteConfirm>,
    renderer: Box<dyn NodeRenderer>,
}

impl MultiFileStorage {
    pub fn new(confirm: Box<dyn OverwriteConfirm>) -> Self {
        Self::with_renderer(confirm, Box::new(XmlNodeRenderer))
    }

    pub fn with_renderer(confirm: Box<dyn OverwriteConfirm>, renderer: Box<dyn NodeRenderer>) -> Self {
        Self {
            root: None,
            disk_index: HashMap::new(),
            confirm,
            renderer,
        }
    }

    pub fn is_bound(&self) -> bool {
        self.root.is_some()
    }

    /// Directory of `id` as last persisted, relative to the root
    pub fn indexed_dir(&self, id: NodeId) -> Option<&Path> {
        self.disk_index.get(&id).map(PathBuf::as_path)
    }

    fn bind(&mut self, root: &Path) -> Result<(), StorageError> {
        match &self.root {
            Some(bound) if bound != root => Err(StorageError::AlreadyBound(bound.clone())),
            Some(_) => Ok(()),
            None => {
                info!(root = %root.display(), "Storage session bound");
                self.root = Some(root.to_path_buf());
                Ok(())
            }
        }
    }

    fn record_written(&mut self, root: &Path, written: &[(NodeId, PathBuf)]) {
        for (id, dir) in written {
            if let Ok(relative) = dir.strip_prefix(root) {
                self.disk_index.insert(*id, relative.to_path_buf());
            }
        }
    }

    fn relocate_below(
        disk_index: &mut HashMap<NodeId, PathBuf>,
        old_relative: &Path,
        new_relative: &Path,
    ) {
        for dir in disk_index.values_mut() {
            if let Ok(rest) = dir.strip_prefix(old_relative) {
                *dir = new_relative.join(rest);
            }
        }
    }

    fn forget_below(&mut self, relative: &Path) {
        self.disk_index.retain(|_, dir| !dir.starts_with(relative));
    }

    /// Fresh create of `target`: confirm overwrite, wipe, create, write all.
    fn fresh_create(
        &mut self,
        target: &Path,
        tree: &NodeTree,
        mode: ExportMode,
        range: OffsetRange,
    ) -> Result<PersistOutcome, StorageError> {
        let top_level = match mode.scoped_node() {
            Some(id) if !tree.contains(id) => return Err(StorageError::NodeNotFound(id)),
            Some(id) => vec![id],
            None => tree.children_of(None),
        };

        if target.is_dir() {
            let message = format!(
                "The directory {} already exists, do you want to overwrite it?",
                target.display()
            );
            if !self.confirm.confirm_overwrite(&message) {
                info!(dir = %target.display(), "Overwrite declined, nothing written");
                return Ok(PersistOutcome::Declined);
            }
            remove_dir_verified(target)?;
        }
        ensure_dir(target)?;

        let binds = !mode.is_export();
        if binds {
            self.bind(target)?;
            self.disk_index.clear();
        }

        let mut report = PersistReport {
            root: target.to_path_buf(),
            full_rebuild: true,
            ..PersistReport::default()
        };
        if mode.includes_bookmarks() {
            report.bookmarks = Some(write_bookmarks(target, tree.bookmarks())?);
        }

        let mut cache = StorageCache::build(tree, None, mode);
        let mut serializer =
            NodeSerializer::new(tree, self.renderer.as_ref(), &mut cache, mode.descends());
        for id in &top_level {
            serializer.write_subtree(*id, target, range)?;
        }
        serializer.write_manifest(target, &top_level, true)?;

        let counters = serializer.counters();
        let written = serializer.written().to_vec();
        report.documents_written = counters.documents;
        report.manifests_written = counters.manifests;
        report.attachments_pruned = counters.attachments_pruned;
        if binds {
            self.record_written(target, &written);
        }

        info!(
            dir = %target.display(),
            mode = ?mode,
            documents = report.documents_written,
            "Storage written from scratch"
        );
        Ok(PersistOutcome::Completed(report))
    }

    /// Apply a pending set to the bound root: writes first, then removals.
    fn sync_incremental(
        &mut self,
        root: &Path,
        tree: &NodeTree,
        pending: &PendingSyncSet,
    ) -> Result<PersistReport, StorageError> {
        let mut report = PersistReport {
            root: root.to_path_buf(),
            ..PersistReport::default()
        };
        if pending.bookmarks_changed() {
            report.bookmarks = Some(write_bookmarks(root, tree.bookmarks())?);
        }

        let mut writes: Vec<(NodeId, NodeSyncState)> = pending
            .writes()
            .filter(|(id, _)| {
                let live = tree.contains(*id);
                if !live {
                    debug!(node_id = *id, "Pending write for a node no longer in the tree");
                }
                live
            })
            .collect();
        writes.sort_by_key(|(id, _)| (tree.depth(*id).unwrap_or(usize::MAX), *id));

        // Manifests to rewrite once every document is on disk; None is the root.
        let mut stale_manifests: BTreeSet<Option<NodeId>> = BTreeSet::new();
        let mut cache = StorageCache::build(tree, Some(pending), ExportMode::None);
        let mut moved = 0usize;
        let written = {
            let mut serializer =
                NodeSerializer::new(tree, self.renderer.as_ref(), &mut cache, false);
            for (id, state) in writes {
                let (Some(node), Some(relative)) = (tree.get(id), paths::relative_node_dir(tree, id))
                else {
                    continue;
                };
                let dir = root.join(&relative);

                if let Some(previous) = self.disk_index.get(&id).cloned() {
                    let old_dir = root.join(&previous);
                    if previous != relative && old_dir.is_dir() && !dir.exists() {
                        if let Some(parent_dir) = dir.parent() {
                            ensure_dir(parent_dir)?;
                        }
                        std::fs::rename(&old_dir, &dir).map_err(|source| StorageError::Write {
                            path: dir.clone(),
                            source,
                        })?;
                        debug!(node_id = id, from = %old_dir.display(), to = %dir.display(), "Node directory moved");
                        stale_manifests.insert(parent_from_relative(&previous));
                        stale_manifests.insert(tree.parent(id));
                        // Descendants travel with the directory; later moves resolve from here.
                        Self::relocate_below(&mut self.disk_index, &previous, &relative);
                        moved += 1;
                    }
                }

                let first_write = !state.is_update || !dir.is_dir();
                if first_write {
                    ensure_dir(&dir)?;
                    serializer.write_document(node, &dir, OffsetRange::FULL)?;
                    stale_manifests.insert(Some(id));
                    stale_manifests.insert(tree.parent(id));
                    continue;
                }
                if state.prop || state.buff {
                    serializer.write_document(node, &dir, OffsetRange::FULL)?;
                }
                if state.hier {
                    stale_manifests.insert(Some(id));
                }
            }
            let manifests = Self::write_stale_manifests(root, tree, &stale_manifests, &mut serializer)?;
            let counters = serializer.counters();
            report.documents_written = counters.documents;
            report.attachments_pruned = counters.attachments_pruned;
            report.manifests_written = manifests;
            serializer.written().to_vec()
        };

        report.nodes_moved = moved;
        self.record_written(root, &written);

        let mut removal_manifests: BTreeSet<Option<NodeId>> = BTreeSet::new();
        for id in pending.removals() {
            let last_known = self.disk_index.get(&id).cloned();
            let removed = remove_node_dir(root, tree, id, last_known.as_deref())?;
            let Some(removed) = removed else {
                continue;
            };
            report.directories_removed += 1;
            if let Ok(relative) = removed.strip_prefix(root) {
                let relative = relative.to_path_buf();
                self.forget_below(&relative);
                let parent = parent_from_relative(&relative);
                let parent_removed =
                    parent.is_some_and(|p| matches!(pending.action(p), Some(crate::sync::SyncAction::Remove)));
                if !parent_removed {
                    removal_manifests.insert(parent);
                }
            }
        }
        if !removal_manifests.is_empty() {
            let mut cache = StorageCache::new();
            let mut serializer =
                NodeSerializer::new(tree, self.renderer.as_ref(), &mut cache, false);
            report.manifests_written +=
                Self::write_stale_manifests(root, tree, &removal_manifests, &mut serializer)?;
        }

        info!(
            root = %root.display(),
            documents = report.documents_written,
            manifests = report.manifests_written,
            removed = report.directories_removed,
            "Incremental sync applied"
        );
        Ok(report)
    }

    /// Rewrite manifests deepest first so children exist before parents list them
    fn write_stale_manifests<R: NodeRenderer + ?Sized>(
        root: &Path,
        tree: &NodeTree,
        stale: &BTreeSet<Option<NodeId>>,
        serializer: &mut NodeSerializer<'_, NodeTree, R>,
    ) -> Result<usize, StorageError> {
        let mut ordered: Vec<(usize, Option<NodeId>)> = stale
            .iter()
            .filter_map(|parent| match parent {
                None => Some((0, None)),
                Some(id) => tree.depth(*id).map(|depth| (depth + 1, Some(*id))),
            })
            .collect();
        ordered.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

        let before = serializer.counters().manifests;
        for (_, parent) in ordered {
            let Some(dir) = paths::children_dir(root, tree, parent) else {
                continue;
            };
            if !dir.is_dir() {
                debug!(dir = %dir.display(), "Skipping manifest of a directory not on disk");
                continue;
            }
            serializer.write_manifest(&dir, &tree.children_of(parent), parent.is_none())?;
        }
        Ok(serializer.counters().manifests - before)
    }
}

/// Parent id encoded in a relative node directory (`None` for top-level nodes)
fn parent_from_relative(relative: &Path) -> Option<NodeId> {
    relative
        .parent()
        .and_then(|parent| parent.file_name())
        .and_then(|name| name.to_str())
        .and_then(paths::parse_segment)
}

/// Read a storage directory into a fresh tree plus the on-disk index
pub fn read_storage(root: &Path) -> Result<(NodeTree, HashMap<NodeId, PathBuf>), StorageError> {
    if !root.is_dir() {
        return Err(StorageError::Read {
            path: root.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "storage directory not found"),
        });
    }
    let mut tree = NodeTree::new();
    let mut index = HashMap::new();
    let top_level = match read_manifest(root)? {
        Some(ids) => ids,
        None => discover_children(root)?,
    };
    read_level(root, root, None, &top_level, &mut tree, &mut index)?;

    let bookmarks: Vec<NodeId> = read_bookmarks(root)?
        .into_iter()
        .filter(|id| {
            let known = tree.contains(*id);
            if !known {
                warn!(node_id = *id, "Dropping bookmark of an unknown node");
            }
            known
        })
        .collect();
    tree.set_bookmarks(bookmarks);
    Ok((tree, index))
}

fn read_level(
    root: &Path,
    dir: &Path,
    parent: Option<NodeId>,
    ids: &[NodeId],
    tree: &mut NodeTree,
    index: &mut HashMap<NodeId, PathBuf>,
) -> Result<(), StorageError> {
    for id in ids {
        let node_dir = dir.join(id.to_string());
        if !node_dir.is_dir() {
            warn!(node_id = *id, dir = %dir.display(), "Manifest entry without a directory, skipped");
            continue;
        }
        let parsed = read_node_document(&node_dir)?;
        if parsed.id != *id {
            return Err(StorageError::malformed(
                &node_dir,
                format!("directory {} holds node {}", id, parsed.id),
            ));
        }
        tree.insert_with_id(*id, parent, None, parsed.properties, parsed.content)
            .map_err(|_| StorageError::malformed(&node_dir, format!("duplicate node id {}", id)))?;
        if let Ok(relative) = node_dir.strip_prefix(root) {
            index.insert(*id, relative.to_path_buf());
        }
        let children = match read_manifest(&node_dir)? {
            Some(children) => children,
            None => discover_children(&node_dir)?,
        };
        read_level(root, &node_dir, Some(*id), &children, tree, index)?;
    }
    Ok(())
}

/// Numbered subdirectories in ascending id order, for directories without a manifest
fn discover_children(dir: &Path) -> Result<Vec<NodeId>, StorageError> {
    let mut ids: Vec<NodeId> = walkdir::WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_dir())
        .filter_map(|entry| entry.file_name().to_str().and_then(paths::parse_segment))
        .collect();
    ids.sort_unstable();
    if !ids.is_empty() {
        warn!(dir = %dir.display(), "No manifest, children ordered by id");
    }
    Ok(ids)
}

impl StorageBackend for MultiFileStorage {
    fn populate(&mut self, path: &Path) -> Result<NodeTree, StorageError> {
        if let Some(bound) = &self.root {
            if bound != path {
                return Err(StorageError::AlreadyBound(bound.clone()));
            }
        }
        let (tree, index) = read_storage(path)?;
        self.bind(path)?;
        self.disk_index = index;
        info!(root = %path.display(), nodes = tree.len(), "Storage populated");
        Ok(tree)
    }

    fn persist(
        &mut self,
        target: &Path,
        tree: &NodeTree,
        pending: &PendingSyncSet,
        mode: ExportMode,
        range: OffsetRange,
    ) -> Result<PersistOutcome, StorageError> {
        let result = match self.root.clone() {
            Some(root) if !mode.is_export() => {
                if root != target {
                    debug!(
                        root = %root.display(),
                        dir = %target.display(),
                        "Bound session ignores the save target"
                    );
                }
                self.sync_incremental(&root, tree, pending)
                    .map(PersistOutcome::Completed)
            }
            _ => self.fresh_create(target, tree, mode, range),
        };
        if let Err(err) = &result {
            tracing::error!(dir = %target.display(), error = %err, "Persist failed");
        }
        result
    }

    fn import_nodes(
        &self,
        path: &Path,
        tree: &mut NodeTree,
        parent: Option<NodeId>,
    ) -> Result<Vec<NodeId>, StorageError> {
        if let Some(parent_id) = parent {
            if !tree.contains(parent_id) {
                return Err(StorageError::NodeNotFound(parent_id));
            }
        }
        let (imported, _) = read_storage(path)?;
        let mut next_id = tree.next_free_id();
        let mut remap: HashMap<NodeId, NodeId> = HashMap::new();
        let order = imported.walk();
        for old_id in &order {
            remap.insert(*old_id, next_id);
            next_id += 1;
        }
        for old_id in &order {
            let node = imported.get(*old_id).ok_or(StorageError::NodeNotFound(*old_id))?;
            let new_id = *remap.get(old_id).ok_or(StorageError::NodeNotFound(*old_id))?;
            let new_parent = match node.parent {
                Some(old_parent) => Some(
                    *remap
                        .get(&old_parent)
                        .ok_or(StorageError::NodeNotFound(old_parent))?,
                ),
                None => parent,
            };
            tree.insert_with_id(
                new_id,
                new_parent,
                None,
                node.properties.clone(),
                node.content.clone(),
            )?;
        }
        let top: Vec<NodeId> = imported
            .roots()
            .iter()
            .filter_map(|id| remap.get(id).copied())
            .collect();
        info!(source = %path.display(), nodes = order.len(), "Nodes imported");
        Ok(top)
    }

    fn deferred_content(&self, node_id: NodeId) -> Result<NodeContent, StorageError> {
        let root = self.root.as_ref().ok_or(StorageError::NotBound)?;
        let relative = self
            .disk_index
            .get(&node_id)
            .ok_or(StorageError::NodeNotFound(node_id))?;
        Ok(read_node_document(&root.join(relative))?.content)
    }

    fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }
}
