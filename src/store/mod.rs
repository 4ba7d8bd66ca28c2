//! Notebook storage
//!
//! Persists a `NodeTree` as a directory-per-node layout and keeps that layout
//! in sync with in-memory edits. `StorageBackend` is the contract a storage
//! format implements; `MultiFileStorage` is the directory-based one.

pub mod bookmarks;
pub mod cache;
pub mod document;
pub mod manifest;
pub mod multifile;
pub mod paths;
pub mod removal;
pub mod serializer;

pub use bookmarks::BookmarkWrite;
pub use cache::StorageCache;
pub use document::{NodeRenderer, RenderedNode, XmlNodeRenderer};
pub use multifile::MultiFileStorage;

use crate::confirm::OverwriteConfirm;
use crate::error::StorageError;
use crate::sync::{ExportMode, OffsetRange, PendingSyncSet};
use crate::tree::{NodeContent, NodeTree};
use crate::types::NodeId;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Result of a persist call that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistOutcome {
    Completed(PersistReport),
    /// The target existed and the overwrite was refused; nothing was touched
    Declined,
}

impl PersistOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, PersistOutcome::Completed(_))
    }

    pub fn report(&self) -> Option<&PersistReport> {
        match self {
            PersistOutcome::Completed(report) => Some(report),
            PersistOutcome::Declined => None,
        }
    }
}

/// Summary of one persist pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistReport {
    pub root: PathBuf,
    /// True for a fresh create (save or export), false for an incremental sync
    pub full_rebuild: bool,
    pub documents_written: usize,
    pub manifests_written: usize,
    pub directories_removed: usize,
    pub nodes_moved: usize,
    pub attachments_pruned: usize,
    pub bookmarks: Option<BookmarkWrite>,
}

/// Persistence strategy for a notebook tree
pub trait StorageBackend {
    /// Read a stored notebook and bind the session to it
    fn populate(&mut self, path: &Path) -> Result<NodeTree, StorageError>;

    /// Save, sync, or export `tree` (see `ExportMode`)
    fn persist(
        &mut self,
        target: &Path,
        tree: &NodeTree,
        pending: &PendingSyncSet,
        mode: ExportMode,
        range: OffsetRange,
    ) -> Result<PersistOutcome, StorageError>;

    /// Graft the nodes stored at `path` under `parent` with fresh ids
    fn import_nodes(
        &self,
        path: &Path,
        tree: &mut NodeTree,
        parent: Option<NodeId>,
    ) -> Result<Vec<NodeId>, StorageError>;

    /// Re-read one node's content from the bound storage
    fn deferred_content(&self, node_id: NodeId) -> Result<NodeContent, StorageError>;

    /// Directory this session is bound to, if any
    fn root(&self) -> Option<&Path>;
}

/// Available storage formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    MultiFile,
}

/// Construct the backend selected by configuration
pub fn open_backend(kind: StorageKind, confirm: Box<dyn OverwriteConfirm>) -> Box<dyn StorageBackend> {
    match kind {
        StorageKind::MultiFile => Box::new(MultiFileStorage::new(confirm)),
    }
}

/// Write through a temporary sibling file followed by rename
pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> Result<(), StorageError> {
    let tmp_path = path.with_extension("tmp");
    let io_err = |source| StorageError::Write {
        path: path.to_path_buf(),
        source,
    };
    std::fs::write(&tmp_path, data).map_err(io_err)?;
    std::fs::rename(&tmp_path, path).map_err(io_err)
}
