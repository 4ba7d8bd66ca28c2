//! Pending sync set, export modes, and content offset windows
//!
//! Describes what a persist pass has to do: which nodes to rewrite (and which
//! parts of them), which nodes to delete, and whether the bookmark list moved.

use crate::types::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which parts of a node changed since the last persisted state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodeSyncState {
    /// Existing on-disk data is updated; false means first write
    pub is_update: bool,
    /// Properties (name, syntax, tags, ...) changed
    pub prop: bool,
    /// Text buffer / anchored objects changed
    pub buff: bool,
    /// Child list (membership or order) changed
    pub hier: bool,
}

impl NodeSyncState {
    /// First write of a new node: everything is written
    pub fn new_node() -> Self {
        Self {
            is_update: false,
            prop: true,
            buff: true,
            hier: true,
        }
    }

    pub fn properties() -> Self {
        Self {
            is_update: true,
            prop: true,
            ..Self::default()
        }
    }

    pub fn buffer() -> Self {
        Self {
            is_update: true,
            buff: true,
            ..Self::default()
        }
    }

    pub fn hierarchy() -> Self {
        Self {
            is_update: true,
            hier: true,
            ..Self::default()
        }
    }

    /// Union of two change sets; a first write stays a first write
    pub fn merge(self, other: NodeSyncState) -> NodeSyncState {
        NodeSyncState {
            is_update: self.is_update && other.is_update,
            prop: self.prop || other.prop,
            buff: self.buff || other.buff,
            hier: self.hier || other.hier,
        }
    }

    pub fn touches_document(&self) -> bool {
        !self.is_update || self.prop || self.buff
    }
}

/// What a pass does for one node id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncAction {
    Write(NodeSyncState),
    Remove,
}

/// Changes accumulated since the last persist.
///
/// Each id carries exactly one action, so a node can never be both written and
/// removed in the same pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingSyncSet {
    actions: BTreeMap<NodeId, SyncAction>,
    bookmarks_changed: bool,
}

impl PendingSyncSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a write; merges with an earlier write of the same node.
    /// A node already marked for removal stays removed.
    pub fn mark_write(&mut self, id: NodeId, state: NodeSyncState) {
        match self.actions.get(&id).copied() {
            Some(SyncAction::Remove) => {}
            Some(SyncAction::Write(existing)) => {
                self.actions
                    .insert(id, SyncAction::Write(existing.merge(state)));
            }
            None => {
                self.actions.insert(id, SyncAction::Write(state));
            }
        }
    }

    /// Record a subtree removal; replaces any pending write of the node
    pub fn mark_remove(&mut self, id: NodeId) {
        self.actions.insert(id, SyncAction::Remove);
    }

    pub fn mark_bookmarks_changed(&mut self) {
        self.bookmarks_changed = true;
    }

    pub fn bookmarks_changed(&self) -> bool {
        self.bookmarks_changed
    }

    pub fn action(&self, id: NodeId) -> Option<SyncAction> {
        self.actions.get(&id).copied()
    }

    pub fn writes(&self) -> impl Iterator<Item = (NodeId, NodeSyncState)> + '_ {
        self.actions.iter().filter_map(|(id, action)| match action {
            SyncAction::Write(state) => Some((*id, *state)),
            SyncAction::Remove => None,
        })
    }

    pub fn removals(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.actions.iter().filter_map(|(id, action)| match action {
            SyncAction::Remove => Some(*id),
            SyncAction::Write(_) => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty() && !self.bookmarks_changed
    }
}

/// Scope and recursion behavior of a persist pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportMode {
    /// Save of the document itself: fresh create when unbound, incremental otherwise
    None,
    /// Export every node into a new directory
    AllTree,
    /// Export one node and its descendants
    NodeAndSubnodes(NodeId),
    /// Export one node without its children
    CurrentNode(NodeId),
    /// Export a text selection of one node (see `OffsetRange`)
    SelectedText(NodeId),
}

impl ExportMode {
    pub fn is_export(&self) -> bool {
        !matches!(self, ExportMode::None)
    }

    pub fn includes_bookmarks(&self) -> bool {
        matches!(self, ExportMode::None | ExportMode::AllTree)
    }

    pub fn descends(&self) -> bool {
        !matches!(self, ExportMode::CurrentNode(_) | ExportMode::SelectedText(_))
    }

    /// The single node this mode is scoped to, if any
    pub fn scoped_node(&self) -> Option<NodeId> {
        match self {
            ExportMode::NodeAndSubnodes(id)
            | ExportMode::CurrentNode(id)
            | ExportMode::SelectedText(id) => Some(*id),
            ExportMode::None | ExportMode::AllTree => None,
        }
    }
}

/// Character window of a node's content; `end: None` means "to the end"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetRange {
    pub start: usize,
    pub end: Option<usize>,
}

impl OffsetRange {
    pub const FULL: OffsetRange = OffsetRange {
        start: 0,
        end: None,
    };

    pub fn new(start: usize, end: Option<usize>) -> Self {
        Self { start, end }
    }

    /// Accepts the `(start, -1)` convention; any negative end means "to the end"
    pub fn from_raw(start: i64, end: i64) -> Self {
        Self {
            start: start.max(0) as usize,
            end: if end < 0 { None } else { Some(end as usize) },
        }
    }

    pub fn is_full(&self) -> bool {
        self.start == 0 && self.end.is_none()
    }
}

impl Default for OffsetRange {
    fn default() -> Self {
        OffsetRange::FULL
    }
}
