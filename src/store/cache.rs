//! Pass-scoped storage cache
//!
//! Attachment file names are derived from a blake3 digest of the payload, which
//! is the expensive part of writing a node. The cache computes them once per
//! pass for the nodes in scope and memoizes any node asked for later. It is
//! dropped at the end of the pass and never persisted.

use crate::sync::{ExportMode, PendingSyncSet};
use crate::tree::{AnchorKind, TreeNode, TreeQuery};
use crate::types::NodeId;
use std::collections::HashMap;

/// Prefix shared by every attachment file inside a node directory
pub const ATTACHMENT_PREFIX: &str = "attach_";

#[derive(Debug, Default)]
pub struct StorageCache {
    /// node id -> file name per anchor (None for inline anchors)
    attachment_names: HashMap<NodeId, Vec<Option<String>>>,
    hits: usize,
}

impl StorageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Warm the cache for the nodes a pass is going to write.
    ///
    /// With a pending set only the nodes whose document will be rewritten are
    /// scanned; otherwise the export mode decides (whole tree or one subtree).
    pub fn build<T: TreeQuery + ?Sized>(
        tree: &T,
        pending: Option<&PendingSyncSet>,
        mode: ExportMode,
    ) -> Self {
        let mut cache = Self::new();
        let scope: Vec<NodeId> = match (pending, mode.scoped_node()) {
            (Some(pending), _) => pending
                .writes()
                .filter(|(_, state)| state.touches_document())
                .map(|(id, _)| id)
                .collect(),
            (None, Some(id)) if mode.descends() => subtree(tree, Some(id)),
            (None, Some(id)) => vec![id],
            (None, None) => subtree(tree, None),
        };
        for id in scope {
            if let Some(node) = tree.node(id) {
                let names = compute_names(node);
                cache.attachment_names.insert(id, names);
            }
        }
        tracing::debug!(nodes = cache.attachment_names.len(), "Storage cache built");
        cache
    }

    /// Attachment file names aligned with `node.content.anchors`
    pub fn attachment_names(&mut self, node: &TreeNode) -> &[Option<String>] {
        let stale = self
            .attachment_names
            .get(&node.id)
            .map_or(true, |names| names.len() != node.content.anchors.len());
        if stale {
            self.attachment_names.insert(node.id, compute_names(node));
        } else {
            self.hits += 1;
        }
        self.attachment_names
            .get(&node.id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.attachment_names.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.attachment_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attachment_names.is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }
}

/// File name for an attachment payload
pub fn attachment_file_name(kind: &AnchorKind) -> Option<String> {
    let payload = kind.attachment_payload()?;
    let digest = blake3::hash(payload);
    let extension = match kind {
        AnchorKind::Image { .. } => "png",
        _ => "bin",
    };
    Some(format!(
        "{}{}.{}",
        ATTACHMENT_PREFIX,
        hex::encode(&digest.as_bytes()[..8]),
        extension
    ))
}

fn compute_names(node: &TreeNode) -> Vec<Option<String>> {
    node.content
        .anchors
        .iter()
        .map(|anchor| attachment_file_name(&anchor.kind))
        .collect()
}

fn subtree<T: TreeQuery + ?Sized>(tree: &T, start: Option<NodeId>) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack: Vec<NodeId> = match start {
        Some(id) => vec![id],
        None => tree.children_of(None).into_iter().rev().collect(),
    };
    while let Some(id) = stack.pop() {
        out.push(id);
        stack.extend(tree.children_of(Some(id)).into_iter().rev());
    }
    out
}
