//! Notebook tree arena
//!
//! Nodes are owned by the arena and refer to each other by id: each node keeps
//! its parent id and the ordered ids of its children. Sibling order is
//! meaningful and is what the storage layer persists.

pub mod node;

pub use node::{
    AnchorKind, AnchoredObject, Justification, NodeContent, NodeProperties, TreeNode,
};

use crate::error::StorageError;
use crate::types::NodeId;
use std::collections::HashMap;

/// Tree query capability used by the storage engine.
///
/// Mirrors an iterator-style tree view: roots and children are reached via
/// first/next queries, `None` meaning "past the end".
pub trait TreeQuery {
    fn first_root(&self) -> Option<NodeId>;
    fn next_sibling(&self, id: NodeId) -> Option<NodeId>;
    fn first_child(&self, id: NodeId) -> Option<NodeId>;
    fn parent(&self, id: NodeId) -> Option<NodeId>;
    fn node(&self, id: NodeId) -> Option<&TreeNode>;
    fn bookmarks(&self) -> &[NodeId];

    fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Ordered children of `parent`, or the roots when `parent` is `None`
    fn children_of(&self, parent: Option<NodeId>) -> Vec<NodeId> {
        let mut ids = Vec::new();
        let mut cursor = match parent {
            Some(id) => self.first_child(id),
            None => self.first_root(),
        };
        while let Some(id) = cursor {
            ids.push(id);
            cursor = self.next_sibling(id);
        }
        ids
    }
}

/// Arena holding every node of one notebook.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeTree {
    nodes: HashMap<NodeId, TreeNode>,
    roots: Vec<NodeId>,
    bookmarks: Vec<NodeId>,
}

impl NodeTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn get(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut TreeNode> {
        self.nodes.get_mut(&id)
    }

    /// Smallest id greater than every id in use (ids start at 1)
    pub fn next_free_id(&self) -> NodeId {
        self.nodes.keys().copied().max().unwrap_or(0).max(0) + 1
    }

    /// Append a new node under `parent` (or as a root) with a fresh id
    pub fn insert(
        &mut self,
        parent: Option<NodeId>,
        properties: NodeProperties,
        content: NodeContent,
    ) -> Result<NodeId, StorageError> {
        let id = self.next_free_id();
        self.insert_with_id(id, parent, None, properties, content)?;
        Ok(id)
    }

    /// Insert a node with a caller-chosen id at `position` among its siblings
    /// (appended when `position` is `None` or past the end).
    pub fn insert_with_id(
        &mut self,
        id: NodeId,
        parent: Option<NodeId>,
        position: Option<usize>,
        properties: NodeProperties,
        content: NodeContent,
    ) -> Result<(), StorageError> {
        if self.nodes.contains_key(&id) {
            return Err(StorageError::InvalidNodeId(format!("duplicate id {}", id)));
        }
        if let Some(parent_id) = parent {
            if !self.nodes.contains_key(&parent_id) {
                return Err(StorageError::NodeNotFound(parent_id));
            }
        }
        let mut node = TreeNode::new(id, properties, content);
        node.parent = parent;
        self.nodes.insert(id, node);
        insert_at(self.sibling_list_mut(parent), id, position);
        Ok(())
    }

    /// Remove a node and all its descendants; returns the removed ids in pre-order
    pub fn remove_subtree(&mut self, id: NodeId) -> Result<Vec<NodeId>, StorageError> {
        let parent = self
            .nodes
            .get(&id)
            .ok_or(StorageError::NodeNotFound(id))?
            .parent;
        let removed = self.descendants(id);
        self.sibling_list_mut(parent).retain(|child| *child != id);
        for removed_id in &removed {
            self.nodes.remove(removed_id);
        }
        self.bookmarks.retain(|bookmark| !removed.contains(bookmark));
        Ok(removed)
    }

    /// Re-parent a node (keeping its subtree) at `position` among its new siblings
    pub fn move_node(
        &mut self,
        id: NodeId,
        new_parent: Option<NodeId>,
        position: Option<usize>,
    ) -> Result<(), StorageError> {
        let old_parent = self
            .nodes
            .get(&id)
            .ok_or(StorageError::NodeNotFound(id))?
            .parent;
        if let Some(target) = new_parent {
            if !self.nodes.contains_key(&target) {
                return Err(StorageError::NodeNotFound(target));
            }
            if self.descendants(id).contains(&target) {
                return Err(StorageError::InvalidNodeId(format!(
                    "cannot move {} under its own descendant {}",
                    id, target
                )));
            }
        }
        self.sibling_list_mut(old_parent).retain(|child| *child != id);
        insert_at(self.sibling_list_mut(new_parent), id, position);
        if let Some(node) = self.nodes.get_mut(&id) {
            node.parent = new_parent;
        }
        Ok(())
    }

    /// `id` followed by all of its descendants, depth first, in sibling order
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get(&current) else {
                continue;
            };
            out.push(current);
            stack.extend(node.children.iter().rev());
        }
        out
    }

    /// Every node of the tree, depth first, roots in order
    pub fn walk(&self) -> Vec<NodeId> {
        self.roots
            .iter()
            .flat_map(|root| self.descendants(*root))
            .collect()
    }

    /// Number of ancestors of `id` (0 for a root)
    pub fn depth(&self, id: NodeId) -> Option<usize> {
        let mut node = self.nodes.get(&id)?;
        let mut depth = 0;
        while let Some(parent) = node.parent {
            node = self.nodes.get(&parent)?;
            depth += 1;
        }
        Some(depth)
    }

    pub fn set_bookmarks(&mut self, bookmarks: Vec<NodeId>) {
        self.bookmarks = bookmarks;
    }

    /// Returns false when the node is missing or already bookmarked
    pub fn add_bookmark(&mut self, id: NodeId) -> bool {
        if !self.nodes.contains_key(&id) || self.bookmarks.contains(&id) {
            return false;
        }
        self.bookmarks.push(id);
        true
    }

    pub fn remove_bookmark(&mut self, id: NodeId) -> bool {
        let before = self.bookmarks.len();
        self.bookmarks.retain(|bookmark| *bookmark != id);
        before != self.bookmarks.len()
    }

    fn sibling_list_mut(&mut self, parent: Option<NodeId>) -> &mut Vec<NodeId> {
        match parent.and_then(|id| self.nodes.get_mut(&id)) {
            Some(node) => &mut node.children,
            None => &mut self.roots,
        }
    }
}

fn insert_at(list: &mut Vec<NodeId>, id: NodeId, position: Option<usize>) {
    match position {
        Some(index) if index < list.len() => list.insert(index, id),
        _ => list.push(id),
    }
}

impl TreeQuery for NodeTree {
    fn first_root(&self) -> Option<NodeId> {
        self.roots.first().copied()
    }

    fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let siblings = match self.nodes.get(&id)?.parent {
            Some(parent) => &self.nodes.get(&parent)?.children,
            None => &self.roots,
        };
        let index = siblings.iter().position(|sibling| *sibling == id)?;
        siblings.get(index + 1).copied()
    }

    fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id)?.children.first().copied()
    }

    fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id)?.parent
    }

    fn node(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(&id)
    }

    fn bookmarks(&self) -> &[NodeId] {
        &self.bookmarks
    }
}
