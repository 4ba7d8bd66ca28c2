//! Core types shared by the tree model and the storage engine.

/// NodeID: identifier of a notebook node, unique across the whole tree
pub type NodeId = i64;

/// Name of the per-node document inside every node directory
pub const NODE_XML: &str = "node.xml";

/// Sibling-order manifest written at each directory level
pub const SUBNODES_LST: &str = "subnodes.lst";

/// Legacy XML-wrapped manifest, read but never written
pub const SUBNODES_XML: &str = "subnodes.xml";

/// Bookmark list, present at the storage root only
pub const BOOKMARKS_LST: &str = "bookmarks.lst";
