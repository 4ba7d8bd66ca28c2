//! Notestore: directory-per-node storage for hierarchical notebooks
//!
//! A notebook is a tree of nodes, each with properties and rich text. The
//! multi-file format stores every node in its own directory, nested the way
//! the nodes are, so edits touch only the files of the nodes that changed.

pub mod config;
pub mod confirm;
pub mod error;
pub mod logging;
pub mod store;
pub mod sync;
pub mod tooling;
pub mod tree;
pub mod types;

pub use confirm::{OverwriteConfirm, OverwritePolicy};
pub use error::{ApiError, StorageError};
pub use store::{open_backend, MultiFileStorage, PersistOutcome, PersistReport, StorageBackend};
pub use sync::{ExportMode, NodeSyncState, OffsetRange, PendingSyncSet};
pub use tree::{NodeContent, NodeProperties, NodeTree, TreeQuery};
pub use types::NodeId;
