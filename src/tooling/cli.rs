//! CLI Tooling
//!
//! Command-line surface over the storage engine: build a notebook from a plain
//! directory, list it, export parts of it, and make small edits that go
//! through an incremental sync.

use crate::config::{ConfigLoader, NotestoreConfig};
use crate::confirm::{AlwaysOverwrite, OverwriteConfirm};
use crate::error::ApiError;
use crate::logging::LoggingConfig;
use crate::store::{open_backend, StorageBackend};
use crate::sync::{ExportMode, NodeSyncState, OffsetRange, PendingSyncSet};
use crate::tooling::format::{format_outcome, format_tree_json, format_tree_text};
use crate::tree::{NodeContent, NodeProperties, NodeTree, TreeQuery};
use crate::types::NodeId;
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Syntax recorded for nodes made from plain files
pub const PLAIN_TEXT_SYNTAX: &str = "plain-text";

/// Notestore CLI - directory-per-node notebook storage
#[derive(Parser)]
#[command(name = "notestore")]
#[command(about = "Store hierarchical notebooks as one directory per node")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Overwrite existing target directories without asking
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr, both)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// Apply the log flags on top of the configured logging section
    pub fn logging_config(&self, base: &LoggingConfig) -> LoggingConfig {
        let mut config = base.clone();
        if let Some(level) = &self.log_level {
            config.level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.format = format.clone();
        }
        if let Some(output) = &self.log_output {
            config.output = output.clone();
        }
        if self.log_file.is_some() {
            config.file = self.log_file.clone();
        }
        config
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build a notebook from a plain directory (one node per file or folder)
    FromDir {
        /// Directory to read
        source: PathBuf,
        /// Storage directory to create
        target: PathBuf,
    },
    /// List the nodes of a stored notebook
    Tree {
        /// Storage directory
        storage: PathBuf,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Export a notebook, a subtree, a node, or a text selection
    Export {
        /// Storage directory to read
        storage: PathBuf,
        /// Directory to write the export into
        target: PathBuf,
        /// Export only this node (with its subnodes unless --only-node)
        #[arg(long)]
        node: Option<NodeId>,
        /// Leave out the subnodes of --node
        #[arg(long)]
        only_node: bool,
        /// Character range of the node text to export (END of -1 means to the end)
        #[arg(long, num_args = 2, value_names = ["START", "END"], allow_negative_numbers = true)]
        range: Option<Vec<i64>>,
    },
    /// Rename a node in place
    Rename {
        storage: PathBuf,
        id: NodeId,
        name: String,
    },
    /// Add or remove a bookmark
    Bookmark {
        storage: PathBuf,
        id: NodeId,
        /// Remove instead of add
        #[arg(long)]
        remove: bool,
    },
    /// Delete a node and its subnodes
    Delete {
        storage: PathBuf,
        id: NodeId,
    },
}

/// CLI context holding the loaded configuration
pub struct CliContext {
    config: NotestoreConfig,
    assume_yes: bool,
}

impl CliContext {
    /// Create a new CLI context
    pub fn new(config_path: Option<PathBuf>, assume_yes: bool) -> Result<Self, ApiError> {
        let config = ConfigLoader::load(config_path.as_deref())?;
        Ok(Self { config, assume_yes })
    }

    /// Context over an already loaded configuration
    pub fn with_config(config: NotestoreConfig, assume_yes: bool) -> Self {
        Self { config, assume_yes }
    }

    pub fn config(&self) -> &NotestoreConfig {
        &self.config
    }

    fn backend(&self) -> Box<dyn StorageBackend> {
        let confirm: Box<dyn OverwriteConfirm> = if self.assume_yes {
            Box::new(AlwaysOverwrite)
        } else {
            self.config.storage.overwrite.confirmer()
        };
        open_backend(self.config.storage.kind, confirm)
    }

    /// Execute a CLI command
    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::FromDir { source, target } => self.handle_from_dir(source, target),
            Commands::Tree { storage, format } => self.handle_tree(storage, format),
            Commands::Export {
                storage,
                target,
                node,
                only_node,
                range,
            } => self.handle_export(storage, target, *node, *only_node, range.as_deref()),
            Commands::Rename { storage, id, name } => self.handle_rename(storage, *id, name),
            Commands::Bookmark {
                storage,
                id,
                remove,
            } => self.handle_bookmark(storage, *id, *remove),
            Commands::Delete { storage, id } => self.handle_delete(storage, *id),
        }
    }

    fn handle_from_dir(&self, source: &Path, target: &Path) -> Result<String, ApiError> {
        let tree = tree_from_directory(source)?;
        let mut backend = self.backend();
        let outcome = backend.persist(
            target,
            &tree,
            &PendingSyncSet::new(),
            ExportMode::None,
            OffsetRange::FULL,
        )?;
        Ok(format_outcome(&outcome))
    }

    fn handle_tree(&self, storage: &Path, format: &str) -> Result<String, ApiError> {
        let tree = self.backend().populate(storage)?;
        match format {
            "json" => format_tree_json(&tree),
            "text" => Ok(format_tree_text(&tree)),
            other => Err(ApiError::InvalidArgument(format!(
                "Unknown format '{}' (expected text or json)",
                other
            ))),
        }
    }

    fn handle_export(
        &self,
        storage: &Path,
        target: &Path,
        node: Option<NodeId>,
        only_node: bool,
        range: Option<&[i64]>,
    ) -> Result<String, ApiError> {
        let range = match range {
            Some([start, end]) => Some(OffsetRange::from_raw(*start, *end)),
            Some(_) => {
                return Err(ApiError::InvalidArgument(
                    "--range takes START and END".to_string(),
                ))
            }
            None => None,
        };
        let mode = match (node, only_node, range) {
            (None, false, None) => ExportMode::AllTree,
            (None, _, _) => {
                return Err(ApiError::InvalidArgument(
                    "--only-node and --range need --node".to_string(),
                ))
            }
            (Some(id), _, Some(_)) => ExportMode::SelectedText(id),
            (Some(id), true, None) => ExportMode::CurrentNode(id),
            (Some(id), false, None) => ExportMode::NodeAndSubnodes(id),
        };

        let mut backend = self.backend();
        let tree = backend.populate(storage)?;
        if let Some(id) = mode.scoped_node() {
            if !tree.contains(id) {
                return Err(ApiError::NodeNotFound(id));
            }
        }
        let outcome = backend.persist(
            target,
            &tree,
            &PendingSyncSet::new(),
            mode,
            range.unwrap_or_default(),
        )?;
        Ok(format_outcome(&outcome))
    }

    fn handle_rename(&self, storage: &Path, id: NodeId, name: &str) -> Result<String, ApiError> {
        self.edit(storage, |tree, pending| {
            let node = tree.get_mut(id).ok_or(ApiError::NodeNotFound(id))?;
            node.properties.name = name.to_string();
            node.properties.ts_lastsave = chrono::Utc::now().timestamp();
            pending.mark_write(id, NodeSyncState::properties());
            Ok(())
        })
    }

    fn handle_bookmark(&self, storage: &Path, id: NodeId, remove: bool) -> Result<String, ApiError> {
        self.edit(storage, |tree, pending| {
            if !tree.contains(id) {
                return Err(ApiError::NodeNotFound(id));
            }
            let changed = if remove {
                tree.remove_bookmark(id)
            } else {
                tree.add_bookmark(id)
            };
            if changed {
                pending.mark_bookmarks_changed();
            } else {
                info!(node_id = id, "Bookmarks unchanged");
            }
            Ok(())
        })
    }

    fn handle_delete(&self, storage: &Path, id: NodeId) -> Result<String, ApiError> {
        self.edit(storage, |tree, pending| {
            let bookmarks_before = tree.bookmarks().len();
            tree.remove_subtree(id).map_err(|_| ApiError::NodeNotFound(id))?;
            pending.mark_remove(id);
            if tree.bookmarks().len() != bookmarks_before {
                pending.mark_bookmarks_changed();
            }
            Ok(())
        })
    }

    /// Populate, apply `change`, then sync the pending set back in place
    fn edit<F>(&self, storage: &Path, change: F) -> Result<String, ApiError>
    where
        F: FnOnce(&mut NodeTree, &mut PendingSyncSet) -> Result<(), ApiError>,
    {
        let mut backend = self.backend();
        let mut tree = backend.populate(storage)?;
        let mut pending = PendingSyncSet::new();
        change(&mut tree, &mut pending)?;
        if pending.is_empty() {
            return Ok("Nothing to do.".to_string());
        }
        let outcome = backend.persist(
            storage,
            &tree,
            &pending,
            ExportMode::None,
            OffsetRange::FULL,
        )?;
        Ok(format_outcome(&outcome))
    }
}

/// Build a tree mirroring a directory: folders become nodes, files become
/// nodes holding their text. Entries are taken in file name order.
pub fn tree_from_directory(source: &Path) -> Result<NodeTree, ApiError> {
    if !source.is_dir() {
        return Err(ApiError::InvalidArgument(format!(
            "{} is not a directory",
            source.display()
        )));
    }
    let now = chrono::Utc::now().timestamp();
    let mut tree = NodeTree::new();
    let mut ids: HashMap<PathBuf, NodeId> = HashMap::new();

    for entry in walkdir::WalkDir::new(source)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
    {
        let entry = entry.map_err(|e| {
            ApiError::InvalidArgument(format!("Failed to read {}: {}", source.display(), e))
        })?;
        let parent = entry
            .path()
            .parent()
            .and_then(|parent| ids.get(parent).copied());
        let name = entry.file_name().to_string_lossy().into_owned();

        let (properties, content) = if entry.file_type().is_dir() {
            (NodeProperties::new(name), NodeContent::default())
        } else if entry.file_type().is_file() {
            let bytes = std::fs::read(entry.path())
                .map_err(|e| ApiError::StorageError(crate::error::StorageError::IoError(e)))?;
            let text = match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(_) => {
                    warn!(path = %entry.path().display(), "Not UTF-8 text, stored empty");
                    String::new()
                }
            };
            (
                NodeProperties::new(name).with_syntax(PLAIN_TEXT_SYNTAX),
                NodeContent::from_text(text),
            )
        } else {
            continue;
        };

        let mut properties = properties;
        properties.ts_creation = now;
        properties.ts_lastsave = now;
        let id = tree.insert(parent, properties, content)?;
        ids.insert(entry.path().to_path_buf(), id);
    }
    info!(source = %source.display(), nodes = tree.len(), "Directory read");
    Ok(tree)
}
