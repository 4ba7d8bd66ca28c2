//! Error types for the storage engine and its CLI surface.

use crate::types::NodeId;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading or writing a storage directory.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to remove directory {}: {source}", path.display())]
    RemoveDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Directory {} still exists after removal", .0.display())]
    RemovalIncomplete(PathBuf),

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("XML error in {}: {message}", path.display())]
    Xml { path: PathBuf, message: String },

    #[error("Malformed storage at {}: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },

    #[error("Invalid node id: {0}")]
    InvalidNodeId(String),

    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Storage session already bound to {}", .0.display())]
    AlreadyBound(PathBuf),

    #[error("Storage session is not bound to a directory")]
    NotBound,
}

impl StorageError {
    pub(crate) fn xml(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        StorageError::Xml {
            path: path.into(),
            message: err.to_string(),
        }
    }

    pub(crate) fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        StorageError::Malformed {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Errors surfaced by the command layer.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Output error: {0}")]
    OutputError(#[from] serde_json::Error),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
