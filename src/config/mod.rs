//! Configuration
//!
//! Layered configuration: built-in defaults, an optional TOML file, then the
//! `NOTESTORE__*` environment overlay. Deserialized into `NotestoreConfig`.

pub mod facade;
pub mod merge;
pub mod sources;

pub use facade::ConfigLoader;

use crate::confirm::OverwritePolicy;
use crate::logging::LoggingConfig;
use crate::store::StorageKind;
use serde::{Deserialize, Serialize};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotestoreConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub storage: StorageSettings,
}

/// Storage behaviour
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Storage format (only `multifile`)
    #[serde(default)]
    pub kind: StorageKind,

    /// What to do when a save target already exists: ask, always, never
    #[serde(default)]
    pub overwrite: OverwritePolicy,
}
