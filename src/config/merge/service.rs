//! MergeService: orchestrates sources and deserializes to NotestoreConfig.

use crate::config::sources::{environment, file};
use crate::config::NotestoreConfig;
use config::{Config, ConfigError};
use std::path::Path;

/// Merge service for config composition.
pub struct MergeService;

impl MergeService {
    /// Defaults overlaid by the environment.
    pub fn load() -> Result<NotestoreConfig, ConfigError> {
        let builder = environment::add_to_builder(Config::builder())?;
        builder.build()?.try_deserialize()
    }

    /// Load config from a specific file with environment overlay.
    /// Precedence: file (lowest) -> environment (highest).
    pub fn load_from_file(path: &Path) -> Result<NotestoreConfig, ConfigError> {
        let builder = file::add_to_builder(Config::builder(), path)?;
        let builder = environment::add_to_builder(builder)?;
        builder.build()?.try_deserialize()
    }
}
