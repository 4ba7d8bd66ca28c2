//! ConfigLoader facade delegating to merge service.

use super::merge::service::MergeService;
use super::NotestoreConfig;
use config::ConfigError;
use std::path::Path;

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from an optional file plus the environment.
    pub fn load(config_file: Option<&Path>) -> Result<NotestoreConfig, ConfigError> {
        match config_file {
            Some(path) => MergeService::load_from_file(path),
            None => MergeService::load(),
        }
    }

    /// Create default configuration.
    pub fn default() -> NotestoreConfig {
        NotestoreConfig::default()
    }
}
