//! Environment overlay for notestore settings.
//!
//! Keys map onto `NotestoreConfig` sections with `__` between levels:
//!
//! - `NOTESTORE__STORAGE__KIND=multifile` sets `storage.kind`
//! - `NOTESTORE__STORAGE__OVERWRITE=always` sets `storage.overwrite`
//! - `NOTESTORE__LOGGING__LEVEL=debug` sets `logging.level`
//!
//! The single-underscore `NOTESTORE_LOG*` variables belong to the logger and
//! are not read here.

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::Environment;
use std::collections::HashMap;

const PREFIX: &str = "NOTESTORE";
const SEPARATOR: &str = "__";

/// Add the process environment overlay to builder.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Ok(builder.add_source(overlay(None)))
}

/// Overlay reading `vars` instead of the process environment when given
fn overlay(vars: Option<HashMap<String, String>>) -> Environment {
    Environment::with_prefix(PREFIX)
        .prefix_separator(SEPARATOR)
        .separator(SEPARATOR)
        .try_parsing(true)
        .source(vars)
}
