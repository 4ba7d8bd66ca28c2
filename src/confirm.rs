//! Overwrite confirmation capability
//!
//! The storage engine asks before wiping an existing directory on a fresh
//! save or export. Hosts inject the decision; the CLI prompts on the terminal.

use serde::{Deserialize, Serialize};

/// Yes/no decision on overwriting an existing storage directory
pub trait OverwriteConfirm {
    fn confirm_overwrite(&self, message: &str) -> bool;
}

impl<F> OverwriteConfirm for F
where
    F: Fn(&str) -> bool,
{
    fn confirm_overwrite(&self, message: &str) -> bool {
        self(message)
    }
}

/// Accepts every overwrite
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysOverwrite;

impl OverwriteConfirm for AlwaysOverwrite {
    fn confirm_overwrite(&self, _message: &str) -> bool {
        true
    }
}

/// Declines every overwrite
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverOverwrite;

impl OverwriteConfirm for NeverOverwrite {
    fn confirm_overwrite(&self, _message: &str) -> bool {
        false
    }
}

/// Interactive terminal prompt
#[derive(Debug, Default, Clone, Copy)]
pub struct PromptOverwrite;

impl OverwriteConfirm for PromptOverwrite {
    fn confirm_overwrite(&self, message: &str) -> bool {
        match dialoguer::Confirm::new()
            .with_prompt(message)
            .default(false)
            .interact()
        {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!("Failed to get user input, declining overwrite: {}", e);
                false
            }
        }
    }
}

/// Configured overwrite behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverwritePolicy {
    #[default]
    Ask,
    Always,
    Never,
}

impl OverwritePolicy {
    pub fn confirmer(self) -> Box<dyn OverwriteConfirm> {
        match self {
            OverwritePolicy::Ask => Box::new(PromptOverwrite),
            OverwritePolicy::Always => Box::new(AlwaysOverwrite),
            OverwritePolicy::Never => Box::new(NeverOverwrite),
        }
    }
}
