//! Tooling & Integration Layer
//!
//! The `notestore` command line: argument parsing, command execution, and
//! terminal formatting.

pub mod cli;
pub mod format;

pub use cli::{Cli, CliContext, Commands};
