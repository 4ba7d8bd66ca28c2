//! Integration tests for multi-file notebook storage

mod cli_commands;
mod export_modes;
mod overwrite_gate;
mod removal;
mod round_trip;
mod support;
