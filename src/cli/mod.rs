//! CLI module
//!
//! Command-line surface for the sync tool.
//!
//! # Commands
//!
//! - `check` - Test that the endpoint is reachable
//! - `estimate` - Ask the server for the distinct-species count
//! - `fetch` - Fetch species to a local Parquet or CSV file
//! - `sync` - Synchronize species into a hosted table

mod commands;
mod runner;

pub use commands::{Cli, Commands};
pub use runner::Runner;
