//! CLI commands and argument parsing

use crate::sink::OutputFormat;
use crate::types::FaunaGroup;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// NSW BioNet fauna species sync
#[derive(Parser, Debug)]
#[command(name = "bionet-sync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run profile (YAML)
    #[arg(short, long, global = true)]
    pub profile: Option<PathBuf>,

    /// BioNet username, for licensed access
    #[arg(short, long, global = true)]
    pub username: Option<String>,

    /// BioNet password
    #[arg(long, global = true)]
    pub password: Option<String>,

    /// OData entity-set URL
    #[arg(short, long, global = true)]
    pub endpoint: Option<String>,

    /// Fauna group to fetch
    #[arg(short, long, global = true)]
    pub group: Option<FaunaGroup>,

    /// Records per page
    #[arg(long, global = true)]
    pub page_size: Option<u32>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Test that the endpoint is reachable
    Check,

    /// Ask the server for the distinct-species count
    Estimate,

    /// Fetch species to a local Parquet or CSV file
    Fetch {
        /// Output path (falls back to the profile's `output`)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format, when the extension is not enough
        #[arg(short, long)]
        format: Option<OutputFormat>,

        /// Cap on unique records collected
        #[arg(long)]
        max_records: Option<usize>,

        /// Skip the distinct-species count query
        #[arg(long)]
        no_estimate: bool,
    },

    /// Synchronize species into a hosted table
    Sync {
        /// Base URL of the hosted-table service
        #[arg(long)]
        service_url: Option<String>,

        /// Table name at the service
        #[arg(long)]
        table: Option<String>,

        /// Rows per append request
        #[arg(long)]
        batch_size: Option<usize>,

        /// Skip the post-sync maintenance steps
        #[arg(long)]
        no_maintenance: bool,

        /// Cap on unique records collected
        #[arg(long)]
        max_records: Option<usize>,

        /// Skip the distinct-species count query
        #[arg(long)]
        no_estimate: bool,
    },
}
