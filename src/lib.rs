// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]

//! # bionet-sync
//!
//! Fetches the distinct fauna species recorded in the NSW BioNet species
//! sightings OData service and materializes them locally (Parquet/CSV) or
//! into a hosted table.
//!
//! The interesting part is the middle of the pipeline: BioNet exposes
//! *sightings*, millions of rows heavily duplicated by species, and the only
//! way to get the species list is to page through them and deduplicate
//! client-side. The [`pager`] module owns that loop — continuation links,
//! offset paging, schema-adaptive `$select` negotiation, and a set of
//! termination rules that work whether or not the server can say up front
//! how many species to expect.
//!
//! ## Pipeline
//!
//! ```text
//! query ──▶ http ──▶ odata ──▶ pager ──▶ sink (table | hosted)
//!                      ▲          │
//!                  estimate ──────┘  (distinct-count target, best effort)
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// OData query construction
pub mod query;

/// HTTP client with retry and rate limiting
pub mod http;

/// OData response parsing and `$select` negotiation
pub mod odata;

/// Distinct-species count estimation
pub mod estimate;

/// The deduplicating pager
pub mod pager;

/// Output sinks (local files, hosted table)
pub mod sink;

/// Run orchestration
pub mod engine;

/// YAML run profiles
pub mod config;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

pub use engine::{SyncEngine, SyncOptions, SyncReport, SyncStats};
pub use pager::{Pager, PagerConfig, PagerOutcome};
pub use query::{FieldSet, FilterExpression};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
