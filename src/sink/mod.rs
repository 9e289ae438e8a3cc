//! Sink adapters
//!
//! Two destinations for the ordered record sequence the pager produces:
//! - [`table`]: local tabular files (Parquet or CSV) with a fixed Arrow schema
//! - [`hosted`]: a remote hosted-table service, synchronized over HTTP
//!
//! Sinks are boundary code. They take the ordered records and persist them;
//! nothing here feeds back into fetching or deduplication.

pub mod hosted;
pub mod table;

pub use hosted::{HostedTableConfig, HostedTableSink};
pub use table::{
    records_to_batch, species_schema, write_csv, write_parquet, OutputFormat, ParquetWriter,
    ParquetWriterConfig, TableSink,
};

use crate::error::Result;
use crate::types::JsonObject;
use async_trait::async_trait;

/// What a sink reports after persisting a run's records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkReport {
    /// Rows persisted at the destination
    pub rows_written: usize,
    /// Human-readable destination (file path or table URL)
    pub destination: String,
}

/// Destination for an ordered record sequence
#[async_trait]
pub trait RecordSink {
    /// Persist the records, returning what was written where
    async fn deliver(&self, records: &[JsonObject]) -> Result<SinkReport>;
}

#[cfg(test)]
mod tests;
