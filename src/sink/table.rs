//! Local table output
//!
//! Materializes species records into a fixed-schema Arrow batch and writes it
//! as Parquet or CSV. The schema is fixed rather than inferred: downstream
//! consumers rely on stable column names and types, and negotiated-away fields
//! simply come out as nulls.

use crate::error::{Error, Result};
use crate::sink::{RecordSink, SinkReport};
use crate::types::{JsonObject, JsonValue};
use arrow::array::{ArrayRef, StringArray, TimestampMillisecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Text columns of the output table, in column order
pub const STRING_COLUMNS: &[&str] = &[
    "ScientificName",
    "CommonName",
    "Class",
    "BCActStatus",
    "EPBCActStatus",
];

/// The date column
pub const DATE_COLUMN: &str = "SightingDate";

/// The fixed output schema: five nullable text columns and a millisecond
/// timestamp for the sighting date
pub fn species_schema() -> Schema {
    let mut fields: Vec<Field> = STRING_COLUMNS
        .iter()
        .map(|name| Field::new(*name, DataType::Utf8, true))
        .collect();
    fields.push(Field::new(
        DATE_COLUMN,
        DataType::Timestamp(TimeUnit::Millisecond, None),
        true,
    ));
    Schema::new(fields)
}

/// Parse an ISO 8601 timestamp to epoch milliseconds.
///
/// BioNet dates arrive with or without a timezone suffix, and occasionally as
/// a bare date. A naive timestamp is taken as UTC. Anything unparseable maps
/// to null rather than failing the whole batch.
pub fn parse_sighting_date(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.and_utc().timestamp_millis());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis());
    }
    None
}

/// Convert records to a RecordBatch under the fixed schema.
///
/// Missing fields become nulls; non-string values in text columns are
/// stringified rather than dropped.
pub fn records_to_batch(records: &[JsonObject]) -> Result<RecordBatch> {
    let schema = Arc::new(species_schema());

    let mut columns: Vec<ArrayRef> = Vec::with_capacity(STRING_COLUMNS.len() + 1);
    for name in STRING_COLUMNS {
        let array: StringArray = records
            .iter()
            .map(|record| match record.get(*name) {
                None | Some(JsonValue::Null) => None,
                Some(JsonValue::String(s)) => Some(s.clone()),
                Some(other) => Some(other.to_string()),
            })
            .collect();
        columns.push(Arc::new(array));
    }

    let dates: TimestampMillisecondArray = records
        .iter()
        .map(|record| {
            record
                .get(DATE_COLUMN)
                .and_then(JsonValue::as_str)
                .and_then(parse_sighting_date)
        })
        .collect();
    columns.push(Arc::new(dates));

    RecordBatch::try_new(schema, columns).map_err(|e| Error::Output {
        message: format!("Failed to build record batch: {e}"),
    })
}

/// Configuration for the Parquet writer
#[derive(Debug, Clone)]
pub struct ParquetWriterConfig {
    compression: Compression,
    row_group_size: usize,
}

impl Default for ParquetWriterConfig {
    fn default() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: 1024 * 1024,
        }
    }
}

impl ParquetWriterConfig {
    /// Create a config with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the compression algorithm
    #[must_use]
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Set the row group size
    #[must_use]
    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size;
        self
    }

    fn build_properties(&self) -> WriterProperties {
        WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build()
    }
}

/// Parquet file writer over the fixed species schema
pub struct ParquetWriter {
    writer: ArrowWriter<File>,
    rows_written: usize,
}

impl ParquetWriter {
    /// Create a writer targeting `path`
    pub fn new(path: impl AsRef<Path>, config: &ParquetWriterConfig) -> Result<Self> {
        let file = File::create(path.as_ref()).map_err(|e| Error::Output {
            message: format!("Failed to create {}: {e}", path.as_ref().display()),
        })?;
        let writer = ArrowWriter::try_new(
            file,
            Arc::new(species_schema()),
            Some(config.build_properties()),
        )
        .map_err(|e| Error::Output {
            message: format!("Failed to open Parquet writer: {e}"),
        })?;
        Ok(Self {
            writer,
            rows_written: 0,
        })
    }

    /// Write a batch
    pub fn write(&mut self, batch: &RecordBatch) -> Result<()> {
        self.writer.write(batch).map_err(|e| Error::Output {
            message: format!("Failed to write batch: {e}"),
        })?;
        self.rows_written += batch.num_rows();
        Ok(())
    }

    /// Close the writer, finalizing the file. Returns total rows written.
    pub fn close(self) -> Result<usize> {
        let rows = self.rows_written;
        self.writer.close().map_err(|e| Error::Output {
            message: format!("Failed to close Parquet writer: {e}"),
        })?;
        Ok(rows)
    }
}

/// Write records to a Parquet file, returning the row count
pub fn write_parquet(path: impl AsRef<Path>, records: &[JsonObject]) -> Result<usize> {
    let batch = records_to_batch(records)?;
    let mut writer = ParquetWriter::new(&path, &ParquetWriterConfig::default())?;
    writer.write(&batch)?;
    let rows = writer.close()?;
    info!(rows, path = %path.as_ref().display(), "wrote Parquet file");
    Ok(rows)
}

/// Write records to a CSV file with a header row, returning the row count.
///
/// Also used as the intermediate transferable format when creating a hosted
/// table from scratch.
pub fn write_csv(path: impl AsRef<Path>, records: &[JsonObject]) -> Result<usize> {
    let batch = records_to_batch(records)?;
    let file = File::create(path.as_ref()).map_err(|e| Error::Output {
        message: format!("Failed to create {}: {e}", path.as_ref().display()),
    })?;
    let mut writer = arrow::csv::WriterBuilder::new()
        .with_header(true)
        .build(file);
    writer.write(&batch).map_err(|e| Error::Output {
        message: format!("Failed to write CSV: {e}"),
    })?;
    info!(rows = batch.num_rows(), path = %path.as_ref().display(), "wrote CSV file");
    Ok(batch.num_rows())
}

/// Local output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Apache Parquet
    Parquet,
    /// Comma-separated values with a header row
    Csv,
}

impl OutputFormat {
    /// Infer the format from a file extension; unknown extensions default
    /// to Parquet
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Self::Csv,
            _ => Self::Parquet,
        }
    }
}

/// Sink writing to a local file
#[derive(Debug, Clone)]
pub struct TableSink {
    path: PathBuf,
    format: OutputFormat,
}

impl TableSink {
    /// Create a sink for `path`, inferring the format from its extension
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let format = OutputFormat::from_path(&path);
        Self { path, format }
    }

    /// Override the inferred format
    #[must_use]
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }
}

#[async_trait]
impl RecordSink for TableSink {
    async fn deliver(&self, records: &[JsonObject]) -> Result<SinkReport> {
        let rows_written = match self.format {
            OutputFormat::Parquet => write_parquet(&self.path, records)?,
            OutputFormat::Csv => write_csv(&self.path, records)?,
        };
        Ok(SinkReport {
            rows_written,
            destination: self.path.display().to_string(),
        })
    }
}
