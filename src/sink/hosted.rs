//! Hosted table synchronization
//!
//! Pushes a run's records into a remote hosted-table service over its REST
//! API. The flow is create-or-replace:
//!
//! 1. probe whether the table exists
//! 2. absent: upload the records as a CSV intermediate and create the table
//! 3. present: truncate (falling back to delete-all) and append in batches
//! 4. maintenance: undo service-side field-name mangling, index the
//!    identity column, annotate metadata, remove the intermediate file
//!
//! Appends are not transactional. A failure mid-append leaves the table
//! partially loaded; the next run's truncate clears it.

use crate::error::{Error, Result};
use crate::http::{HttpClient, RequestConfig};
use crate::query::IDENTITY_FIELD;
use crate::sink::table::{write_csv, DATE_COLUMN, STRING_COLUMNS};
use crate::sink::{RecordSink, SinkReport};
use crate::types::{JsonObject, JsonValue};
use async_trait::async_trait;
use serde_json::json;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Default rows per append batch
pub const DEFAULT_BATCH_SIZE: usize = 250;

/// Settings for a hosted-table destination
#[derive(Debug, Clone)]
pub struct HostedTableConfig {
    /// Base URL of the hosted-table service
    pub service_url: String,
    /// Table name at the service
    pub table_name: String,
    /// Rows per append request
    pub batch_size: usize,
    /// Run the post-sync maintenance steps
    pub maintenance: bool,
}

impl HostedTableConfig {
    /// Create a config with default batching and maintenance enabled
    pub fn new(service_url: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            service_url: service_url.into().trim_end_matches('/').to_string(),
            table_name: table_name.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            maintenance: true,
        }
    }

    /// Set the append batch size
    #[must_use]
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Enable or disable post-sync maintenance
    #[must_use]
    pub fn with_maintenance(mut self, enabled: bool) -> Self {
        self.maintenance = enabled;
        self
    }

    fn table_url(&self) -> String {
        format!("{}/tables/{}", self.service_url, self.table_name)
    }
}

/// Sink synchronizing into a hosted table
pub struct HostedTableSink<'a> {
    client: &'a HttpClient,
    config: HostedTableConfig,
}

impl<'a> HostedTableSink<'a> {
    /// Create a sink over an authenticated client
    pub fn new(client: &'a HttpClient, config: HostedTableConfig) -> Self {
        Self { client, config }
    }

    /// Probe whether the table exists at the service
    pub async fn table_exists(&self) -> Result<bool> {
        match self.client.get(&self.config.table_url()).await {
            Ok(_) => Ok(true),
            Err(Error::HttpStatus { status: 404, .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Create the table by uploading a CSV intermediate
    async fn create_from_csv(&self, records: &[JsonObject]) -> Result<PathBuf> {
        let csv_path = std::env::temp_dir().join(format!("{}-upload.csv", self.config.table_name));
        write_csv(&csv_path, records)?;
        let content = std::fs::read_to_string(&csv_path).map_err(|e| Error::Output {
            message: format!("Failed to read intermediate CSV: {e}"),
        })?;

        let body = json!({
            "name": self.config.table_name,
            "format": "csv",
            "content": content,
        });
        let url = format!("{}/tables", self.config.service_url);
        self.client
            .post_with_config(&url, RequestConfig::new().json(body))
            .await?;
        info!(
            table = %self.config.table_name,
            rows = records.len(),
            "created hosted table from CSV"
        );
        Ok(csv_path)
    }

    /// Clear the table, preferring truncate and falling back to delete-all
    async fn clear(&self) -> Result<()> {
        let truncate_url = format!("{}/truncate", self.config.table_url());
        match self
            .client
            .post_with_config(&truncate_url, RequestConfig::new())
            .await
        {
            Ok(_) => {
                debug!(table = %self.config.table_name, "truncated hosted table");
                Ok(())
            }
            Err(e) => {
                warn!(
                    table = %self.config.table_name,
                    "truncate unsupported or failed ({e}); deleting all rows instead"
                );
                let delete_url = format!("{}/records/delete", self.config.table_url());
                self.client
                    .post_with_config(
                        &delete_url,
                        RequestConfig::new().json(json!({ "where": "1=1" })),
                    )
                    .await?;
                Ok(())
            }
        }
    }

    /// Append records in bounded batches with per-batch progress logging
    async fn append(&self, records: &[JsonObject]) -> Result<usize> {
        let total_batches = records.len().div_ceil(self.config.batch_size);
        let url = format!("{}/records", self.config.table_url());
        let mut appended = 0;

        for (index, chunk) in records.chunks(self.config.batch_size).enumerate() {
            let body = json!({ "records": chunk });
            self.client
                .post_with_config(&url, RequestConfig::new().json(body))
                .await?;
            appended += chunk.len();
            info!(
                batch = index + 1,
                total_batches,
                rows = appended,
                "appended batch to hosted table"
            );
        }
        Ok(appended)
    }

    /// Rename any field the service mangled on create back to its canonical
    /// casing
    async fn rename_mangled_fields(&self) -> Result<()> {
        let descriptor = self.client.get_json(&self.config.table_url()).await?;
        let Some(fields) = descriptor.get("fields").and_then(JsonValue::as_array) else {
            debug!("table descriptor carries no field list; skipping rename pass");
            return Ok(());
        };

        let canonical: Vec<&str> = STRING_COLUMNS
            .iter()
            .copied()
            .chain(std::iter::once(DATE_COLUMN))
            .collect();

        for field in fields {
            let Some(name) = field.get("name").and_then(JsonValue::as_str) else {
                continue;
            };
            let Some(wanted) = canonical
                .iter()
                .find(|c| c.eq_ignore_ascii_case(name) && **c != name)
            else {
                continue;
            };
            let url = format!("{}/fields/{}/rename", self.config.table_url(), name);
            self.client
                .post_with_config(&url, RequestConfig::new().json(json!({ "to": wanted })))
                .await?;
            debug!(from = name, to = wanted, "renamed hosted-table field");
        }
        Ok(())
    }

    /// Create an index on the identity field
    async fn add_identity_index(&self) -> Result<()> {
        let url = format!("{}/indexes", self.config.table_url());
        self.client
            .post_with_config(
                &url,
                RequestConfig::new().json(json!({ "field": IDENTITY_FIELD })),
            )
            .await?;
        debug!(field = IDENTITY_FIELD, "indexed hosted table");
        Ok(())
    }

    /// Annotate the table with sync provenance
    async fn set_metadata(&self, rows: usize) -> Result<()> {
        let url = format!("{}/metadata", self.config.table_url());
        let body = json!({
            "description": "NSW BioNet fauna species, synchronized by bionet-sync",
            "syncedAt": chrono::Utc::now().to_rfc3339(),
            "rowCount": rows,
        });
        self.client
            .post_with_config(&url, RequestConfig::new().json(body))
            .await?;
        Ok(())
    }

    /// Run the full create-or-replace synchronization
    pub async fn sync(&self, records: &[JsonObject]) -> Result<SinkReport> {
        let exists = self.table_exists().await?;
        let mut intermediate: Option<PathBuf> = None;

        let rows_written = if exists {
            self.clear().await?;
            self.append(records).await?
        } else {
            intermediate = Some(self.create_from_csv(records).await?);
            records.len()
        };

        if self.config.maintenance {
            // maintenance failures are logged, not fatal; the data is in place
            if let Err(e) = self.rename_mangled_fields().await {
                warn!("field rename pass failed: {e}");
            }
            if let Err(e) = self.add_identity_index().await {
                warn!("index creation failed: {e}");
            }
            if let Err(e) = self.set_metadata(rows_written).await {
                warn!("metadata annotation failed: {e}");
            }
        }

        if let Some(path) = intermediate {
            if let Err(e) = std::fs::remove_file(&path) {
                warn!(path = %path.display(), "failed to remove intermediate CSV: {e}");
            }
        }

        info!(
            table = %self.config.table_name,
            rows = rows_written,
            "hosted table synchronized"
        );
        Ok(SinkReport {
            rows_written,
            destination: self.config.table_url(),
        })
    }
}

#[async_trait]
impl RecordSink for HostedTableSink<'_> {
    async fn deliver(&self, records: &[JsonObject]) -> Result<SinkReport> {
        self.sync(records).await
    }
}
