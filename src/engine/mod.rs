//! Sync engine
//!
//! Ties the pieces together for one run: build the group filter, ask the
//! estimator for a distinct-species target, drive the pager over the HTTP
//! fetcher, and hand the ordered records to a sink. The engine owns nothing
//! between runs; every run starts from scratch.

mod types;

pub use types::{LogLevel, Message, SyncReport, SyncStats};

use crate::config::DEFAULT_ENDPOINT;
use crate::error::{Error, Result};
use crate::estimate::estimate_unique_count;
use crate::http::HttpClient;
use crate::pager::{HttpPageFetcher, Pager, PagerConfig, StopReason};
use crate::query::{page_url, FieldSet, FilterExpression};
use crate::sink::RecordSink;
use crate::types::FaunaGroup;
use std::time::Instant;
use tracing::info;

/// Settings for one sync run
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// OData entity-set URL
    pub endpoint: String,
    /// Fauna group to fetch
    pub group: FaunaGroup,
    /// Fields to request
    pub fields: FieldSet,
    /// Pager settings
    pub pager: PagerConfig,
    /// Ask the server for a distinct-species count before paging
    pub estimate: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            group: FaunaGroup::default(),
            fields: FieldSet::default(),
            pager: PagerConfig::default(),
            estimate: true,
        }
    }
}

/// Orchestrates fetch, dedup, and delivery for a run
pub struct SyncEngine {
    client: HttpClient,
    options: SyncOptions,
}

impl SyncEngine {
    /// Create an engine over a client
    pub fn new(client: HttpClient, options: SyncOptions) -> Self {
        Self { client, options }
    }

    /// The run settings
    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// The underlying HTTP client, shared with sinks that talk to services
    pub fn client(&self) -> &HttpClient {
        &self.client
    }

    /// Probe endpoint reachability by requesting a single record
    pub async fn check(&self) -> Result<()> {
        let filter = FilterExpression::for_group(self.options.group);
        let url = page_url(&self.options.endpoint, &self.options.fields, &filter, 1, 0);
        let response = self.client.get(&url).await?;
        let body = response
            .text()
            .await
            .map_err(|e| Error::decode(format!("Failed to read probe body: {e}")))?;
        crate::odata::ODataPage::parse(&body)?;
        info!(endpoint = %self.options.endpoint, "endpoint reachable");
        Ok(())
    }

    /// Ask the server how many distinct species match the configured group.
    ///
    /// `None` means the deployment does not support the aggregation.
    pub async fn estimate(&self) -> Option<u64> {
        let filter = FilterExpression::for_group(self.options.group);
        estimate_unique_count(&self.client, &self.options.endpoint, &filter).await
    }

    /// Fetch, deduplicate, and deliver to the sink.
    ///
    /// A failed run still reports the counts gathered before the failure and
    /// still delivers the partial records. An empty result is "no records
    /// matched", not an error.
    pub async fn run(&self, sink: &dyn RecordSink) -> SyncReport {
        let started = Instant::now();
        let mut stats = SyncStats::new();
        let mut messages = Vec::new();

        let filter = FilterExpression::for_group(self.options.group);

        let target = if self.options.estimate {
            let target = estimate_unique_count(&self.client, &self.options.endpoint, &filter).await;
            match target {
                Some(count) => {
                    messages.push(Message::info(format!("{count} distinct species expected")));
                }
                None => messages.push(Message::warn(
                    "distinct-species count unavailable; using the stall heuristic",
                )),
            }
            target
        } else {
            None
        };

        let fetcher = HttpPageFetcher::new(&self.client, &self.options.endpoint, filter);
        let pager = Pager::new(self.options.pager.clone(), self.options.fields.clone())
            .with_target(target);
        let outcome = pager.run(&fetcher).await;

        stats.raw_rows = outcome.raw_rows;
        stats.unique_records = outcome.unique;
        stats.pages_fetched = outcome.pages;

        match outcome.stop {
            StopReason::Aborted => {
                stats.add_error();
                if let Some(ref e) = outcome.error {
                    messages.push(Message::error(format!(
                        "run aborted after {} unique records: {e}",
                        outcome.unique
                    )));
                }
            }
            StopReason::Stalled => messages.push(Message::warn(format!(
                "stopped after {} pages without new species; the count may be low",
                self.options.pager.stall_threshold
            ))),
            _ => {}
        }
        if outcome.records.is_empty() && outcome.error.is_none() {
            messages.push(Message::info("no records matched the filter"));
        }
        let mut failure: Option<Error> = outcome.error;

        // partial results are still worth persisting
        match sink.deliver(&outcome.records).await {
            Ok(report) => {
                stats.rows_written = report.rows_written;
                messages.push(Message::info(format!(
                    "{} rows written to {}",
                    report.rows_written, report.destination
                )));
            }
            Err(e) => {
                stats.add_error();
                messages.push(Message::error(format!("sink delivery failed: {e}")));
                if failure.is_none() {
                    failure = Some(e);
                }
            }
        }

        stats.set_duration(started.elapsed().as_millis() as u64);
        messages.push(Message::Stats(stats.clone()));
        SyncReport {
            stats,
            messages,
            error: failure,
        }
    }
}
