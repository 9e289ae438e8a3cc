//! Deduplicating pager
//!
//! The core of the crate: walks the OData entity set page by page,
//! accumulating unique species records, negotiating rejected `$select`
//! fields away mid-run, and deciding when enough has been collected.
//!
//! # State machine
//!
//! ```text
//! FETCHING_PAGE ──negotiable 400──▶ FETCHING_PAGE (field removed, same offset)
//!       │
//!       ▼
//!    MERGING ──▶ DECIDING ──▶ FETCHING_PAGE | DONE | ABORTED
//! ```
//!
//! The decide step is a pure function over explicit inputs (see
//! [`types::decide`]); the loop here only shuttles pages into it. Fatal errors
//! abort the run but the outcome still carries everything accumulated so far.

mod types;

pub use types::{
    decide, Decision, PageAssessment, PageRequest, PagerConfig, PagerOutcome, StopReason,
    UniqueAccumulator,
};

use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::odata::{extract_missing_field, ODataPage};
use crate::query::{page_url, FieldSet, FilterExpression, IDENTITY_FIELD};
use crate::types::JsonValue;
use async_trait::async_trait;
use tracing::{debug, info, warn};

/// Source of pages; the HTTP implementation is swapped for canned sequences in tests
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch one page as described by `request`, selecting `fields`
    async fn fetch(&self, request: &PageRequest, fields: &FieldSet) -> Result<ODataPage>;
}

/// Fetches pages from an OData endpoint over HTTP
pub struct HttpPageFetcher<'a> {
    client: &'a HttpClient,
    endpoint: String,
    filter: FilterExpression,
}

impl<'a> HttpPageFetcher<'a> {
    /// Create a fetcher for an endpoint and filter
    pub fn new(client: &'a HttpClient, endpoint: impl Into<String>, filter: FilterExpression) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            filter,
        }
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher<'_> {
    async fn fetch(&self, request: &PageRequest, fields: &FieldSet) -> Result<ODataPage> {
        let url = match request {
            // continuation links encode their own filter/select/paging state
            PageRequest::NextLink(url) => url.clone(),
            PageRequest::Offset { skip, top } => {
                page_url(&self.endpoint, fields, &self.filter, *top, *skip)
            }
        };
        let response = self.client.get(&url).await?;
        let body = response
            .text()
            .await
            .map_err(|e| Error::decode(format!("Failed to read page body: {e}")))?;
        ODataPage::parse(&body)
    }
}

/// Drives page fetching, merging, and the stop decision for one run
pub struct Pager {
    config: PagerConfig,
    fields: FieldSet,
    target: Option<u64>,
}

impl Pager {
    /// Create a pager over a field set
    pub fn new(config: PagerConfig, fields: FieldSet) -> Self {
        Self {
            config,
            fields,
            target: None,
        }
    }

    /// Set the known distinct-identity target, when the estimator produced one
    #[must_use]
    pub fn with_target(mut self, target: Option<u64>) -> Self {
        self.target = target;
        self
    }

    /// The field set as negotiated so far
    pub fn fields(&self) -> &FieldSet {
        &self.fields
    }

    /// Run to completion against a page source.
    ///
    /// Never panics and never loses progress: fatal errors produce an outcome
    /// with `stop == Aborted` and the error attached alongside every unique
    /// record gathered before the failure.
    pub async fn run(mut self, fetcher: &dyn PageFetcher) -> PagerOutcome {
        let mut accumulator = UniqueAccumulator::new();
        let mut raw_rows: u64 = 0;
        let mut pages: u64 = 0;
        let mut stalled_pages: u32 = 0;
        let mut request = PageRequest::first(self.config.page_size);

        loop {
            if pages >= self.config.max_pages {
                warn!(pages, "page ceiling reached; aborting with partial results");
                return Self::aborted(
                    accumulator,
                    raw_rows,
                    pages,
                    Error::IterationLimitExceeded { pages },
                );
            }

            // FETCHING_PAGE: negotiable 400s shrink the field set and retry the
            // same request without advancing; bounded by the field count.
            let page = loop {
                match fetcher.fetch(&request, &self.fields).await {
                    Ok(page) => break page,
                    Err(Error::HttpStatus { status: 400, body }) => {
                        match extract_missing_field(&body) {
                            Some(field) if self.fields.contains(&field) => {
                                self.fields.remove(&field);
                                warn!(
                                    field = %field,
                                    remaining = self.fields.len(),
                                    "server rejected $select field; retrying without it"
                                );
                                if self.fields.is_empty() {
                                    return Self::aborted(
                                        accumulator,
                                        raw_rows,
                                        pages,
                                        Error::EmptyFieldSet,
                                    );
                                }
                            }
                            _ => {
                                // no field to remove: cannot make progress
                                return Self::aborted(
                                    accumulator,
                                    raw_rows,
                                    pages,
                                    Error::schema_mismatch(body),
                                );
                            }
                        }
                    }
                    Err(e) => {
                        return Self::aborted(accumulator, raw_rows, pages, e);
                    }
                }
            };

            pages += 1;
            let requested = match &request {
                PageRequest::Offset { top, .. } => *top,
                PageRequest::NextLink(_) => self.config.page_size,
            };

            // MERGING: every row counts as raw; unseen identities insert.
            // Rows with a missing or blank identity cannot be deduplicated
            // and are skipped.
            let mut new_this_page = 0usize;
            let records_on_page = page.len();
            for record in page.records {
                raw_rows += 1;
                let identity = record
                    .get(IDENTITY_FIELD)
                    .and_then(JsonValue::as_str)
                    .unwrap_or("")
                    .to_string();
                if identity.trim().is_empty() {
                    continue;
                }
                if let Some(cap) = self.config.max_records {
                    if accumulator.len() >= cap {
                        continue;
                    }
                }
                if accumulator.insert(&identity, record) {
                    new_this_page += 1;
                }
            }
            stalled_pages = if new_this_page == 0 {
                stalled_pages + 1
            } else {
                0
            };

            debug!(
                page = pages,
                rows = records_on_page,
                new = new_this_page,
                unique = accumulator.len(),
                "merged page"
            );

            // DECIDING
            let assessment = PageAssessment {
                records_on_page,
                requested,
                next_link: page.next_link,
                next_offset: raw_rows,
                unique: accumulator.len(),
                target: self.target,
                stalled_pages,
            };

            match decide(&self.config, &assessment) {
                Decision::Fetch(next) => request = next,
                Decision::Done(reason) => {
                    let unique = accumulator.len();
                    info!(
                        unique,
                        raw_rows, pages, ?reason, "pagination complete"
                    );
                    return PagerOutcome {
                        records: accumulator.into_sorted(),
                        unique,
                        raw_rows,
                        pages,
                        stop: reason,
                        error: None,
                    };
                }
            }
        }
    }

    fn aborted(
        accumulator: UniqueAccumulator,
        raw_rows: u64,
        pages: u64,
        error: Error,
    ) -> PagerOutcome {
        let unique = accumulator.len();
        warn!(unique, raw_rows, pages, %error, "run aborted; returning partial results");
        PagerOutcome {
            records: accumulator.into_sorted(),
            unique,
            raw_rows,
            pages,
            stop: StopReason::Aborted,
            error: Some(error),
        }
    }
}
