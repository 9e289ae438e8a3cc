//! Pager types
//!
//! Configuration, page requests, the unique-record accumulator, and the pure
//! stop/continue decision the pager loop executes.

use crate::error::Error;
use crate::types::JsonObject;
use std::collections::HashMap;

/// Configuration for a pager run.
///
/// Everything the loop consults is explicit here so the pager can be tested
/// without network access.
#[derive(Debug, Clone)]
pub struct PagerConfig {
    /// Records requested per page (`$top`)
    pub page_size: u32,
    /// Consecutive pages with zero new identities before the stall heuristic
    /// stops a run that has no known target
    pub stall_threshold: u32,
    /// Hard ceiling on pages fetched in one run; guards against token
    /// ping-pong or always-changing server data
    pub max_pages: u64,
    /// Optional cap on unique records collected
    pub max_records: Option<usize>,
}

impl Default for PagerConfig {
    fn default() -> Self {
        Self {
            page_size: 500,
            stall_threshold: 5,
            max_pages: 20_000,
            max_records: None,
        }
    }
}

impl PagerConfig {
    /// Create a config with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page size
    #[must_use]
    pub fn with_page_size(mut self, size: u32) -> Self {
        self.page_size = size;
        self
    }

    /// Set the stall threshold
    #[must_use]
    pub fn with_stall_threshold(mut self, pages: u32) -> Self {
        self.stall_threshold = pages;
        self
    }

    /// Set the page ceiling
    #[must_use]
    pub fn with_max_pages(mut self, pages: u64) -> Self {
        self.max_pages = pages;
        self
    }

    /// Cap the number of unique records collected
    #[must_use]
    pub fn with_max_records(mut self, cap: usize) -> Self {
        self.max_records = Some(cap);
        self
    }
}

/// How to fetch the next page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageRequest {
    /// Follow a server-issued continuation URL verbatim; it encodes its own
    /// filter, select, and paging state
    NextLink(String),
    /// Construct the request from the field set, filter, and these bounds
    Offset {
        /// `$skip` value
        skip: u64,
        /// `$top` value
        top: u32,
    },
}

impl PageRequest {
    /// The first page of a run
    pub fn first(page_size: u32) -> Self {
        Self::Offset {
            skip: 0,
            top: page_size,
        }
    }
}

/// Why a pager run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The accumulator reached the known distinct-identity target
    TargetReached,
    /// A page came back shorter than requested and offered no continuation
    SourceExhausted,
    /// No known target and `stall_threshold` consecutive pages added nothing new
    Stalled,
    /// The configured max-record cap was reached
    RecordCap,
    /// A fatal error ended the run early; partial results are still returned
    Aborted,
}

/// Decision produced after merging a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Fetch another page
    Fetch(PageRequest),
    /// Stop; the run is complete
    Done(StopReason),
}

/// What the decision logic needs to know about the page just merged
#[derive(Debug, Clone)]
pub struct PageAssessment {
    /// Records on the page (raw, before dedup)
    pub records_on_page: usize,
    /// Page size that was requested
    pub requested: u32,
    /// Continuation URL offered by the page, if any
    pub next_link: Option<String>,
    /// `$skip` for the next constructed request
    pub next_offset: u64,
    /// Unique identities accumulated so far
    pub unique: usize,
    /// Known distinct-identity target, when the estimator succeeded
    pub target: Option<u64>,
    /// Consecutive pages (including this one) that added zero new identities
    pub stalled_pages: u32,
}

/// The termination policy, evaluated in priority order.
///
/// Pure over its inputs so canned page sequences can drive it in tests.
pub fn decide(config: &PagerConfig, page: &PageAssessment) -> Decision {
    if let Some(cap) = config.max_records {
        if page.unique >= cap {
            return Decision::Done(StopReason::RecordCap);
        }
    }

    if let Some(target) = page.target {
        if page.unique as u64 >= target {
            return Decision::Done(StopReason::TargetReached);
        }
    }

    if let Some(link) = &page.next_link {
        return Decision::Fetch(PageRequest::NextLink(link.clone()));
    }

    if page.records_on_page < page.requested as usize {
        return Decision::Done(StopReason::SourceExhausted);
    }

    if page.target.is_none() && page.stalled_pages >= config.stall_threshold {
        return Decision::Done(StopReason::Stalled);
    }

    Decision::Fetch(PageRequest::Offset {
        skip: page.next_offset,
        top: config.page_size,
    })
}

/// Accumulates the first-seen record per normalized identity.
///
/// Keys are the identity field lowercased and trimmed; the stored record keeps
/// its original casing. Grows monotonically during a run and is read once at
/// the end, sorted.
#[derive(Debug, Clone, Default)]
pub struct UniqueAccumulator {
    index: HashMap<String, usize>,
    records: Vec<(String, JsonObject)>,
}

impl UniqueAccumulator {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize an identity value for comparison
    pub fn normalize(identity: &str) -> String {
        identity.trim().to_lowercase()
    }

    /// Insert a record under its identity value.
    ///
    /// Returns true when the identity was unseen; duplicates leave the
    /// first-seen record untouched.
    pub fn insert(&mut self, identity: &str, record: JsonObject) -> bool {
        let key = Self::normalize(identity);
        if key.is_empty() || self.index.contains_key(&key) {
            return false;
        }
        self.index.insert(key.clone(), self.records.len());
        self.records.push((key, record));
        true
    }

    /// Check whether an identity has been seen
    pub fn contains(&self, identity: &str) -> bool {
        self.index.contains_key(&Self::normalize(identity))
    }

    /// Number of unique identities accumulated
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if nothing has been accumulated
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Consume the accumulator, producing records ordered by identity
    /// (case-insensitive ascending, insertion order breaking ties)
    pub fn into_sorted(self) -> Vec<JsonObject> {
        let mut entries = self.records;
        // stable sort keeps insertion order for equal keys
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries.into_iter().map(|(_, record)| record).collect()
    }
}

/// Everything a pager run produced.
///
/// A failed run carries the error *and* whatever was accumulated before it;
/// partial progress is never discarded.
#[derive(Debug)]
pub struct PagerOutcome {
    /// Unique records, ordered by identity
    pub records: Vec<JsonObject>,
    /// Count of unique identities (same as `records.len()`, kept for logging
    /// after records are consumed)
    pub unique: usize,
    /// Raw rows seen across all pages, duplicates included
    pub raw_rows: u64,
    /// Pages fetched
    pub pages: u64,
    /// Why the run stopped
    pub stop: StopReason,
    /// The fatal error, when the run aborted
    pub error: Option<Error>,
}

impl PagerOutcome {
    /// Check whether the run completed without error
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}
