//! Unique-count estimation
//!
//! One opportunistic aggregation query tells the pager how many distinct
//! species identities to expect, turning the stop decision from a heuristic
//! into an exact target. Not every deployment supports `$apply`, so every
//! failure degrades to "unknown" instead of propagating.

use crate::http::HttpClient;
use crate::odata::ODataPage;
use crate::query::{count_url, FilterExpression};
use tracing::{debug, warn};

/// Ask the server for the number of distinct identities matching `filter`.
///
/// Issues a single `groupby((ScientificName))` aggregation with `$count=true`
/// and `$top=0`. Returns `None` on any failure; the caller falls back to the
/// stall heuristic, and the degradation is logged so it is not masked.
pub async fn estimate_unique_count(
    client: &HttpClient,
    endpoint: &str,
    filter: &FilterExpression,
) -> Option<u64> {
    let url = count_url(endpoint, filter);
    debug!(%url, "requesting distinct-identity count");

    let response = match client.get(&url).await {
        Ok(response) => response,
        Err(e) => {
            warn!("unique-count aggregation failed, falling back to stall heuristic: {e}");
            return None;
        }
    };

    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => {
            warn!("unique-count response unreadable, falling back to stall heuristic: {e}");
            return None;
        }
    };

    match ODataPage::parse(&body) {
        Ok(page) => {
            if let Some(count) = page.count {
                debug!(count, "server reported distinct-identity count");
            } else {
                warn!("aggregation response carried no inline count; using stall heuristic");
            }
            page.count
        }
        Err(e) => {
            warn!("unique-count response unparseable, falling back to stall heuristic: {e}");
            None
        }
    }
}
