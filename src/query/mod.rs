//! Query construction for the BioNet OData endpoint
//!
//! # Overview
//!
//! The query module provides:
//! - `FilterExpression` - `$filter` predicate built from a fauna group selector
//! - `FieldSet` - the ordered `$select` field list, shrunk by schema negotiation
//! - `page_url` / `count_url` - OData request URL assembly with encoding that
//!   keeps OData-significant characters literal

mod fields;
mod filter;

pub use fields::FieldSet;
pub use filter::FilterExpression;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Identity field used to deduplicate species records
pub const IDENTITY_FIELD: &str = "ScientificName";

/// Query-component encoding for OData values.
///
/// The BioNet service rejects predicates where parentheses, commas, or single
/// quotes arrive percent-encoded, so those stay literal along with the usual
/// unreserved characters. Spaces and everything else reserved are encoded.
const ODATA_QUERY: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'(')
    .remove(b')')
    .remove(b',')
    .remove(b'\'')
    .remove(b'$')
    .remove(b'=')
    .remove(b'/')
    .remove(b':');

/// Percent-encode a single OData query value
pub fn encode_value(value: &str) -> String {
    utf8_percent_encode(value, ODATA_QUERY).to_string()
}

/// Build the URL for one data page: `$select` + `$filter` + `$top` + `$skip`
pub fn page_url(
    endpoint: &str,
    fields: &FieldSet,
    filter: &FilterExpression,
    top: u32,
    skip: u64,
) -> String {
    let mut params = vec![format!("$select={}", encode_value(&fields.to_select()))];
    if let Some(predicate) = filter.as_predicate() {
        params.push(format!("$filter={}", encode_value(predicate)));
    }
    params.push(format!("$top={top}"));
    if skip > 0 {
        params.push(format!("$skip={skip}"));
    }
    format!("{}?{}", endpoint.trim_end_matches('/'), params.join("&"))
}

/// Build the aggregation URL for the distinct-identity count:
/// group by the identity field, request the inline count and zero rows.
pub fn count_url(endpoint: &str, filter: &FilterExpression) -> String {
    let mut params = vec![format!(
        "$apply={}",
        encode_value(&format!("groupby(({IDENTITY_FIELD}))"))
    )];
    if let Some(predicate) = filter.as_predicate() {
        params.push(format!("$filter={}", encode_value(predicate)));
    }
    params.push("$count=true".to_string());
    params.push("$top=0".to_string());
    format!("{}?{}", endpoint.trim_end_matches('/'), params.join("&"))
}
