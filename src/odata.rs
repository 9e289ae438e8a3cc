//! OData response handling
//!
//! Two concerns live here:
//! - parsing a JSON response body into an [`ODataPage`] (records, continuation
//!   link, inline count)
//! - isolating the unknown-`$select`-field name out of an error body so the
//!   pager can negotiate the field away and retry
//!
//! The error-body parser is deliberately narrow: error text in, optional field
//! name out. The upstream error format is undocumented, so anything the parser
//! cannot positively identify is treated as "cannot negotiate", never a guess.

use crate::error::{Error, Result};
use crate::types::{JsonObject, JsonValue};
use once_cell::sync::Lazy;
use regex::Regex;

/// One page of an OData entity set
#[derive(Debug, Clone, Default)]
pub struct ODataPage {
    /// Raw records from the `value` array
    pub records: Vec<JsonObject>,
    /// Server-issued continuation URL, used verbatim for the next page
    pub next_link: Option<String>,
    /// Inline `@odata.count` total, when requested and supported
    pub count: Option<u64>,
}

impl ODataPage {
    /// Parse a response body into a page.
    ///
    /// The body must be a JSON object with a `value` array; anything else is a
    /// `Decode` error (unexpected payload shape is fatal, per the error policy).
    pub fn parse(body: &str) -> Result<Self> {
        let json: JsonValue = serde_json::from_str(body)
            .map_err(|e| Error::decode(format!("OData response is not JSON: {e}")))?;

        let obj = json
            .as_object()
            .ok_or_else(|| Error::decode("OData response is not a JSON object"))?;

        let records = match obj.get("value") {
            Some(JsonValue::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_object().cloned().ok_or_else(|| {
                        Error::decode("OData 'value' entry is not a JSON object")
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            Some(_) => return Err(Error::decode("OData 'value' is not an array")),
            None => return Err(Error::decode("OData response has no 'value' array")),
        };

        let next_link = obj
            .get("@odata.nextLink")
            .and_then(JsonValue::as_str)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string);

        let count = obj.get("@odata.count").and_then(JsonValue::as_u64);

        Ok(Self {
            records,
            next_link,
            count,
        })
    }

    /// Number of records on this page
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the page carried no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

static MISSING_PROPERTY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)could not find a property (?:named\s+)?'([^']+)'")
        .expect("missing-property pattern is valid")
});

/// Extract the name of the unrecognized `$select` field from an error body.
///
/// Accepts the JSON error envelope (`error.message`, with the nested
/// `error.innererror.message` some deployments use instead) as well as plain
/// text. Returns `None` when no field name can be positively identified.
pub fn extract_missing_field(body: &str) -> Option<String> {
    // Prefer the structured messages when the body is JSON
    if let Ok(json) = serde_json::from_str::<JsonValue>(body) {
        for message in error_messages(&json) {
            if let Some(field) = match_missing_property(message) {
                return Some(field);
            }
        }
    }
    // Fall back to scanning the raw text
    match_missing_property(body)
}

/// Collect candidate message strings from a JSON error envelope
fn error_messages(json: &JsonValue) -> Vec<&str> {
    let mut messages = Vec::new();
    let error = json.get("error").unwrap_or(json);
    if let Some(msg) = error.get("message").and_then(JsonValue::as_str) {
        messages.push(msg);
    }
    if let Some(msg) = error
        .get("innererror")
        .and_then(|inner| inner.get("message"))
        .and_then(JsonValue::as_str)
    {
        messages.push(msg);
    }
    messages
}

fn match_missing_property(text: &str) -> Option<String> {
    MISSING_PROPERTY
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
