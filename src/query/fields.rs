//! The `$select` field set

use crate::error::{Error, Result};

/// Default BioNet sightings fields: identity, descriptive, status, and date columns
pub const DEFAULT_FIELDS: &[&str] = &[
    "ScientificName",
    "CommonName",
    "Class",
    "BCActStatus",
    "EPBCActStatus",
    "SightingDate",
];

/// Ordered sequence of requested field names.
///
/// Mutable only through [`FieldSet::remove`], which the schema negotiator calls
/// when the server rejects a field. The set must never become empty; that would
/// mean every requested field was rejected, a fatal misconfiguration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSet {
    fields: Vec<String>,
}

impl FieldSet {
    /// Create a field set from an ordered list of names, dropping duplicates
    pub fn new<I, S>(fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = Vec::new();
        for field in fields {
            let field = field.into();
            if field.trim().is_empty() {
                continue;
            }
            if !seen.iter().any(|f: &String| f.eq_ignore_ascii_case(&field)) {
                seen.push(field);
            }
        }
        if seen.is_empty() {
            return Err(Error::EmptyFieldSet);
        }
        Ok(Self { fields: seen })
    }

    /// The default BioNet sightings field set
    pub fn bionet_default() -> Self {
        Self {
            fields: DEFAULT_FIELDS.iter().map(ToString::to_string).collect(),
        }
    }

    /// Remove a field by name (case-insensitive). Returns true if it was present.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.fields.len();
        self.fields.retain(|f| !f.eq_ignore_ascii_case(name));
        self.fields.len() < before
    }

    /// Check membership (case-insensitive)
    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.eq_ignore_ascii_case(name))
    }

    /// Number of fields currently requested
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the set is empty (fatal state, see [`crate::error::Error::EmptyFieldSet`])
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Comma-joined `$select` value
    pub fn to_select(&self) -> String {
        self.fields.join(",")
    }

    /// Iterate field names in request order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(String::as_str)
    }
}

impl Default for FieldSet {
    fn default() -> Self {
        Self::bionet_default()
    }
}
