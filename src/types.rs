//! Common types used throughout bionet-sync
//!
//! This module contains shared type definitions, type aliases,
//! and utility types used across multiple modules.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

/// Generic key-value map with string keys and values
pub type StringMap = HashMap<String, String>;

// ============================================================================
// Fauna Group
// ============================================================================

/// Fauna group selector, mapped to a taxonomic class predicate by the query builder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum FaunaGroup {
    /// All known fauna classes
    #[default]
    AllFauna,
    /// Class Mammalia
    Mammals,
    /// Class Aves
    Birds,
    /// Class Reptilia
    Reptiles,
    /// Class Amphibia
    Amphibians,
}

impl FaunaGroup {
    /// The taxonomic class name BioNet records carry for this group,
    /// or `None` for the all-fauna disjunction.
    pub fn class_name(self) -> Option<&'static str> {
        match self {
            FaunaGroup::AllFauna => None,
            FaunaGroup::Mammals => Some("Mammalia"),
            FaunaGroup::Birds => Some("Aves"),
            FaunaGroup::Reptiles => Some("Reptilia"),
            FaunaGroup::Amphibians => Some("Amphibia"),
        }
    }

    /// All class names covered by the all-fauna disjunction
    pub fn all_classes() -> &'static [&'static str] {
        &["Mammalia", "Aves", "Reptilia", "Amphibia"]
    }
}

impl std::fmt::Display for FaunaGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FaunaGroup::AllFauna => "all fauna",
            FaunaGroup::Mammals => "mammals",
            FaunaGroup::Birds => "birds",
            FaunaGroup::Reptiles => "reptiles",
            FaunaGroup::Amphibians => "amphibians",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Backoff Type
// ============================================================================

/// Type of backoff for retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffType {
    /// Constant delay between retries
    Constant,
    /// Linear increase in delay
    Linear,
    /// Exponential increase in delay
    #[default]
    Exponential,
}

// ============================================================================
// Credentials
// ============================================================================

/// HTTP Basic credentials; anonymous access is permitted but may restrict data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Account username
    pub username: String,
    /// Account password
    pub password: String,
}

impl Credentials {
    /// Create credentials from username and password
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fauna_group_class_names() {
        assert_eq!(FaunaGroup::Mammals.class_name(), Some("Mammalia"));
        assert_eq!(FaunaGroup::Birds.class_name(), Some("Aves"));
        assert_eq!(FaunaGroup::Reptiles.class_name(), Some("Reptilia"));
        assert_eq!(FaunaGroup::Amphibians.class_name(), Some("Amphibia"));
        assert_eq!(FaunaGroup::AllFauna.class_name(), None);
    }

    #[test]
    fn test_fauna_group_serde() {
        let group: FaunaGroup = serde_json::from_str("\"mammals\"").unwrap();
        assert_eq!(group, FaunaGroup::Mammals);

        let json = serde_json::to_string(&FaunaGroup::AllFauna).unwrap();
        assert_eq!(json, "\"all_fauna\"");
    }

    #[test]
    fn test_fauna_group_default() {
        assert_eq!(FaunaGroup::default(), FaunaGroup::AllFauna);
    }
}
