//! Run profiles
//!
//! Optional YAML profile describing a whole run: endpoint, credentials, group,
//! pager settings, and destination. Everything has a default; a profile only
//! needs the values that differ. CLI flags override profile values.

use crate::error::{Error, Result, ResultExt};
use crate::pager::PagerConfig;
use crate::sink::hosted::DEFAULT_BATCH_SIZE;
use crate::sink::OutputFormat;
use crate::types::{Credentials, FaunaGroup};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// The NSW BioNet species sightings entity set
pub const DEFAULT_ENDPOINT: &str =
    "https://data.bionet.nsw.gov.au/biosvcapp/odata/SpeciesSightings_CoreData";

/// A run profile loaded from YAML
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Profile {
    /// OData entity-set URL
    pub endpoint: String,
    /// BioNet username, for licensed access
    pub username: Option<String>,
    /// BioNet password
    pub password: Option<String>,
    /// Fauna group to fetch
    pub group: FaunaGroup,
    /// Records per page
    pub page_size: u32,
    /// Zero-new-species pages before stopping a target-less run
    pub stall_threshold: u32,
    /// Hard page ceiling per run
    pub max_pages: u64,
    /// Cap on unique records collected
    pub max_records: Option<usize>,
    /// Ask for a distinct-species count before paging
    pub estimate: bool,
    /// Local output path
    pub output: Option<PathBuf>,
    /// Local output format, when the extension is not enough
    pub format: Option<OutputFormat>,
    /// Hosted-table destination
    pub hosted: Option<HostedProfile>,
}

impl Default for Profile {
    fn default() -> Self {
        let pager = PagerConfig::default();
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            username: None,
            password: None,
            group: FaunaGroup::default(),
            page_size: pager.page_size,
            stall_threshold: pager.stall_threshold,
            max_pages: pager.max_pages,
            max_records: None,
            estimate: true,
            output: None,
            format: None,
            hosted: None,
        }
    }
}

/// Hosted-table settings within a profile
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HostedProfile {
    /// Base URL of the hosted-table service
    pub service_url: String,
    /// Table name at the service
    pub table_name: String,
    /// Rows per append request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Run the post-sync maintenance steps
    #[serde(default = "default_maintenance")]
    pub maintenance: bool,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_maintenance() -> bool {
    true
}

impl Profile {
    /// Load a profile from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read {}", path.as_ref().display()))?;
        Self::parse(&text)
    }

    /// Parse a profile from YAML text
    pub fn parse(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(Error::YamlParse)
    }

    /// Basic-auth credentials, when both halves are present
    pub fn credentials(&self) -> Option<Credentials> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some(Credentials {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        }
    }

    /// Pager settings from the profile
    pub fn pager_config(&self) -> PagerConfig {
        let mut config = PagerConfig::new()
            .with_page_size(self.page_size)
            .with_stall_threshold(self.stall_threshold)
            .with_max_pages(self.max_pages);
        if let Some(cap) = self.max_records {
            config = config.with_max_records(cap);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_profile_uses_defaults() {
        let profile = Profile::parse("{}").unwrap();
        assert_eq!(profile.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(profile.group, FaunaGroup::AllFauna);
        assert_eq!(profile.page_size, 500);
        assert_eq!(profile.stall_threshold, 5);
        assert!(profile.estimate);
        assert!(profile.credentials().is_none());
        assert!(profile.hosted.is_none());
    }

    #[test]
    fn test_full_profile_parses() {
        let yaml = r"
endpoint: https://example.org/odata/Sightings
username: licensed
password: secret
group: mammals
page_size: 100
stall_threshold: 3
max_records: 1000
estimate: false
output: /tmp/out.parquet
hosted:
  service_url: https://tables.example.org
  table_name: fauna_species
  batch_size: 50
";
        let profile = Profile::parse(yaml).unwrap();
        assert_eq!(profile.group, FaunaGroup::Mammals);
        assert_eq!(profile.credentials().unwrap().username, "licensed");
        assert!(!profile.estimate);

        let pager = profile.pager_config();
        assert_eq!(pager.page_size, 100);
        assert_eq!(pager.stall_threshold, 3);
        assert_eq!(pager.max_records, Some(1000));

        let hosted = profile.hosted.unwrap();
        assert_eq!(hosted.table_name, "fauna_species");
        assert_eq!(hosted.batch_size, 50);
        assert!(hosted.maintenance);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(matches!(
            Profile::parse("endponi: typo"),
            Err(Error::YamlParse(_))
        ));
    }

    #[test]
    fn test_credentials_require_both_halves() {
        let profile = Profile::parse("username: only-half").unwrap();
        assert!(profile.credentials().is_none());
    }
}
