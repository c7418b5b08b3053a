//! # Distribution Configuration
//!
//! Loaded from YAML. Every field has a default, so an empty document is a
//! valid configuration for local runs:
//!
//! ```yaml
//! root_name: v1
//! dgc_directory: ehn-dgc
//! languages: [de, en]
//! region: DE
//! min_trl: 3
//! days_to_fetch: 14
//! fatal_categories: [dscs]
//! remote:
//!   base_url: https://distribution.example
//!   trust_anchor: 3d4017c3e843895a92b70aa74d1b7ebc9c982ccf2ec4968cc0cd55f12af4660c
//! ```
//!
//! Secrets (the signing seed, the database URL) are never part of this
//! file; they come from the environment.

use std::collections::BTreeSet;
use std::path::Path;

use enx_core::CountryCode;
use enx_remote::{RemoteSourceConfig, SourceKind};
use serde::Deserialize;
use thiserror::Error;

use crate::tree::validate_name;

/// Upper bound for [`DistributionConfig::fetch_concurrency`]. A run fetches
/// at most one request per source kind, so anything above this only sizes
/// the semaphore.
pub const MAX_FETCH_CONCURRENCY: usize = 64;

/// Errors loading or validating a [`DistributionConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("reading config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Layout and behaviour of one assembly run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DistributionConfig {
    /// Name of the bundle's root directory.
    pub root_name: String,
    /// Directory holding certificate content (value sets and rules).
    pub dgc_directory: String,
    /// Archive name for [`SourceKind::DefaultRules`]. Named after the
    /// certificate structure directory unless overridden.
    pub default_rules_slot: String,
    /// One value-sets archive is published per language.
    pub languages: Vec<String>,
    /// Rule categories published under the certificate directory.
    pub categories: Vec<SourceKind>,
    /// Publish document signer certificates as `<root>/dscs`.
    pub publish_signing_certificates: bool,
    /// Region written into key exports and used as the key directory name.
    pub region: String,
    /// Minimum transmission risk level of published keys.
    pub min_trl: i32,
    /// Only keys submitted within this many days are published.
    pub days_to_fetch: i32,
    /// Maximum number of concurrent remote fetches.
    pub fetch_concurrency: usize,
    /// Categories whose failure aborts the run instead of being skipped.
    pub fatal_categories: BTreeSet<SourceKind>,
    pub remote: RemoteSourceConfig,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            root_name: "v1".to_string(),
            dgc_directory: "ehn-dgc".to_string(),
            default_rules_slot: "ehn-dgc".to_string(),
            languages: ["de", "en", "bg", "pl", "ro", "tr"]
                .into_iter()
                .map(String::from)
                .collect(),
            categories: vec![
                SourceKind::OnboardedCountries,
                SourceKind::AcceptanceRules,
                SourceKind::InvalidationRules,
                SourceKind::ValidationServices,
                SourceKind::DefaultRules,
            ],
            publish_signing_certificates: true,
            region: "DE".to_string(),
            min_trl: 3,
            days_to_fetch: 14,
            fetch_concurrency: 4,
            fatal_categories: BTreeSet::new(),
            remote: RemoteSourceConfig::default(),
        }
    }
}

impl DistributionConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Check value ranges, node names and duplicate list entries.
    ///
    /// Sibling name collisions across lists (for example a language named
    /// like the default rules slot) are left to the tree, which reports them
    /// as a structural conflict.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for name in [&self.root_name, &self.dgc_directory, &self.default_rules_slot]
            .into_iter()
            .chain(&self.languages)
        {
            validate_name(name).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        }
        let mut languages = BTreeSet::new();
        for language in &self.languages {
            if !languages.insert(language.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "language {language} is listed more than once"
                )));
            }
        }
        let mut categories = BTreeSet::new();
        for kind in &self.categories {
            if matches!(kind, SourceKind::ValueSets | SourceKind::SigningCertificates) {
                return Err(ConfigError::Invalid(format!(
                    "{kind} is not a rule category; it is published on its own"
                )));
            }
            if !categories.insert(*kind) {
                return Err(ConfigError::Invalid(format!(
                    "category {kind} is listed more than once"
                )));
            }
        }
        CountryCode::new(&self.region).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if !(1..=8).contains(&self.min_trl) {
            return Err(ConfigError::Invalid(format!(
                "min_trl must be between 1 and 8, got {}",
                self.min_trl
            )));
        }
        if self.days_to_fetch < 0 {
            return Err(ConfigError::Invalid(
                "days_to_fetch must be greater or equal to 0".into(),
            ));
        }
        if !(1..=MAX_FETCH_CONCURRENCY).contains(&self.fetch_concurrency) {
            return Err(ConfigError::Invalid(format!(
                "fetch_concurrency must be between 1 and {MAX_FETCH_CONCURRENCY}, got {}",
                self.fetch_concurrency
            )));
        }
        Ok(())
    }

    /// Archive name of a rule category under the certificate directory.
    pub fn archive_name(&self, kind: SourceKind) -> &str {
        match kind {
            SourceKind::DefaultRules => &self.default_rules_slot,
            other => other.as_str(),
        }
    }

    pub fn is_fatal(&self, kind: SourceKind) -> bool {
        self.fatal_categories.contains(&kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = DistributionConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config.root_name, "v1");
        assert_eq!(config.archive_name(SourceKind::DefaultRules), "ehn-dgc");
        assert_eq!(config.archive_name(SourceKind::AcceptanceRules), "acceptance-rules");
        assert_eq!(config.categories.len(), 5);
        assert_eq!(config.languages.len(), 6);
    }

    #[test]
    fn overrides_and_fatal_categories() {
        let yaml = r#"
languages: [en]
min_trl: 5
fatal_categories: [dscs, acceptance-rules]
remote:
  base_url: https://cdn.example
  max_retries: 0
"#;
        let config = DistributionConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.languages, vec!["en"]);
        assert_eq!(config.min_trl, 5);
        assert!(config.is_fatal(SourceKind::SigningCertificates));
        assert!(config.is_fatal(SourceKind::AcceptanceRules));
        assert!(!config.is_fatal(SourceKind::InvalidationRules));
        assert_eq!(config.remote.base_url, "https://cdn.example");
        assert_eq!(config.remote.max_retries, 0);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(matches!(
            DistributionConfig::from_yaml_str("rot_name: v2"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn out_of_range_values_are_invalid() {
        for yaml in [
            "min_trl: 0",
            "min_trl: 9",
            "days_to_fetch: -1",
            "fetch_concurrency: 0",
            "fetch_concurrency: 65",
            "fetch_concurrency: 18446744073709551615",
            "region: Germany",
            "root_name: a/b",
            "languages: ['..']",
            "categories: [value-sets]",
            "categories: [acceptance-rules, acceptance-rules]",
            "languages: [de, en, de]",
        ] {
            assert!(
                matches!(DistributionConfig::from_yaml_str(yaml), Err(ConfigError::Invalid(_))),
                "{yaml} should be invalid"
            );
        }
    }

    #[test]
    fn from_file_reads_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("distribution.yaml");
        std::fs::write(&path, "region: FR\n").unwrap();
        assert_eq!(DistributionConfig::from_file(&path).unwrap().region, "FR");
        assert!(matches!(
            DistributionConfig::from_file(dir.path().join("missing.yaml")),
            Err(ConfigError::Io { .. })
        ));
    }
}
