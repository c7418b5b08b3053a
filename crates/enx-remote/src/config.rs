//! Remote source configuration.
//!
//! Deserialized from the `remote` section of the distribution config. Every
//! field has a default except the trust anchor, which must be set before an
//! HTTP client can be built.

use serde::Deserialize;
use url::Url;

use crate::source::SourceKind;

/// Endpoints and behaviour of the HTTP remote source client.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RemoteSourceConfig {
    /// Base URL all content paths are resolved against.
    pub base_url: String,
    /// Absolute URL of the signed service-provider allow list.
    pub allow_list_url: String,
    /// Hex Ed25519 public key that signs the allow list.
    pub trust_anchor: String,
    /// Per-kind content paths.
    pub paths: SourcePaths,
    /// Request timeout in seconds. Doubles as the per-fetch deadline.
    pub timeout_secs: u64,
    /// Retries after the first attempt, transport errors only.
    pub max_retries: u32,
    /// First backoff delay; doubles on each retry.
    pub retry_base_delay_ms: u64,
}

impl Default for RemoteSourceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8081".to_string(),
            allow_list_url: "http://localhost:8081/allowlist".to_string(),
            trust_anchor: String::new(),
            paths: SourcePaths::default(),
            timeout_secs: 30,
            max_retries: 3,
            retry_base_delay_ms: 200,
        }
    }
}

impl RemoteSourceConfig {
    /// Configuration pointing at a local mock server (for testing).
    pub fn local_mock(base_uri: &str, trust_anchor_hex: &str) -> Self {
        let base = base_uri.trim_end_matches('/');
        Self {
            base_url: base.to_string(),
            allow_list_url: format!("{base}/allowlist"),
            trust_anchor: trust_anchor_hex.to_string(),
            timeout_secs: 5,
            max_retries: 1,
            retry_base_delay_ms: 10,
            ..Self::default()
        }
    }

    /// Absolute URL for `kind`.
    pub fn url_for(&self, kind: SourceKind) -> Result<Url, ConfigError> {
        let base = parse_url("base_url", &self.base_url)?;
        base.join(self.paths.path_for(kind))
            .map_err(|e| ConfigError::InvalidUrl(kind.to_string(), e.to_string()))
    }

    pub fn allow_list_url(&self) -> Result<Url, ConfigError> {
        parse_url("allow_list_url", &self.allow_list_url)
    }
}

/// Content paths relative to `base_url`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourcePaths {
    pub value_sets: String,
    pub onboarded_countries: String,
    pub acceptance_rules: String,
    pub invalidation_rules: String,
    pub validation_services: String,
    pub default_rules: String,
    pub signing_certificates: String,
}

impl Default for SourcePaths {
    fn default() -> Self {
        Self {
            value_sets: "/valuesets".to_string(),
            onboarded_countries: "/countrylist".to_string(),
            acceptance_rules: "/rules/acceptance".to_string(),
            invalidation_rules: "/rules/invalidation".to_string(),
            validation_services: "/validation-services".to_string(),
            default_rules: "/rules/default".to_string(),
            signing_certificates: "/trustList/DSC".to_string(),
        }
    }
}

impl SourcePaths {
    pub fn path_for(&self, kind: SourceKind) -> &str {
        match kind {
            SourceKind::ValueSets => &self.value_sets,
            SourceKind::OnboardedCountries => &self.onboarded_countries,
            SourceKind::AcceptanceRules => &self.acceptance_rules,
            SourceKind::InvalidationRules => &self.invalidation_rules,
            SourceKind::ValidationServices => &self.validation_services,
            SourceKind::DefaultRules => &self.default_rules,
            SourceKind::SigningCertificates => &self.signing_certificates,
        }
    }
}

fn parse_url(field: &str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::InvalidUrl(field.to_string(), e.to_string()))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("trust anchor is missing or invalid: {0}")]
    InvalidTrustAnchor(String),
    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}
