//! Source kinds, fetched artifacts, and the client seam.

use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::RemoteSourceError;

/// What a remote artifact is. Determines the endpoint it is fetched from,
/// the JSON shape it must have, and where it lands in the bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// Certificate value sets (vaccines, tests, diseases), one fetch shared
    /// by all languages.
    ValueSets,
    /// Countries that participate in certificate exchange.
    OnboardedCountries,
    /// Business rules for accepting a certificate at entry.
    AcceptanceRules,
    /// Business rules invalidating certificates.
    InvalidationRules,
    /// Validation service descriptors.
    ValidationServices,
    /// Ruleset published in the slot named after the certificate structure.
    DefaultRules,
    /// Document signer certificates.
    #[serde(rename = "dscs")]
    SigningCertificates,
}

/// Expected top-level JSON shape of a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentShape {
    Array,
    Object,
}

impl SourceKind {
    pub const ALL: [SourceKind; 7] = [
        Self::ValueSets,
        Self::OnboardedCountries,
        Self::AcceptanceRules,
        Self::InvalidationRules,
        Self::ValidationServices,
        Self::DefaultRules,
        Self::SigningCertificates,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValueSets => "value-sets",
            Self::OnboardedCountries => "onboarded-countries",
            Self::AcceptanceRules => "acceptance-rules",
            Self::InvalidationRules => "invalidation-rules",
            Self::ValidationServices => "validation-services",
            Self::DefaultRules => "default-rules",
            Self::SigningCertificates => "dscs",
        }
    }

    pub fn expected_shape(&self) -> ContentShape {
        match self {
            Self::ValueSets | Self::SigningCertificates => ContentShape::Object,
            Self::OnboardedCountries
            | Self::AcceptanceRules
            | Self::InvalidationRules
            | Self::ValidationServices
            | Self::DefaultRules => ContentShape::Array,
        }
    }

    /// Check that `body` is JSON with this kind's top-level shape.
    pub fn validate_content(&self, body: &[u8]) -> Result<serde_json::Value, RemoteSourceError> {
        let value: serde_json::Value = serde_json::from_slice(body)
            .map_err(|e| RemoteSourceError::content(*self, format!("body is not JSON: {e}")))?;
        let matches = match self.expected_shape() {
            ContentShape::Array => value.is_array(),
            ContentShape::Object => value.is_object(),
        };
        if !matches {
            return Err(RemoteSourceError::content(
                *self,
                format!("expected a JSON {:?} for {self}", self.expected_shape()),
            ));
        }
        Ok(value)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw bytes fetched from a provider plus their provenance. Consumed once
/// per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteArtifact {
    kind: SourceKind,
    bytes: Vec<u8>,
}

impl RemoteArtifact {
    pub fn new(kind: SourceKind, bytes: Vec<u8>) -> Self {
        Self { kind, bytes }
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Parse the body as JSON.
    pub fn json(&self) -> Result<serde_json::Value, RemoteSourceError> {
        self.kind.validate_content(&self.bytes)
    }
}

/// Fetches validated artifacts by kind.
///
/// Implementations are shared across concurrent fetch tasks, hence the
/// `Send + Sync` bound and the `Send` future.
pub trait RemoteSourceClient: Send + Sync {
    fn fetch(
        &self,
        kind: SourceKind,
    ) -> impl Future<Output = Result<RemoteArtifact, RemoteSourceError>> + Send;
}
