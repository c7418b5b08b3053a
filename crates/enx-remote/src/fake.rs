//! Fixture-backed remote source client.
//!
//! Serves canned bodies or canned failures per [`SourceKind`]. Used for
//! offline assembly runs (`enx assemble --offline`) and in tests that need a
//! particular category to fail. Bodies go through the same shape validation
//! as the HTTP client, so a wrongly shaped fixture yields
//! `InvalidContentResponse`.

use std::collections::BTreeMap;

use serde_json::json;

use crate::error::RemoteSourceError;
use crate::source::{RemoteArtifact, RemoteSourceClient, SourceKind};

/// A failure to replay instead of a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureFailure {
    InvalidFingerprint,
    InvalidContentResponse,
}

#[derive(Debug, Clone)]
enum Fixture {
    Body(Vec<u8>),
    Failure(FixtureFailure),
}

/// Remote source client answering from an in-memory table.
#[derive(Debug, Clone, Default)]
pub struct StaticRemoteSourceClient {
    fixtures: BTreeMap<SourceKind, Fixture>,
}

impl StaticRemoteSourceClient {
    /// A client with no fixtures; every fetch fails with `NotConfigured`.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(mut self, kind: SourceKind, body: impl Into<Vec<u8>>) -> Self {
        self.fixtures.insert(kind, Fixture::Body(body.into()));
        self
    }

    pub fn with_json(self, kind: SourceKind, value: &serde_json::Value) -> Self {
        self.with_body(kind, value.to_string())
    }

    pub fn with_failure(mut self, kind: SourceKind, failure: FixtureFailure) -> Self {
        self.fixtures.insert(kind, Fixture::Failure(failure));
        self
    }

    /// A client serving small, well-formed sample data for every kind.
    pub fn sample() -> Self {
        let rule = |id: &str, kind: &str, country: &str| {
            json!({
                "Identifier": id,
                "Type": kind,
                "Country": country,
                "Version": "1.0.0",
                "SchemaVersion": "1.0.0",
                "Engine": "CERTLOGIC",
                "EngineVersion": "0.7.5",
                "CertificateType": "Vaccination",
                "ValidFrom": "2026-01-01T00:00:00Z",
                "ValidTo": "2027-01-01T00:00:00Z",
                "AffectedFields": ["v.0.dn", "v.0.sd"],
                "Logic": { "if": [{ "var": "payload.v.0" }, true, false] },
                "Description": [{ "lang": "en", "desc": "Vaccination must be complete." }]
            })
        };

        Self::new()
            .with_json(
                SourceKind::ValueSets,
                &json!({
                    "vaccines-covid-19-names": {
                        "valueSetId": "vaccines-covid-19-names",
                        "valueSetDate": "2026-01-15",
                        "valueSetValues": {
                            "EU/1/20/1528": {
                                "display": { "en": "Comirnaty", "de": "Comirnaty" },
                                "active": true,
                                "system": "https://ec.europa.eu/health/documents/community-register/html/",
                                "version": ""
                            }
                        }
                    },
                    "disease-agent-targeted": {
                        "valueSetId": "disease-agent-targeted",
                        "valueSetDate": "2026-01-15",
                        "valueSetValues": {
                            "840539006": {
                                "display": { "en": "COVID-19", "de": "COVID-19" },
                                "active": true,
                                "system": "http://snomed.info/sct",
                                "version": "http://snomed.info/sct/900000000000207008/version/20210131"
                            }
                        }
                    }
                }),
            )
            .with_json(SourceKind::OnboardedCountries, &json!(["DE", "FR", "IT", "AT"]))
            .with_json(
                SourceKind::AcceptanceRules,
                &json!([rule("VR-DE-0001", "Acceptance", "DE"), rule("VR-FR-0001", "Acceptance", "FR")]),
            )
            .with_json(
                SourceKind::InvalidationRules,
                &json!([rule("IR-DE-0001", "Invalidation", "DE")]),
            )
            .with_json(
                SourceKind::ValidationServices,
                &json!([{
                    "id": "https://validation.example.org#ValidationService",
                    "type": "ValidationService",
                    "serviceEndpoint": "https://validation.example.org/validate",
                    "name": "Example validation service"
                }]),
            )
            .with_json(SourceKind::DefaultRules, &json!([rule("BNR-DE-0001", "BoosterNotification", "DE")]))
            .with_json(
                SourceKind::SigningCertificates,
                &json!({
                    "certificates": [{
                        "kid": "DEsVUSvpFAE=",
                        "country": "DE",
                        "certificateType": "DSC",
                        "thumbprint": "0c4f8c6b0e7f3e0d9c1a2b3c4d5e6f708192a3b4c5d6e7f8091a2b3c4d5e6f70",
                        "rawData": "MIIBvTCCAWOgAwIBAgIKAXk8i88OleLsuTAKBggqhkjOPQQDAjA2",
                        "timestamp": "2026-01-10T08:00:00Z"
                    }]
                }),
            )
    }
}

impl RemoteSourceClient for StaticRemoteSourceClient {
    async fn fetch(&self, kind: SourceKind) -> Result<RemoteArtifact, RemoteSourceError> {
        match self.fixtures.get(&kind) {
            Some(Fixture::Body(bytes)) => {
                kind.validate_content(bytes)?;
                Ok(RemoteArtifact::new(kind, bytes.clone()))
            }
            Some(Fixture::Failure(FixtureFailure::InvalidFingerprint)) => Err(
                RemoteSourceError::fingerprint(format!("fixture failure for {kind}")),
            ),
            Some(Fixture::Failure(FixtureFailure::InvalidContentResponse)) => Err(
                RemoteSourceError::content(kind, format!("fixture failure for {kind}")),
            ),
            None => Err(RemoteSourceError::NotConfigured(kind)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sample_serves_every_kind() {
        let client = StaticRemoteSourceClient::sample();
        for kind in SourceKind::ALL {
            let artifact = client.fetch(kind).await.unwrap();
            assert_eq!(artifact.kind(), kind);
            assert!(artifact.json().is_ok());
        }
    }

    #[tokio::test]
    async fn failures_are_replayed() {
        let client = StaticRemoteSourceClient::new()
            .with_failure(SourceKind::AcceptanceRules, FixtureFailure::InvalidContentResponse)
            .with_failure(SourceKind::ValueSets, FixtureFailure::InvalidFingerprint);

        assert!(matches!(
            client.fetch(SourceKind::AcceptanceRules).await,
            Err(RemoteSourceError::InvalidContentResponse { .. })
        ));
        assert!(matches!(
            client.fetch(SourceKind::ValueSets).await,
            Err(RemoteSourceError::InvalidFingerprint { .. })
        ));
        assert!(matches!(
            client.fetch(SourceKind::DefaultRules).await,
            Err(RemoteSourceError::NotConfigured(SourceKind::DefaultRules))
        ));
    }

    #[tokio::test]
    async fn wrongly_shaped_body_is_invalid_content() {
        let client = StaticRemoteSourceClient::new().with_body(SourceKind::OnboardedCountries, "{}");
        assert!(matches!(
            client.fetch(SourceKind::OnboardedCountries).await,
            Err(RemoteSourceError::InvalidContentResponse { .. })
        ));
    }
}
