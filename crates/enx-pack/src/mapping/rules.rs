//! Canonical JSON encoders for certificates, value sets and business rules.
//!
//! Each encoder parses the fetched body into typed records, rejects records
//! missing their identifying fields, sorts them by identity and emits RFC
//! 8785 canonical JSON. Fields the encoders do not interpret are carried
//! through unchanged.

use std::collections::{BTreeMap, BTreeSet};

use enx_core::{CanonicalBytes, CountryCode};
use enx_remote::{RemoteArtifact, SourceKind};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::MappingError;

/// Language used when a value has no display text in the requested one.
pub const FALLBACK_LANGUAGE: &str = "en";

fn parse<T: DeserializeOwned>(artifact: &RemoteArtifact) -> Result<T, MappingError> {
    serde_json::from_slice(artifact.bytes())
        .map_err(|e| MappingError::malformed(artifact.kind(), e.to_string()))
}

fn canonical(value: &impl Serialize) -> Result<Vec<u8>, MappingError> {
    Ok(CanonicalBytes::new(value)?.into_bytes())
}

fn require(kind: SourceKind, field: &str, value: &str) -> Result<(), MappingError> {
    if value.trim().is_empty() {
        return Err(MappingError::malformed(kind, format!("empty {field}")));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Value sets
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValueSet {
    value_set_id: String,
    value_set_date: String,
    value_set_values: BTreeMap<String, ValueSetValue>,
}

#[derive(Deserialize)]
struct ValueSetValue {
    display: BTreeMap<String, String>,
    #[serde(default)]
    active: bool,
    #[serde(default)]
    system: String,
    #[serde(default)]
    version: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ValueSetsExport<'a> {
    value_sets: Vec<ValueSetExport<'a>>,
}

#[derive(Serialize)]
struct ValueSetExport<'a> {
    id: &'a str,
    date: &'a str,
    items: Vec<ValueSetItem<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ValueSetItem<'a> {
    key: &'a str,
    display_text: &'a str,
    active: bool,
    system: &'a str,
    version: &'a str,
}

/// Encode the value sets with display texts in `language`, falling back to
/// English.
pub fn encode_value_sets(artifact: &RemoteArtifact, language: &str) -> Result<Vec<u8>, MappingError> {
    let kind = SourceKind::ValueSets;
    let sets: BTreeMap<String, ValueSet> = parse(artifact)?;

    let mut value_sets = Vec::with_capacity(sets.len());
    for set in sets.values() {
        require(kind, "valueSetId", &set.value_set_id)?;
        let mut items = Vec::with_capacity(set.value_set_values.len());
        for (code, value) in &set.value_set_values {
            let display_text = value
                .display
                .get(language)
                .or_else(|| value.display.get(FALLBACK_LANGUAGE))
                .ok_or_else(|| {
                    MappingError::malformed(
                        kind,
                        format!("no display text for {code} in {}", set.value_set_id),
                    )
                })?;
            items.push(ValueSetItem {
                key: code,
                display_text,
                active: value.active,
                system: &value.system,
                version: &value.version,
            });
        }
        value_sets.push(ValueSetExport {
            id: &set.value_set_id,
            date: &set.value_set_date,
            items,
        });
    }
    value_sets.sort_by(|a, b| a.id.cmp(b.id));

    canonical(&ValueSetsExport { value_sets })
}

// ---------------------------------------------------------------------------
// Business rules
// ---------------------------------------------------------------------------

#[derive(Deserialize, Serialize)]
struct BusinessRule {
    #[serde(rename = "Identifier")]
    identifier: String,
    #[serde(rename = "Type")]
    rule_type: String,
    #[serde(rename = "Country")]
    country: String,
    #[serde(rename = "Version")]
    version: String,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

fn encode_business_rules(artifact: &RemoteArtifact) -> Result<Vec<u8>, MappingError> {
    let kind = artifact.kind();
    let mut rules: Vec<BusinessRule> = parse(artifact)?;
    for rule in &rules {
        require(kind, "Identifier", &rule.identifier)?;
        require(kind, "Type", &rule.rule_type)?;
        require(kind, "Version", &rule.version)?;
        CountryCode::new(&rule.country)
            .map_err(|e| MappingError::malformed(kind, format!("rule {}: {e}", rule.identifier)))?;
    }
    rules.sort_by(|a, b| (&a.identifier, &a.version).cmp(&(&b.identifier, &b.version)));
    canonical(&rules)
}

/// Opaque ruleset: any array of objects, ordered by canonical form.
fn encode_opaque_rules(artifact: &RemoteArtifact) -> Result<Vec<u8>, MappingError> {
    let rules: Vec<Map<String, Value>> = parse(artifact)?;
    let mut encoded = rules
        .iter()
        .map(|rule| CanonicalBytes::new(rule).map(CanonicalBytes::into_bytes))
        .collect::<Result<Vec<_>, _>>()?;
    encoded.sort();

    let mut out = Vec::with_capacity(encoded.iter().map(Vec::len).sum::<usize>() + encoded.len() + 1);
    out.push(b'[');
    for (i, rule) in encoded.iter().enumerate() {
        if i > 0 {
            out.push(b',');
        }
        out.extend_from_slice(rule);
    }
    out.push(b']');
    Ok(out)
}

// ---------------------------------------------------------------------------
// Countries, validation services, signing certificates
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct CountryList {
    countries: BTreeSet<CountryCode>,
}

fn encode_onboarded_countries(artifact: &RemoteArtifact) -> Result<Vec<u8>, MappingError> {
    let raw: Vec<String> = parse(artifact)?;
    let countries = raw
        .iter()
        .map(|c| CountryCode::new(c))
        .collect::<Result<BTreeSet<_>, _>>()
        .map_err(|e| MappingError::malformed(artifact.kind(), e.to_string()))?;
    canonical(&CountryList { countries })
}

#[derive(Deserialize, Serialize)]
struct ValidationService {
    id: String,
    #[serde(rename = "type")]
    service_type: String,
    #[serde(rename = "serviceEndpoint")]
    service_endpoint: String,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

fn encode_validation_services(artifact: &RemoteArtifact) -> Result<Vec<u8>, MappingError> {
    let kind = artifact.kind();
    let mut services: Vec<ValidationService> = parse(artifact)?;
    for service in &services {
        require(kind, "id", &service.id)?;
        require(kind, "serviceEndpoint", &service.service_endpoint)?;
    }
    services.sort_by(|a, b| a.id.cmp(&b.id));
    canonical(&services)
}

#[derive(Deserialize, Serialize)]
struct TrustList {
    certificates: Vec<SigningCertificate>,
}

#[derive(Deserialize, Serialize)]
struct SigningCertificate {
    kid: String,
    country: String,
    #[serde(rename = "certificateType")]
    certificate_type: String,
    #[serde(rename = "rawData")]
    raw_data: String,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

/// Document signer certificate type; other trust list entries are dropped.
const DSC: &str = "DSC";

fn encode_signing_certificates(artifact: &RemoteArtifact) -> Result<Vec<u8>, MappingError> {
    let kind = artifact.kind();
    let list: TrustList = parse(artifact)?;
    let total = list.certificates.len();

    let mut certificates = Vec::with_capacity(total);
    for cert in list.certificates {
        require(kind, "kid", &cert.kid)?;
        require(kind, "rawData", &cert.raw_data)?;
        if cert.certificate_type == DSC {
            certificates.push(cert);
        }
    }
    if certificates.len() < total {
        tracing::debug!(
            dropped = total - certificates.len(),
            "Skipped trust list entries that are not document signer certificates"
        );
    }
    certificates.sort_by(|a, b| (&a.country, &a.kid).cmp(&(&b.country, &b.kid)));

    canonical(&TrustList { certificates })
}

/// Encode any non-value-set artifact according to its kind.
pub fn encode_category(artifact: &RemoteArtifact) -> Result<Vec<u8>, MappingError> {
    match artifact.kind() {
        SourceKind::OnboardedCountries => encode_onboarded_countries(artifact),
        SourceKind::AcceptanceRules | SourceKind::InvalidationRules => {
            encode_business_rules(artifact)
        }
        SourceKind::ValidationServices => encode_validation_services(artifact),
        SourceKind::DefaultRules => encode_opaque_rules(artifact),
        SourceKind::SigningCertificates => encode_signing_certificates(artifact),
        SourceKind::ValueSets => Err(MappingError::malformed(
            SourceKind::ValueSets,
            "value sets are encoded per language",
        )),
    }
}

/// Encode an index listing (dates or hours) as a canonical JSON array.
pub fn encode_index<T: Serialize>(entries: &[T]) -> Result<Vec<u8>, MappingError> {
    canonical(&entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn artifact(kind: SourceKind, value: Value) -> RemoteArtifact {
        RemoteArtifact::new(kind, value.to_string().into_bytes())
    }

    fn rule(id: &str, version: &str) -> Value {
        json!({"Identifier": id, "Type": "Acceptance", "Country": "DE", "Version": version, "Logic": {"and": [true]}})
    }

    #[test]
    fn value_sets_use_requested_language_with_fallback() {
        let body = json!({
            "b-set": {"valueSetId": "b-set", "valueSetDate": "2026-01-01", "valueSetValues": {
                "1": {"display": {"en": "One", "de": "Eins"}, "active": true, "system": "s", "version": "v"}
            }},
            "a-set": {"valueSetId": "a-set", "valueSetDate": "2026-01-01", "valueSetValues": {
                "2": {"display": {"en": "Two"}, "active": false}
            }}
        });
        let a = artifact(SourceKind::ValueSets, body);
        let de: Value = serde_json::from_slice(&encode_value_sets(&a, "de").unwrap()).unwrap();
        assert_eq!(de["valueSets"][0]["id"], "a-set");
        assert_eq!(de["valueSets"][0]["items"][0]["displayText"], "Two");
        assert_eq!(de["valueSets"][1]["items"][0]["displayText"], "Eins");
    }

    #[test]
    fn value_set_without_any_display_text_is_malformed() {
        let a = artifact(
            SourceKind::ValueSets,
            json!({"x": {"valueSetId": "x", "valueSetDate": "d", "valueSetValues": {"1": {"display": {"fr": "Un"}}}}}),
        );
        assert!(matches!(encode_value_sets(&a, "de"), Err(MappingError::Malformed { .. })));
    }

    #[test]
    fn rules_are_sorted_and_extra_fields_kept() {
        let a = artifact(
            SourceKind::AcceptanceRules,
            json!([rule("VR-DE-0002", "1.0.0"), rule("VR-DE-0001", "1.1.0"), rule("VR-DE-0001", "1.0.0")]),
        );
        let out: Value = serde_json::from_slice(&encode_category(&a).unwrap()).unwrap();
        let ids: Vec<(String, String)> = out
            .as_array()
            .unwrap()
            .iter()
            .map(|r| (r["Identifier"].as_str().unwrap().into(), r["Version"].as_str().unwrap().into()))
            .collect();
        assert_eq!(
            ids,
            vec![
                ("VR-DE-0001".into(), "1.0.0".into()),
                ("VR-DE-0001".into(), "1.1.0".into()),
                ("VR-DE-0002".into(), "1.0.0".into()),
            ]
        );
        assert_eq!(out[0]["Logic"], json!({"and": [true]}));
    }

    #[test]
    fn rule_without_identifier_is_malformed() {
        let a = artifact(
            SourceKind::InvalidationRules,
            json!([{"Type": "Invalidation", "Country": "DE", "Version": "1.0.0"}]),
        );
        assert!(matches!(encode_category(&a), Err(MappingError::Malformed { .. })));
    }

    #[test]
    fn rule_with_float_is_rejected_by_canonicalization() {
        let a = artifact(
            SourceKind::AcceptanceRules,
            json!([{"Identifier": "X", "Type": "Acceptance", "Country": "DE", "Version": "1", "Weight": 0.5}]),
        );
        assert!(matches!(encode_category(&a), Err(MappingError::Canonical(_))));
    }

    #[test]
    fn countries_are_normalized_and_deduplicated() {
        let a = artifact(SourceKind::OnboardedCountries, json!(["fr", "DE", "FR"]));
        assert_eq!(encode_category(&a).unwrap(), br#"{"countries":["DE","FR"]}"#.to_vec());

        let bad = artifact(SourceKind::OnboardedCountries, json!(["Germany"]));
        assert!(encode_category(&bad).is_err());
    }

    #[test]
    fn opaque_rules_are_order_independent() {
        let a = artifact(SourceKind::DefaultRules, json!([{"b": 1}, {"a": 2}]));
        let b = artifact(SourceKind::DefaultRules, json!([{"a": 2}, {"b": 1}]));
        let encoded = encode_category(&a).unwrap();
        assert_eq!(encoded, encode_category(&b).unwrap());
        assert_eq!(encoded, br#"[{"a":2},{"b":1}]"#.to_vec());
    }

    #[test]
    fn only_document_signer_certificates_are_published() {
        let a = artifact(
            SourceKind::SigningCertificates,
            json!({"certificates": [
                {"kid": "k2", "country": "FR", "certificateType": "DSC", "rawData": "AA=="},
                {"kid": "k1", "country": "DE", "certificateType": "DSC", "rawData": "AQ=="},
                {"kid": "k3", "country": "DE", "certificateType": "CSCA", "rawData": "Ag=="}
            ]}),
        );
        let out: Value = serde_json::from_slice(&encode_category(&a).unwrap()).unwrap();
        let kids: Vec<&str> = out["certificates"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["kid"].as_str().unwrap())
            .collect();
        assert_eq!(kids, vec!["k1", "k2"]);
    }

    #[test]
    fn validation_services_need_endpoint() {
        let a = artifact(
            SourceKind::ValidationServices,
            json!([{"id": "svc", "type": "ValidationService", "serviceEndpoint": ""}]),
        );
        assert!(encode_category(&a).is_err());
    }

    #[test]
    fn index_is_a_json_array() {
        assert_eq!(encode_index(&["2026-10-16", "2026-10-17"]).unwrap(), br#"["2026-10-16","2026-10-17"]"#.to_vec());
        assert_eq!(encode_index::<u32>(&[]).unwrap(), b"[]".to_vec());
    }
}
