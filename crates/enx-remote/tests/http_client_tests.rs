//! # Integration Tests for the HTTP Remote Source Client
//!
//! Runs `HttpRemoteSourceClient` against wiremock servers with real Ed25519
//! keys: a trust anchor signing the allow list and a provider key signing
//! content.

use enx_crypto::Ed25519KeyPair;
use enx_remote::{
    AllowedProvider, HttpRemoteSourceClient, RemoteSourceClient, RemoteSourceConfig,
    RemoteSourceError, ServiceProviderAllowList, SourceKind, SIGNATURE_HEADER, SIGNING_KEY_HEADER,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Keys {
    anchor: Ed25519KeyPair,
    provider: Ed25519KeyPair,
}

fn keys() -> Keys {
    Keys {
        anchor: Ed25519KeyPair::from_seed(&[11; 32]),
        provider: Ed25519KeyPair::from_seed(&[22; 32]),
    }
}

async fn mount_allow_list(server: &MockServer, keys: &Keys) {
    let list = ServiceProviderAllowList {
        certificates: vec![AllowedProvider {
            service_provider: "rules.example.org".into(),
            fingerprint256: keys.provider.public_key().fingerprint(),
        }],
    };
    let body = serde_json::to_vec(&list).unwrap();
    let signature = keys.anchor.sign(&body).to_hex();
    Mock::given(method("GET"))
        .and(path("/allowlist"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header(SIGNATURE_HEADER, signature.as_str())
                .set_body_bytes(body),
        )
        .mount(server)
        .await;
}

fn signed(signer: &Ed25519KeyPair, body: &[u8]) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header(SIGNING_KEY_HEADER, signer.public_key().to_hex().as_str())
        .insert_header(SIGNATURE_HEADER, signer.sign(body).to_hex().as_str())
        .set_body_bytes(body.to_vec())
}

fn client(server: &MockServer, keys: &Keys) -> HttpRemoteSourceClient {
    let config = RemoteSourceConfig::local_mock(&server.uri(), &keys.anchor.public_key().to_hex());
    HttpRemoteSourceClient::new(config).expect("client build")
}

#[tokio::test]
async fn fetches_signed_content_from_allow_listed_provider() {
    let server = MockServer::start().await;
    let keys = keys();
    mount_allow_list(&server, &keys).await;

    let body = br#"[{"Identifier":"VR-DE-0001","Type":"Acceptance","Country":"DE","Version":"1.0.0"}]"#;
    Mock::given(method("GET"))
        .and(path("/rules/acceptance"))
        .respond_with(signed(&keys.provider, body))
        .expect(1)
        .mount(&server)
        .await;

    let artifact = client(&server, &keys)
        .fetch(SourceKind::AcceptanceRules)
        .await
        .expect("fetch");
    assert_eq!(artifact.kind(), SourceKind::AcceptanceRules);
    assert_eq!(artifact.bytes(), body);
}

#[tokio::test]
async fn allow_list_is_fetched_once() {
    let server = MockServer::start().await;
    let keys = keys();

    let list = ServiceProviderAllowList {
        certificates: vec![AllowedProvider {
            service_provider: "rules.example.org".into(),
            fingerprint256: keys.provider.public_key().fingerprint(),
        }],
    };
    let list_body = serde_json::to_vec(&list).unwrap();
    Mock::given(method("GET"))
        .and(path("/allowlist"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header(SIGNATURE_HEADER, keys.anchor.sign(&list_body).to_hex().as_str())
                .set_body_bytes(list_body),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/countrylist"))
        .respond_with(signed(&keys.provider, br#"["DE","FR"]"#))
        .mount(&server)
        .await;

    let client = client(&server, &keys);
    client.fetch(SourceKind::OnboardedCountries).await.unwrap();
    client.fetch(SourceKind::OnboardedCountries).await.unwrap();
}

#[tokio::test]
async fn allow_list_signed_by_wrong_anchor_fails() {
    let server = MockServer::start().await;
    let keys = keys();
    let impostor = Keys {
        anchor: Ed25519KeyPair::from_seed(&[99; 32]),
        provider: Ed25519KeyPair::from_seed(&[22; 32]),
    };
    mount_allow_list(&server, &impostor).await;

    let err = client(&server, &keys)
        .fetch(SourceKind::ValueSets)
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteSourceError::InvalidFingerprint { .. }));
    assert_eq!(err.to_string(), "Obtaining service provider allow list failed");
}

#[tokio::test]
async fn unreachable_allow_list_is_a_fingerprint_failure() {
    let server = MockServer::start().await;
    let keys = keys();
    Mock::given(method("GET"))
        .and(path("/allowlist"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client(&server, &keys)
        .fetch(SourceKind::ValueSets)
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteSourceError::InvalidFingerprint { .. }));
}

#[tokio::test]
async fn content_signed_by_unlisted_key_fails() {
    let server = MockServer::start().await;
    let keys = keys();
    mount_allow_list(&server, &keys).await;

    let stranger = Ed25519KeyPair::from_seed(&[33; 32]);
    Mock::given(method("GET"))
        .and(path("/rules/invalidation"))
        .respond_with(signed(&stranger, b"[]"))
        .mount(&server)
        .await;

    let err = client(&server, &keys)
        .fetch(SourceKind::InvalidationRules)
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteSourceError::InvalidFingerprint { .. }));
}

#[tokio::test]
async fn wrongly_shaped_content_fails() {
    let server = MockServer::start().await;
    let keys = keys();
    mount_allow_list(&server, &keys).await;

    Mock::given(method("GET"))
        .and(path("/validation-services"))
        .respond_with(signed(&keys.provider, br#"{"not":"an array"}"#))
        .mount(&server)
        .await;

    let err = client(&server, &keys)
        .fetch(SourceKind::ValidationServices)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RemoteSourceError::InvalidContentResponse {
            kind: SourceKind::ValidationServices,
            ..
        }
    ));
    assert_eq!(err.to_string(), "Obtaining providers from content response failed");
}

#[tokio::test]
async fn non_success_status_is_not_retried() {
    let server = MockServer::start().await;
    let keys = keys();
    mount_allow_list(&server, &keys).await;

    Mock::given(method("GET"))
        .and(path("/trustList/DSC"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server, &keys)
        .fetch(SourceKind::SigningCertificates)
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteSourceError::Status { status: 500, .. }));
}
