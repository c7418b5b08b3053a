//! HTTP remote source client (reqwest).

use std::time::Duration;

use enx_crypto::Ed25519PublicKey;
use reqwest::header::HeaderMap;
use tokio::sync::OnceCell;
use url::Url;

use crate::allow_list::ServiceProviderAllowList;
use crate::config::{ConfigError, RemoteSourceConfig};
use crate::error::RemoteSourceError;
use crate::retry::{retry_send, RetryPolicy};
use crate::source::{RemoteArtifact, RemoteSourceClient, SourceKind};
use crate::{SIGNATURE_HEADER, SIGNING_KEY_HEADER};

/// Fetches artifacts over HTTP and validates them against the allow list.
///
/// The allow list is loaded lazily on the first fetch and cached for the
/// lifetime of the client. A failed load is not cached.
#[derive(Debug)]
pub struct HttpRemoteSourceClient {
    http: reqwest::Client,
    config: RemoteSourceConfig,
    trust_anchor: Ed25519PublicKey,
    allow_list_url: Url,
    retry: RetryPolicy,
    allow_list: OnceCell<ServiceProviderAllowList>,
}

/// A successful response with the headers needed for verification.
struct SignedBody {
    signing_key: Option<String>,
    signature: Option<String>,
    body: Vec<u8>,
}

impl HttpRemoteSourceClient {
    /// Build a client from configuration.
    ///
    /// # Errors
    ///
    /// `ConfigError` if the trust anchor or a URL is invalid, or the
    /// underlying HTTP client cannot be built.
    pub fn new(config: RemoteSourceConfig) -> Result<Self, ConfigError> {
        let trust_anchor = Ed25519PublicKey::from_hex(&config.trust_anchor)
            .map_err(|e| ConfigError::InvalidTrustAnchor(e.to_string()))?;
        let allow_list_url = config.allow_list_url()?;
        // Surface bad content URLs at construction, not mid-run.
        for kind in SourceKind::ALL {
            config.url_for(kind)?;
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            http,
            retry: RetryPolicy::new(
                config.max_retries,
                Duration::from_millis(config.retry_base_delay_ms),
            ),
            config,
            trust_anchor,
            allow_list_url,
            allow_list: OnceCell::new(),
        })
    }

    /// The cached allow list, loading and verifying it on first use.
    pub async fn allow_list(&self) -> Result<&ServiceProviderAllowList, RemoteSourceError> {
        self.allow_list
            .get_or_try_init(|| async {
                let response = self.get(&self.allow_list_url).await.map_err(|e| {
                    tracing::warn!(error = %e, "Allow list request failed");
                    RemoteSourceError::fingerprint(format!("allow list request: {e}"))
                })?;
                let list = ServiceProviderAllowList::parse_verified(
                    &response.body,
                    response.signature.as_deref(),
                    &self.trust_anchor,
                )?;
                tracing::info!(providers = list.certificates.len(), "Loaded service provider allow list");
                Ok(list)
            })
            .await
    }

    async fn get(&self, url: &Url) -> Result<SignedBody, RemoteSourceError> {
        let endpoint = url.as_str();
        let resp = retry_send(self.retry, endpoint, || self.http.get(url.clone()).send())
            .await
            .map_err(|source| RemoteSourceError::Http {
                endpoint: endpoint.to_string(),
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RemoteSourceError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let headers = resp.headers().clone();
        let body = resp
            .bytes()
            .await
            .map_err(|source| RemoteSourceError::Http {
                endpoint: endpoint.to_string(),
                source,
            })?
            .to_vec();

        Ok(SignedBody {
            signing_key: header_value(&headers, SIGNING_KEY_HEADER),
            signature: header_value(&headers, SIGNATURE_HEADER),
            body,
        })
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
}

impl RemoteSourceClient for HttpRemoteSourceClient {
    async fn fetch(&self, kind: SourceKind) -> Result<RemoteArtifact, RemoteSourceError> {
        let allow_list = self.allow_list().await?;
        let url = self.config.url_for(kind)?;

        tracing::debug!(%kind, url = %url, "Fetching remote artifact");
        let response = self.get(&url).await?;

        allow_list.verify_content(
            &response.body,
            response.signing_key.as_deref(),
            response.signature.as_deref(),
        )?;
        kind.validate_content(&response.body)?;

        tracing::debug!(%kind, bytes = response.body.len(), "Fetched remote artifact");
        Ok(RemoteArtifact::new(kind, response.body))
    }
}
