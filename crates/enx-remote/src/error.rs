//! Remote source error types.

use crate::config::ConfigError;
use crate::source::SourceKind;

/// Errors from fetching a remote artifact.
///
/// The display strings of the two trust failures are stable; operators grep
/// for them.
#[derive(Debug, thiserror::Error)]
pub enum RemoteSourceError {
    /// The allow list could not be obtained or verified, or a response was
    /// signed by a key that is not allow-listed.
    #[error("Obtaining service provider allow list failed")]
    InvalidFingerprint { reason: String },

    /// The response body is not JSON of the expected shape.
    #[error("Obtaining providers from content response failed")]
    InvalidContentResponse { kind: SourceKind, reason: String },

    /// HTTP transport error (connection refused, timeout, reset).
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },

    /// The provider returned a non-2xx status.
    #[error("remote source {endpoint} returned {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// No source is configured for this kind.
    #[error("no remote source configured for {0}")]
    NotConfigured(SourceKind),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl RemoteSourceError {
    pub(crate) fn fingerprint(reason: impl Into<String>) -> Self {
        Self::InvalidFingerprint {
            reason: reason.into(),
        }
    }

    pub(crate) fn content(kind: SourceKind, reason: impl Into<String>) -> Self {
        Self::InvalidContentResponse {
            kind,
            reason: reason.into(),
        }
    }

    /// Detail behind the stable display message, for structured logs.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::InvalidFingerprint { reason } | Self::InvalidContentResponse { reason, .. } => {
                Some(reason)
            }
            _ => None,
        }
    }
}
