//! # enx-remote: Remote Source Client
//!
//! Certificates, value sets and business rules published in the
//! distribution bundle come from external providers. This crate fetches them
//! and decides whether a response can be trusted.
//!
//! ## Trust model
//!
//! 1. The service-provider allow list is fetched once per client and its
//!    detached Ed25519 signature is checked against a configured trust
//!    anchor.
//! 2. Every content response must name its signing key (`x-signing-key`),
//!    whose SHA-256 fingerprint must be on the allow list, and carry a
//!    signature over the body (`x-signature`).
//! 3. The body must be JSON of the top-level shape expected for its
//!    [`SourceKind`].
//!
//! Failures of (1) and (2) are [`RemoteSourceError::InvalidFingerprint`];
//! failures of (3) are [`RemoteSourceError::InvalidContentResponse`]. Only
//! transport errors are retried.

pub mod allow_list;
pub mod config;
pub mod error;
pub mod fake;
pub mod http;
pub mod retry;
pub mod source;

pub use allow_list::{AllowedProvider, ServiceProviderAllowList};
pub use config::{ConfigError, RemoteSourceConfig, SourcePaths};
pub use error::RemoteSourceError;
pub use fake::{FixtureFailure, StaticRemoteSourceClient};
pub use http::HttpRemoteSourceClient;
pub use retry::RetryPolicy;
pub use source::{ContentShape, RemoteArtifact, RemoteSourceClient, SourceKind};

/// Response header carrying the hex Ed25519 public key that signed the body.
pub const SIGNING_KEY_HEADER: &str = "x-signing-key";

/// Response header carrying the hex Ed25519 signature over the body.
pub const SIGNATURE_HEADER: &str = "x-signature";
