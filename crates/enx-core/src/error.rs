//! # Error Types
//!
//! Errors shared by every crate in the workspace. Crate-specific failures
//! (store, remote fetch, signing, tree structure) live next to the code that
//! raises them and wrap these where needed.

use thiserror::Error;

/// Top-level error type for domain-level contract violations.
#[derive(Error, Debug)]
pub enum EnxError {
    /// A caller violated an argument contract (negative day offsets,
    /// malformed key data, unknown enum names). Never retried.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Canonicalization failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    #[error("float values are not permitted in canonical representations: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}
