//! # Cryptographic Error Types

use thiserror::Error;

/// Errors from cryptographic operations.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Ed25519 signature verification failed.
    #[error("Ed25519 verification failed: {0}")]
    VerificationFailed(String),

    /// Key material is missing, malformed, or unusable.
    #[error("key error: {0}")]
    KeyError(String),

    /// Hex decoding error.
    #[error("hex decode error: {0}")]
    HexDecode(String),

    /// The signing backend could not produce a signature.
    #[error("signing unavailable: {0}")]
    SigningUnavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_context() {
        assert!(CryptoError::KeyError("missing seed".into())
            .to_string()
            .contains("missing seed"));
        assert!(CryptoError::SigningUnavailable("hsm offline".into())
            .to_string()
            .starts_with("signing unavailable"));
    }
}
