//! # Crypto Provider Abstraction
//!
//! The packaging engine never touches key material directly. It holds an
//! `Arc<dyn CryptoProvider>` and asks it to sign archive payloads.
//!
//! - [`LocalCryptoProvider`]: in-memory key for development and tests.
//! - [`EnvCryptoProvider`]: hex-encoded 32-byte seed injected through an
//!   environment variable, the usual shape for container deployments.

use crate::ed25519::{Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
use crate::error::CryptoError;

/// Signing capability used by the distribution signing decorator.
///
/// Implementations must be `Send + Sync`; archive preparation may run on any
/// worker thread.
pub trait CryptoProvider: Send + Sync {
    /// Sign the exact payload bytes.
    fn sign(&self, payload: &[u8]) -> Result<Ed25519Signature, CryptoError>;

    /// The public half of the signing key.
    fn public_key(&self) -> Result<Ed25519PublicKey, CryptoError>;

    /// Identifier written into signature artifacts: the SHA-256 fingerprint
    /// of the public key.
    fn key_id(&self) -> Result<String, CryptoError> {
        Ok(self.public_key()?.fingerprint())
    }

    /// Human-readable name for diagnostics.
    fn provider_name(&self) -> &str;
}

// ─── LocalCryptoProvider ────────────────────────────────────────────────

/// In-memory Ed25519 key provider.
#[derive(Debug)]
pub struct LocalCryptoProvider {
    key: Ed25519KeyPair,
}

impl LocalCryptoProvider {
    /// Wrap an existing key pair.
    pub fn new(key: Ed25519KeyPair) -> Self {
        Self { key }
    }

    /// Generate a new random key.
    pub fn generate() -> Self {
        Self::new(Ed25519KeyPair::generate())
    }

    /// Create from a raw 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self::new(Ed25519KeyPair::from_seed(seed))
    }
}

impl CryptoProvider for LocalCryptoProvider {
    fn sign(&self, payload: &[u8]) -> Result<Ed25519Signature, CryptoError> {
        Ok(self.key.sign(payload))
    }

    fn public_key(&self) -> Result<Ed25519PublicKey, CryptoError> {
        Ok(self.key.public_key())
    }

    fn provider_name(&self) -> &str {
        "LocalCryptoProvider"
    }
}

// ─── EnvCryptoProvider ──────────────────────────────────────────────────

/// Loads an Ed25519 signing key from an environment variable.
///
/// ```bash
/// export ENX_SIGNING_KEY="9d61b19d..."  # 64 hex chars
/// ```
#[derive(Debug)]
pub struct EnvCryptoProvider {
    key: Ed25519KeyPair,
    var_name: String,
}

impl EnvCryptoProvider {
    /// Default environment variable holding the signing seed.
    pub const DEFAULT_VAR: &'static str = "ENX_SIGNING_KEY";

    /// Load the signing key from the named environment variable.
    ///
    /// # Errors
    ///
    /// `CryptoError::KeyError` if the variable is unset, or the hex/length
    /// error from parsing the seed.
    pub fn from_env(var_name: &str) -> Result<Self, CryptoError> {
        let hex = std::env::var(var_name)
            .map_err(|_| CryptoError::KeyError(format!("environment variable {var_name} not set")))?;
        let key = Ed25519KeyPair::from_seed_hex(&hex)?;
        tracing::debug!(var = var_name, key_id = %key.public_key().fingerprint(), "loaded signing key");
        Ok(Self {
            key,
            var_name: var_name.to_string(),
        })
    }

    /// Return the environment variable name this provider was loaded from.
    pub fn var_name(&self) -> &str {
        &self.var_name
    }
}

impl CryptoProvider for EnvCryptoProvider {
    fn sign(&self, payload: &[u8]) -> Result<Ed25519Signature, CryptoError> {
        Ok(self.key.sign(payload))
    }

    fn public_key(&self) -> Result<Ed25519PublicKey, CryptoError> {
        Ok(self.key.public_key())
    }

    fn provider_name(&self) -> &str {
        "EnvCryptoProvider"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ed25519::verify;

    #[test]
    fn local_provider_sign_and_verify() {
        let provider = LocalCryptoProvider::generate();
        let sig = provider.sign(b"archive").unwrap();
        verify(b"archive", &sig, &provider.public_key().unwrap()).unwrap();
    }

    #[test]
    fn key_id_is_public_key_fingerprint() {
        let provider = LocalCryptoProvider::from_seed(&[1u8; 32]);
        let pk = provider.public_key().unwrap();
        assert_eq!(provider.key_id().unwrap(), pk.fingerprint());
        assert_eq!(provider.provider_name(), "LocalCryptoProvider");
    }

    #[test]
    fn env_provider_loads_seed() {
        let seed = Ed25519KeyPair::from_seed(&[9u8; 32]).seed_hex();
        std::env::set_var("ENX_TEST_SIGNING_KEY_OK", &seed);
        let provider = EnvCryptoProvider::from_env("ENX_TEST_SIGNING_KEY_OK").unwrap();
        std::env::remove_var("ENX_TEST_SIGNING_KEY_OK");
        assert_eq!(
            provider.public_key().unwrap(),
            LocalCryptoProvider::from_seed(&[9u8; 32]).public_key().unwrap()
        );
        assert_eq!(provider.var_name(), "ENX_TEST_SIGNING_KEY_OK");
    }

    #[test]
    fn env_provider_missing_variable() {
        let err = EnvCryptoProvider::from_env("ENX_TEST_SIGNING_KEY_ABSENT").unwrap_err();
        assert!(matches!(err, CryptoError::KeyError(_)));
    }

    #[test]
    fn env_provider_rejects_bad_hex() {
        std::env::set_var("ENX_TEST_SIGNING_KEY_BAD", "xyz");
        let result = EnvCryptoProvider::from_env("ENX_TEST_SIGNING_KEY_BAD");
        std::env::remove_var("ENX_TEST_SIGNING_KEY_BAD");
        assert!(result.is_err());
    }
}
