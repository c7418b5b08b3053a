//! # enx-crypto: Cryptographic Primitives
//!
//! - **Ed25519** signing of distribution archives and verification of
//!   upstream content signatures.
//! - **SHA-256** fingerprints identifying public keys (the key id written
//!   into every signature artifact, and the allow-list entries of remote
//!   providers).
//! - **[`CryptoProvider`]**: the signing capability handed to the packaging
//!   engine. Backends: an in-memory key and a key loaded from the
//!   environment.
//!
//! ## Crate Policy
//!
//! - No internal dependencies.
//! - No mocking of cryptographic operations in tests: real SHA-256, real
//!   Ed25519.
//! - Private keys are never serialized or logged.

pub mod ed25519;
pub mod error;
pub mod provider;
pub mod sha256;

pub use ed25519::{verify, Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
pub use error::CryptoError;
pub use provider::{CryptoProvider, EnvCryptoProvider, LocalCryptoProvider};
pub use sha256::{sha256, sha256_hex};
