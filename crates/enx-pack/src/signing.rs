//! # Signing Decorator
//!
//! [`SignedArchive`] wraps an [`Archive`] and materializes as a directory
//! holding exactly two files:
//!
//! - `export.bin`: the wrapped payload, unchanged.
//! - `export.sig`: a `TEKSignatureList` protobuf whose single signature
//!   covers the exact bytes of `export.bin`.
//!
//! Ed25519 is deterministic, so the same payload and key always produce the
//! same `export.sig`.

use std::sync::Arc;

use enx_crypto::{CryptoError, CryptoProvider};
use prost::Message;

use crate::mapping::proto::{SignatureInfo, TekSignature, TekSignatureList};
use crate::tree::Archive;

/// File name of the signed payload.
pub const EXPORT_BINARY: &str = "export.bin";

/// File name of the signature list.
pub const EXPORT_SIGNATURE: &str = "export.sig";

/// ASN.1 object identifier of Ed25519.
pub const ED25519_ALGORITHM_OID: &str = "1.3.101.112";

/// Version label written into signature infos.
pub const VERIFICATION_KEY_VERSION: &str = "v1";

/// An archive published together with its signature.
pub struct SignedArchive {
    archive: Archive,
    crypto: Arc<dyn CryptoProvider>,
}

impl SignedArchive {
    pub fn new(archive: Archive, crypto: Arc<dyn CryptoProvider>) -> Self {
        Self { archive, crypto }
    }

    /// The name of the wrapped archive, used as the directory name.
    pub fn name(&self) -> &str {
        self.archive.name()
    }

    pub fn archive(&self) -> &Archive {
        &self.archive
    }

    /// Names of the visible children, in write order.
    pub fn artifact_names(&self) -> [&'static str; 2] {
        [EXPORT_BINARY, EXPORT_SIGNATURE]
    }

    /// Sign the payload and encode the signature list.
    pub fn signature_file(&self) -> Result<Vec<u8>, CryptoError> {
        let signature = self.crypto.sign(self.archive.payload())?;
        let list = TekSignatureList {
            signatures: vec![TekSignature {
                signature_info: Some(signature_info(self.crypto.as_ref())?),
                batch_num: Some(1),
                batch_size: Some(1),
                signature: Some(signature.as_bytes().to_vec()),
            }],
        };
        Ok(list.encode_to_vec())
    }
}

/// Signature info naming the provider's key and the Ed25519 OID.
pub fn signature_info(crypto: &dyn CryptoProvider) -> Result<SignatureInfo, CryptoError> {
    Ok(SignatureInfo {
        verification_key_version: Some(VERIFICATION_KEY_VERSION.to_string()),
        verification_key_id: Some(crypto.key_id()?),
        signature_algorithm: Some(ED25519_ALGORITHM_OID.to_string()),
    })
}

impl std::fmt::Debug for SignedArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignedArchive")
            .field("archive", &self.archive.name())
            .field("provider", &self.crypto.provider_name())
            .finish()
    }
}
