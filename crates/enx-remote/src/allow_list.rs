//! Service-provider allow list.
//!
//! The allow list names the providers whose content may be published, each
//! by the SHA-256 fingerprint of its Ed25519 signing key. It is itself
//! signed by the trust anchor; an unverifiable list is never used.

use enx_crypto::{verify, Ed25519PublicKey, Ed25519Signature};
use serde::{Deserialize, Serialize};

use crate::error::RemoteSourceError;

/// One trusted provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowedProvider {
    pub service_provider: String,
    /// Lowercase hex SHA-256 of the provider's raw public key.
    pub fingerprint256: String,
}

/// The verified allow list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceProviderAllowList {
    pub certificates: Vec<AllowedProvider>,
}

impl ServiceProviderAllowList {
    /// Verify `signature_hex` over `body` with the trust anchor, then parse.
    ///
    /// Every failure maps to `InvalidFingerprint`.
    pub fn parse_verified(
        body: &[u8],
        signature_hex: Option<&str>,
        trust_anchor: &Ed25519PublicKey,
    ) -> Result<Self, RemoteSourceError> {
        let signature_hex = signature_hex
            .ok_or_else(|| RemoteSourceError::fingerprint("allow list is not signed"))?;
        let signature = Ed25519Signature::from_hex(signature_hex)
            .map_err(|e| RemoteSourceError::fingerprint(format!("allow list signature: {e}")))?;
        verify(body, &signature, trust_anchor)
            .map_err(|e| RemoteSourceError::fingerprint(format!("allow list signature: {e}")))?;
        serde_json::from_slice(body)
            .map_err(|e| RemoteSourceError::fingerprint(format!("allow list body: {e}")))
    }

    /// Whether `fingerprint` (hex, any case) belongs to an allowed provider.
    pub fn contains(&self, fingerprint: &str) -> bool {
        self.certificates
            .iter()
            .any(|p| p.fingerprint256.eq_ignore_ascii_case(fingerprint))
    }

    /// Check that `signing_key_hex` is allow-listed and that `signature_hex`
    /// verifies over `body` with it.
    pub fn verify_content(
        &self,
        body: &[u8],
        signing_key_hex: Option<&str>,
        signature_hex: Option<&str>,
    ) -> Result<(), RemoteSourceError> {
        let key_hex = signing_key_hex
            .ok_or_else(|| RemoteSourceError::fingerprint("response names no signing key"))?;
        let key = Ed25519PublicKey::from_hex(key_hex)
            .map_err(|e| RemoteSourceError::fingerprint(format!("signing key: {e}")))?;
        let fingerprint = key.fingerprint();
        if !self.contains(&fingerprint) {
            return Err(RemoteSourceError::fingerprint(format!(
                "signing key {fingerprint} is not allow-listed"
            )));
        }
        let signature = signature_hex
            .ok_or_else(|| RemoteSourceError::fingerprint("response is not signed"))
            .and_then(|hex| {
                Ed25519Signature::from_hex(hex)
                    .map_err(|e| RemoteSourceError::fingerprint(format!("signature: {e}")))
            })?;
        verify(body, &signature, &key)
            .map_err(|e| RemoteSourceError::fingerprint(format!("content signature: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use enx_crypto::Ed25519KeyPair;

    fn list_for(provider: &Ed25519KeyPair) -> ServiceProviderAllowList {
        ServiceProviderAllowList {
            certificates: vec![AllowedProvider {
                service_provider: "rules-provider".into(),
                fingerprint256: provider.public_key().fingerprint(),
            }],
        }
    }

    #[test]
    fn signed_list_parses() {
        let anchor = Ed25519KeyPair::from_seed(&[1; 32]);
        let provider = Ed25519KeyPair::from_seed(&[2; 32]);
        let body = serde_json::to_vec(&list_for(&provider)).unwrap();
        let sig = anchor.sign(&body).to_hex();

        let list =
            ServiceProviderAllowList::parse_verified(&body, Some(&sig), &anchor.public_key())
                .unwrap();
        assert!(list.contains(&provider.public_key().fingerprint().to_uppercase()));
    }

    #[test]
    fn list_signed_by_other_key_is_rejected() {
        let anchor = Ed25519KeyPair::from_seed(&[1; 32]);
        let impostor = Ed25519KeyPair::from_seed(&[3; 32]);
        let body = serde_json::to_vec(&ServiceProviderAllowList::default()).unwrap();
        let sig = impostor.sign(&body).to_hex();

        let err = ServiceProviderAllowList::parse_verified(&body, Some(&sig), &anchor.public_key())
            .unwrap_err();
        assert!(matches!(err, RemoteSourceError::InvalidFingerprint { .. }));
        assert!(
            ServiceProviderAllowList::parse_verified(&body, None, &anchor.public_key()).is_err()
        );
    }

    #[test]
    fn content_from_unlisted_key_is_rejected() {
        let provider = Ed25519KeyPair::from_seed(&[2; 32]);
        let stranger = Ed25519KeyPair::from_seed(&[4; 32]);
        let list = list_for(&provider);
        let body = b"[]";

        let ok = list.verify_content(
            body,
            Some(&provider.public_key().to_hex()),
            Some(&provider.sign(body).to_hex()),
        );
        assert!(ok.is_ok());

        let err = list
            .verify_content(
                body,
                Some(&stranger.public_key().to_hex()),
                Some(&stranger.sign(body).to_hex()),
            )
            .unwrap_err();
        assert!(matches!(err, RemoteSourceError::InvalidFingerprint { .. }));
    }

    #[test]
    fn content_with_bad_signature_is_rejected() {
        let provider = Ed25519KeyPair::from_seed(&[2; 32]);
        let list = list_for(&provider);
        let err = list
            .verify_content(
                b"[1]",
                Some(&provider.public_key().to_hex()),
                Some(&provider.sign(b"[2]").to_hex()),
            )
            .unwrap_err();
        assert!(matches!(err, RemoteSourceError::InvalidFingerprint { .. }));
        assert!(list
            .verify_content(b"[]", Some(&provider.public_key().to_hex()), None)
            .is_err());
    }
}
