//! # Identity Newtypes
//!
//! Newtype wrappers for the identifiers a diagnosis key carries. Both are
//! validated at construction so downstream code never re-checks them.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::EnxError;

/// Length of a temporary exposure key in bytes.
pub const KEY_DATA_LENGTH: usize = 16;

/// The opaque 16-byte temporary exposure key. Identity of a diagnosis key.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyData(Vec<u8>);

impl KeyData {
    /// Wrap raw key bytes, rejecting anything that is not exactly
    /// [`KEY_DATA_LENGTH`] bytes long.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, EnxError> {
        let bytes = bytes.into();
        if bytes.len() != KEY_DATA_LENGTH {
            return Err(EnxError::InvalidArgument(format!(
                "key data must be {KEY_DATA_LENGTH} bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self(bytes))
    }

    /// Return the raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Render the key as lowercase hex.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

// Key material stays out of logs.
impl std::fmt::Debug for KeyData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyData({}...)", &self.to_hex()[..8])
    }
}

impl Serialize for KeyData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for KeyData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        if !hex.is_ascii() || hex.len() % 2 != 0 {
            return Err(serde::de::Error::custom("key data must be even-length ASCII hex"));
        }
        let bytes = (0..hex.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&hex[i..i + 2], 16))
            .collect::<Result<Vec<u8>, _>>()
            .map_err(serde::de::Error::custom)?;
        Self::new(bytes).map_err(serde::de::Error::custom)
    }
}

/// ISO 3166-1 alpha-2 country code, normalized to upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CountryCode(String);

impl CountryCode {
    /// Validate and normalize a two-letter country code.
    pub fn new(code: &str) -> Result<Self, EnxError> {
        let code = code.trim().to_ascii_uppercase();
        if code.len() != 2 || !code.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(EnxError::InvalidArgument(format!(
                "country code must be two ASCII letters, got {code:?}"
            )));
        }
        Ok(Self(code))
    }

    /// The default origin country of submissions.
    pub(crate) fn germany() -> Self {
        Self("DE".to_string())
    }

    /// Access the normalized code.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CountryCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for CountryCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::new(&raw).map_err(serde::de::Error::custom)
    }
}
