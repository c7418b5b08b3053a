//! # Packaging Errors

use enx_core::CanonicalizationError;
use enx_crypto::CryptoError;
use enx_remote::SourceKind;
use enx_store::StoreError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors building, preparing or materializing a tree.
#[derive(Error, Debug)]
pub enum TreeError {
    /// Two siblings share a name.
    #[error("directory {directory:?} already contains a node named {name:?}")]
    DuplicateName { directory: String, name: String },

    /// A node name is empty, a relative path component, or contains a
    /// separator.
    #[error("invalid node name {0:?}")]
    InvalidName(String),

    /// Computing a signature failed during preparation.
    #[error("signing {path} failed: {source}")]
    Signing {
        path: String,
        #[source]
        source: CryptoError,
    },

    /// The sink rejected a write.
    #[error("writing {path} failed: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// A fetched artifact could not be turned into archive bytes.
#[derive(Error, Debug)]
pub enum MappingError {
    #[error("malformed {kind} content: {reason}")]
    Malformed { kind: SourceKind, reason: String },

    #[error("canonical encoding failed: {0}")]
    Canonical(#[from] CanonicalizationError),
}

impl MappingError {
    pub(crate) fn malformed(kind: SourceKind, reason: impl Into<String>) -> Self {
        Self::Malformed {
            kind,
            reason: reason.into(),
        }
    }
}

/// Errors that abort an assembly run.
#[derive(Error, Debug)]
pub enum AssemblyError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("key store failure: {0}")]
    Store(#[from] StoreError),

    #[error("signing failure: {0}")]
    Signing(#[source] CryptoError),

    #[error("structure conflict: {0}")]
    Structure(#[source] TreeError),

    #[error("writing output failed: {0}")]
    Output(#[source] TreeError),

    #[error("encoding failed: {0}")]
    Mapping(#[from] MappingError),

    #[error("category {kind} failed and is configured as fatal: {reason}")]
    FatalCategory { kind: SourceKind, reason: String },

    #[error("fetch task failed: {0}")]
    Task(String),
}

impl From<TreeError> for AssemblyError {
    fn from(err: TreeError) -> Self {
        match err {
            TreeError::Signing { source, .. } => Self::Signing(source),
            TreeError::Io { .. } => Self::Output(err),
            TreeError::DuplicateName { .. } | TreeError::InvalidName(_) => Self::Structure(err),
        }
    }
}
