//! # enx-cli: Distribution Server CLI
//!
//! Provides the `enx` binary:
//!
//! ```bash
//! # Assemble and sign the bundle into ./out
//! ENX_SIGNING_KEY=... DATABASE_URL=postgres://... enx assemble --config distribution.yaml --output-dir out
//!
//! # Same layout from built-in sample content and an empty key store
//! enx assemble --offline --output-dir out
//!
//! # Delete keys submitted more than 14 days ago
//! DATABASE_URL=postgres://... enx retention --days 14
//!
//! # Generate a signing key
//! enx keygen
//! ```
//!
//! Handlers return the process exit code: 0 on success, 2 when the bundle
//! was written but some categories were skipped. Errors are fatal and exit
//! with 1.

pub mod assemble;
pub mod keygen;
pub mod retention;

/// Multi-threaded runtime for the async handlers.
pub fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?)
}
