//! # enx-store: Diagnosis Key Persistence
//!
//! The store accepts batches of diagnosis keys, keeps at most one record per
//! key data, and never lets a later submission replace a PCR-backed one.
//! Records are never updated in place: a save either inserts a key or skips
//! it, and the caller learns only how many keys were actually inserted.
//!
//! ## Layers
//!
//! - [`DiagnosisKeyRepository`]: the persistence seam. [`PgDiagnosisKeyRepository`]
//!   talks to Postgres through SQLx; [`InMemoryDiagnosisKeyRepository`] backs
//!   tests and offline assembly runs.
//! - [`KeyValidityFilter`]: drops records that should never be published.
//! - [`DiagnosisKeyService`]: the public operations (save, read, retention),
//!   anchored to an injected [`enx_core::Clock`].

pub mod error;
pub mod filter;
pub mod memory;
pub mod postgres;
pub mod repository;
pub mod service;

pub use error::StoreError;
pub use filter::{KeyValidityFilter, ValidDiagnosisKeyFilter};
pub use memory::InMemoryDiagnosisKeyRepository;
pub use postgres::{init_pool, PgDiagnosisKeyRepository};
pub use repository::DiagnosisKeyRepository;
pub use service::DiagnosisKeyService;
