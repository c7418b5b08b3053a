//! # Mapping / Encoding
//!
//! Turns domain objects into archive payloads.
//!
//! - [`keys`]: diagnosis keys to the binary exposure key export.
//! - [`rules`]: certificates, value sets and business rules to canonical
//!   JSON, records in a stable order.
//!
//! Identical input always yields identical bytes, so re-running an assembly
//! over unchanged data re-publishes byte-identical, identically signed
//! archives.

pub mod keys;
pub mod proto;
pub mod rules;

pub use keys::{encode_key_export, KeyExportMetadata, EXPORT_HEADER};
pub use rules::{encode_category, encode_index, encode_value_sets};
