//! # enx-pack: Distribution Bundle Packaging
//!
//! Builds the bundle that clients download from the CDN:
//!
//! - **Tree** (`tree.rs`): directories, plain archives and signed archives
//!   as one tagged union. A tree is first *prepared* (paths resolved,
//!   signatures computed, no I/O) and then *materialized* into an
//!   [`OutputSink`] in a single depth-first pass.
//!
//! - **Signing** (`signing.rs`): wraps an archive so that it materializes as
//!   `export.bin` plus an `export.sig` signature list.
//!
//! - **Mapping** (`mapping/`): diagnosis keys to the binary key export;
//!   certificates, value sets and business rules to canonical JSON.
//!
//! - **Assembly** (`assembly.rs`): fetches remote content concurrently,
//!   reads keys from the store, and composes the full tree.
//!
//! ## Failure Policy
//!
//! A category whose fetch or mapping fails is skipped and reported, unless
//! the configuration marks it fatal. Signing, structure and store failures
//! abort the run before anything is written.

pub mod assembly;
pub mod config;
pub mod error;
pub mod mapping;
pub mod signing;
pub mod sink;
pub mod tree;

pub use assembly::{Assembly, AssemblyReport, CategoryFailure, RunStatus, StructureAssembler};
pub use config::{ConfigError, DistributionConfig};
pub use error::{AssemblyError, MappingError, TreeError};
pub use signing::{SignedArchive, ED25519_ALGORITHM_OID, EXPORT_BINARY, EXPORT_SIGNATURE};
pub use sink::{FsSink, MemorySink, OutputSink, SinkEntry};
pub use tree::{Archive, Directory, PreparedEntry, PreparedTree, Writable};
