//! # enx-core: Foundational Types for the Distribution Server
//!
//! Every other crate in the workspace depends on `enx-core`; it depends on
//! nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Validated newtypes.** `KeyData` and `CountryCode` can only be built
//!    through checked constructors. A diagnosis key with a malformed
//!    identifier cannot exist in memory, so the store never sees one.
//!
//! 2. **Injected time.** Retention thresholds are computed against a
//!    [`Clock`], never against a direct system-clock read. Tests pin the
//!    clock with [`FixedClock`].
//!
//! 3. **`CanonicalBytes` for structured payloads.** Certificate and rule
//!    exports are RFC 8785 canonical JSON, so identical inputs always sign to
//!    identical bytes.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `enx-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod error;
pub mod identity;
pub mod key;
pub mod temporal;

pub use canonical::CanonicalBytes;
pub use error::{CanonicalizationError, EnxError};
pub use identity::{CountryCode, KeyData, KEY_DATA_LENGTH};
pub use key::{
    DiagnosisKey, DiagnosisKeyBuilder, ReportType, SubmissionType, DAYS_SINCE_ONSET_UNKNOWN,
    DEFAULT_ROLLING_PERIOD,
};
pub use temporal::{days_to_hours, Clock, FixedClock, SystemClock};
