//! # Repository Seam
//!
//! Backends implement [`DiagnosisKeyRepository`]. The service is generic
//! over it, so there is no boxing and no `async-trait`.

use std::future::Future;

use enx_core::DiagnosisKey;

use crate::error::StoreError;

/// Persistence operations for diagnosis keys.
///
/// Timestamps are in the store unit: whole hours since the Unix epoch.
pub trait DiagnosisKeyRepository: Send + Sync {
    /// Insert each key unless a PCR-backed record with the same key data
    /// exists, or any record with the same key data exists. Returns the
    /// number of rows actually inserted. The whole batch runs in one
    /// transaction; each key's check-and-insert is a single atomic step.
    fn save_all(
        &self,
        keys: &[DiagnosisKey],
    ) -> impl Future<Output = Result<usize, StoreError>> + Send;

    /// All keys, ascending by submission timestamp.
    fn find_all(&self) -> impl Future<Output = Result<Vec<DiagnosisKey>, StoreError>> + Send;

    /// Keys with `transmission_risk_level >= min_trl` and
    /// `submission_timestamp >= min_submission_timestamp`, ascending by
    /// submission timestamp.
    fn find_with_min_trl(
        &self,
        min_trl: i32,
        min_submission_timestamp: i64,
    ) -> impl Future<Output = Result<Vec<DiagnosisKey>, StoreError>> + Send;

    /// Delete every key with `submission_timestamp < threshold`.
    ///
    /// `before_delete` receives the number of matching rows after they have
    /// been counted and before they are removed, inside the same
    /// transaction. Returns the number of deleted rows.
    fn delete_older_than<F>(
        &self,
        threshold: i64,
        before_delete: F,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send
    where
        F: FnOnce(u64) + Send;
}
