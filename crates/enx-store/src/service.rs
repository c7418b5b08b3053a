//! # Diagnosis Key Service
//!
//! The public face of the store. Converts day offsets into the store's hour
//! unit against the injected clock, runs the validity filter over every read,
//! and logs conflict and retention counts.

use std::sync::Arc;

use enx_core::{days_to_hours, Clock, DiagnosisKey};

use crate::error::StoreError;
use crate::filter::{KeyValidityFilter, ValidDiagnosisKeyFilter};
use crate::repository::DiagnosisKeyRepository;

/// Save, read and retention operations over a [`DiagnosisKeyRepository`].
pub struct DiagnosisKeyService<R> {
    repository: R,
    filter: Arc<dyn KeyValidityFilter>,
    clock: Arc<dyn Clock>,
}

impl<R: DiagnosisKeyRepository> DiagnosisKeyService<R> {
    /// Create a service using [`ValidDiagnosisKeyFilter`] on the same clock.
    pub fn new(repository: R, clock: Arc<dyn Clock>) -> Self {
        let filter = Arc::new(ValidDiagnosisKeyFilter::new(Arc::clone(&clock)));
        Self::with_filter(repository, filter, clock)
    }

    pub fn with_filter(
        repository: R,
        filter: Arc<dyn KeyValidityFilter>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            filter,
            clock,
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Persist `keys` and return how many were actually inserted.
    ///
    /// A key is skipped if a PCR-backed record with the same key data is
    /// stored, or if any record with the same key data is stored. Skips are
    /// not errors; their number is logged.
    pub async fn save_diagnosis_keys(&self, keys: &[DiagnosisKey]) -> Result<usize, StoreError> {
        let inserted = self.repository.save_all(keys).await?;

        let conflicting = keys.len() - inserted;
        if conflicting > 0 {
            tracing::warn!(
                "{} out of {} diagnosis keys conflicted with existing database entries and were ignored.",
                conflicting,
                keys.len()
            );
        }

        Ok(inserted)
    }

    /// All valid stored keys, ascending by submission timestamp.
    pub async fn get_diagnosis_keys(&self) -> Result<Vec<DiagnosisKey>, StoreError> {
        let keys = self.repository.find_all().await?;
        Ok(self.filter.filter(keys))
    }

    /// Valid keys with `transmission_risk_level >= min_trl` submitted within
    /// the last `days_to_fetch` days.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `days_to_fetch` is negative.
    pub async fn get_diagnosis_keys_with_min_trl(
        &self,
        min_trl: i32,
        days_to_fetch: i32,
    ) -> Result<Vec<DiagnosisKey>, StoreError> {
        let threshold = self.days_to_hours(days_to_fetch)?;
        let keys = self.repository.find_with_min_trl(min_trl, threshold).await?;
        Ok(self.filter.filter(keys))
    }

    /// Delete every key submitted more than `days_to_retain` days ago.
    /// Returns the number of deleted records.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `days_to_retain` is negative; nothing is deleted.
    pub async fn apply_retention_policy(&self, days_to_retain: i32) -> Result<u64, StoreError> {
        let threshold = self.days_to_hours(days_to_retain)?;
        self.repository
            .delete_older_than(threshold, |count| {
                tracing::info!(
                    "Deleting {} diagnosis key(s) with a submission timestamp older than {} day(s) ago.",
                    count,
                    days_to_retain
                );
            })
            .await
    }

    /// Hours since the epoch of "now minus `days`", per this service's clock.
    pub fn days_to_hours(&self, days: i32) -> Result<i64, StoreError> {
        Ok(days_to_hours(days, self.clock.as_ref())?)
    }
}

impl<R: std::fmt::Debug> std::fmt::Debug for DiagnosisKeyService<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagnosisKeyService")
            .field("repository", &self.repository)
            .finish_non_exhaustive()
    }
}
