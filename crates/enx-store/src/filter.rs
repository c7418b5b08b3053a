//! # Validity Filter
//!
//! Keys read from the store pass through a [`KeyValidityFilter`] before they
//! are handed out. A record that slipped past submission-time validation, or
//! whose submission timestamp lies in the future, is dropped here rather than
//! published.

use std::ops::RangeInclusive;
use std::sync::Arc;

use enx_core::temporal::SECONDS_PER_HOUR;
use enx_core::{Clock, DiagnosisKey, DAYS_SINCE_ONSET_UNKNOWN, DEFAULT_ROLLING_PERIOD};

/// Accepted rolling periods, in 10-minute intervals.
pub const ROLLING_PERIOD_RANGE: RangeInclusive<i32> = 1..=DEFAULT_ROLLING_PERIOD;

/// Accepted transmission risk levels.
pub const TRANSMISSION_RISK_LEVEL_RANGE: RangeInclusive<i32> = 1..=8;

/// Accepted days since onset of symptoms (besides the unknown sentinel).
pub const DAYS_SINCE_ONSET_RANGE: RangeInclusive<i32> = -14..=4000;

/// Decides which stored keys may be handed out.
pub trait KeyValidityFilter: Send + Sync {
    /// Return the subset of `keys` that is valid, preserving order.
    fn filter(&self, keys: Vec<DiagnosisKey>) -> Vec<DiagnosisKey>;
}

/// Default filter: field ranges plus "not submitted in the future".
#[derive(Clone)]
pub struct ValidDiagnosisKeyFilter {
    clock: Arc<dyn Clock>,
}

impl ValidDiagnosisKeyFilter {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Whether a single key passes every check.
    pub fn is_valid(&self, key: &DiagnosisKey) -> bool {
        let current_hour = self.clock.now().timestamp() / SECONDS_PER_HOUR;
        let dsos = key.days_since_onset_of_symptoms();

        ROLLING_PERIOD_RANGE.contains(&key.rolling_period())
            && TRANSMISSION_RISK_LEVEL_RANGE.contains(&key.transmission_risk_level())
            && (dsos == DAYS_SINCE_ONSET_UNKNOWN || DAYS_SINCE_ONSET_RANGE.contains(&dsos))
            && key.submission_timestamp() <= current_hour
    }
}

impl std::fmt::Debug for ValidDiagnosisKeyFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidDiagnosisKeyFilter").finish_non_exhaustive()
    }
}

impl KeyValidityFilter for ValidDiagnosisKeyFilter {
    fn filter(&self, keys: Vec<DiagnosisKey>) -> Vec<DiagnosisKey> {
        let total = keys.len();
        let valid: Vec<DiagnosisKey> = keys.into_iter().filter(|k| self.is_valid(k)).collect();
        let dropped = total - valid.len();
        if dropped > 0 {
            tracing::info!(dropped, total, "Dropped invalid diagnosis keys");
        }
        valid
    }
}
