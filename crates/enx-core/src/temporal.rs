//! # Temporal Types: Injected Clock and Retention Arithmetic
//!
//! Diagnosis keys carry two notions of time:
//!
//! - `submissionTimestamp`: whole **hours** since the Unix epoch (UTC), set
//!   when the key reaches the server.
//! - `rollingStartIntervalNumber`: **10-minute** intervals since the epoch,
//!   set by the device that generated the key.
//!
//! Retention and fetch windows are expressed in days and converted to the
//! hour unit here. "Now" always comes from a [`Clock`] so that thresholds are
//! reproducible in tests.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};

use crate::error::EnxError;

/// Seconds in one hour; the unit of `submissionTimestamp`.
pub const SECONDS_PER_HOUR: i64 = 3_600;

/// Seconds in one day.
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Seconds in one rolling interval (10 minutes).
pub const SECONDS_PER_ROLLING_INTERVAL: i64 = 600;

/// Source of the current UTC time.
pub trait Clock: Send + Sync {
    /// The current instant in UTC.
    fn now(&self) -> DateTime<Utc>;
}

/// Reads the operating-system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock pinned to a fixed instant, adjustable between calls.
#[derive(Debug)]
pub struct FixedClock {
    epoch_secs: AtomicI64,
}

impl FixedClock {
    /// Pin the clock at the given instant.
    pub fn at(instant: DateTime<Utc>) -> Self {
        Self {
            epoch_secs: AtomicI64::new(instant.timestamp()),
        }
    }

    /// Move the clock to a new instant.
    pub fn set(&self, instant: DateTime<Utc>) {
        self.epoch_secs.store(instant.timestamp(), Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.epoch_secs.load(Ordering::SeqCst), 0).unwrap_or_default()
    }
}

/// Convert a day offset into the store's timestamp unit: whole hours since
/// the epoch of `now - days`, truncated.
///
/// # Errors
///
/// Returns `EnxError::InvalidArgument` if `days` is negative.
pub fn days_to_hours(days: i32, clock: &dyn Clock) -> Result<i64, EnxError> {
    if days < 0 {
        return Err(EnxError::InvalidArgument(
            "Number of days to retain must be greater or equal to 0.".into(),
        ));
    }
    // i32::MAX days is ~1.9e14 seconds, far inside i64 range.
    let threshold_secs = clock.now().timestamp() - i64::from(days) * SECONDS_PER_DAY;
    Ok(threshold_secs / SECONDS_PER_HOUR)
}

/// First rolling interval number of the UTC day `days` before today.
pub(crate) fn retention_interval_threshold(days: i32, clock: &dyn Clock) -> Result<i64, EnxError> {
    if days < 0 {
        return Err(EnxError::InvalidArgument(
            "Retention threshold must be greater or equal to 0.".into(),
        ));
    }
    let now = clock.now().timestamp();
    let midnight = now - now.rem_euclid(SECONDS_PER_DAY);
    let threshold_secs = midnight - i64::from(days) * SECONDS_PER_DAY;
    Ok(threshold_secs.div_euclid(SECONDS_PER_ROLLING_INTERVAL))
}
