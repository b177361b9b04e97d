//! Day-based date arithmetic.
//!
//! Every deadline computation in the workspace goes through these helpers so
//! the form layer and storage agree on rounding.

use chrono::TimeDelta;

use crate::domain::Timestamp;

pub const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Upper bound accepted for a project type's processing time (100 years).
pub const MAX_PROCESSING_DAYS: i64 = 36_500;

/// `submit + days * 24h`. Negative day counts are treated as zero.
///
/// Returns `None` when the result falls outside the representable range.
pub fn deadline_from_submission(submit: Timestamp, processing_days: i64) -> Option<Timestamp> {
    let delta = TimeDelta::try_days(processing_days.max(0))?;
    submit.checked_add_signed(delta)
}

/// Whole days from `from` to `to`, floored (a deadline 1ms in the past is `-1`).
pub fn whole_days_between(from: Timestamp, to: Timestamp) -> i64 {
    (to - from).num_milliseconds().div_euclid(MILLIS_PER_DAY)
}
