//! Step delay calculation.

use std::time::Duration;

use crate::model::{DelayUnit, StepDelay};

const MINUTE_SECS: u64 = 60;
const HOUR_SECS: u64 = 3_600;
const DAY_SECS: u64 = 86_400;
const WEEK_SECS: u64 = 604_800;

/// Convert a (amount, unit) pair into a wait duration.
///
/// Unknown units compute to zero (fail open) rather than erroring; the
/// skipped wait is surfaced with a warn log so workflow authors can see it.
pub fn compute_delay(amount: u64, unit: DelayUnit) -> Duration {
    let multiplier = match unit {
        DelayUnit::Minutes => MINUTE_SECS,
        DelayUnit::Hours => HOUR_SECS,
        DelayUnit::Days => DAY_SECS,
        DelayUnit::Weeks => WEEK_SECS,
        DelayUnit::Unknown => {
            tracing::warn!(amount, "Unknown delay unit, treating as zero delay");
            return Duration::ZERO;
        }
    };
    Duration::from_secs(amount.saturating_mul(multiplier))
}

/// Compute the duration for a step's declared delay.
pub fn delay_duration(delay: &StepDelay) -> Duration {
    compute_delay(delay.amount, delay.unit)
}
