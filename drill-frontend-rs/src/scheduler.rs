//! Review intervals in the style of SM-2.
//!
//! The learner's history is reduced to two counts. A clean run grows the interval geometrically
//! (1 day, 6 days, then ×2.5 per extra correct answer). Any mistake switches to a slower curve
//! driven by accuracy, so an item with mistakes comes back sooner than a clean one.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub const MIN_INTERVAL_DAYS: i64 = 1;
pub const SECOND_INTERVAL_DAYS: i64 = 6;
pub const EASE_FACTOR: f64 = 2.5;
/// Correct answers beyond this don't speed up an item that has mistakes.
pub const MISTAKE_STREAK_CAP: i64 = 3;
/// About a century. Keeps every result representable.
pub const MAX_INTERVAL_DAYS: i64 = 36_500;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ScheduleError {
    #[error("invalid scheduler argument: {0}")]
    InvalidArgument(String),
}

#[derive(Clone, Debug, Serialize, Deserialize, tsify::Tsify, PartialEq)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct SchedulingParams {
    pub min_interval_ms: i64,
    pub second_interval_ms: i64,
    pub ease_factor: f64,
    pub max_interval_ms: i64,
}

pub fn scheduling_params() -> SchedulingParams {
    SchedulingParams {
        min_interval_ms: Duration::days(MIN_INTERVAL_DAYS).num_milliseconds(),
        second_interval_ms: Duration::days(SECOND_INTERVAL_DAYS).num_milliseconds(),
        ease_factor: EASE_FACTOR,
        max_interval_ms: Duration::days(MAX_INTERVAL_DAYS).num_milliseconds(),
    }
}

pub fn next_review_delay(correct: i64, incorrect: i64) -> Result<Duration, ScheduleError> {
    if correct < 0 || incorrect < 0 {
        return Err(ScheduleError::InvalidArgument(format!(
            "counts must be non-negative, got correct={correct} incorrect={incorrect}"
        )));
    }

    let total = correct.saturating_add(incorrect);
    if total == 0 {
        return Ok(Duration::days(MIN_INTERVAL_DAYS));
    }

    let days = if incorrect > 0 {
        let accuracy = correct as f64 / total as f64;
        let exponent = accuracy * correct.min(MISTAKE_STREAK_CAP) as f64;
        MIN_INTERVAL_DAYS as f64 * EASE_FACTOR.powf(exponent)
    } else {
        match correct {
            1 => MIN_INTERVAL_DAYS as f64,
            2 => SECOND_INTERVAL_DAYS as f64,
            // Past the cap anyway, and keeps `powi` in range.
            n if n - 2 > 64 => MAX_INTERVAL_DAYS as f64,
            n => SECOND_INTERVAL_DAYS as f64 * EASE_FACTOR.powi((n - 2) as i32),
        }
    };

    Ok(days_to_duration(days))
}

/// When the learner should see this material again.
pub fn next_review_at(
    now: DateTime<Utc>,
    correct: i64,
    incorrect: i64,
) -> Result<DateTime<Utc>, ScheduleError> {
    let delay = next_review_delay(correct, incorrect)?;
    now.checked_add_signed(delay).ok_or_else(|| {
        ScheduleError::InvalidArgument(format!("{now} + {delay} is out of range"))
    })
}

/// Counts arriving from JavaScript are plain numbers.
pub fn count_from_f64(value: f64, name: &str) -> Result<i64, ScheduleError> {
    if !value.is_finite() || value.fract() != 0.0 {
        return Err(ScheduleError::InvalidArgument(format!(
            "{name} must be a whole number, got {value}"
        )));
    }
    if value < 0.0 {
        return Err(ScheduleError::InvalidArgument(format!(
            "{name} must be non-negative, got {value}"
        )));
    }
    // Anything this large lands on the cap regardless.
    Ok(value.min(i64::MAX as f64 / 2.0) as i64)
}

fn days_to_duration(days: f64) -> Duration {
    let capped = days.min(MAX_INTERVAL_DAYS as f64);
    let ms = (capped * Duration::days(1).num_milliseconds() as f64).round() as i64;
    Duration::milliseconds(ms.max(1))
}
