//! Work lap: one contiguous timed interval of work or break.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{ClockworkError, Result};
use crate::utils::{round2, round3};

/// One lap of a work session.
///
/// `ended_at` is `None` while the lap is the currently running one; the
/// duration components are kept consistent with elapsed wall time by the
/// caller (timer ticks and user edits).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkLap {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
    pub note: String,
    pub is_break: bool,
    pub hourly_rate: f64,
}

impl WorkLap {
    /// Start a fresh lap running from now.
    pub fn start(hourly_rate: f64) -> Self {
        Self::start_at(Utc::now(), hourly_rate)
    }

    /// Start a fresh lap running from the given instant.
    pub fn start_at(started_at: DateTime<Utc>, hourly_rate: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at,
            ended_at: None,
            hours: 0,
            minutes: 0,
            seconds: 0,
            note: String::new(),
            is_break: false,
            hourly_rate,
        }
    }

    /// Reconstruct a lap from persisted data.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: Uuid,
        started_at: DateTime<Utc>,
        ended_at: Option<DateTime<Utc>>,
        hours: u32,
        minutes: u32,
        seconds: u32,
        note: impl Into<String>,
        is_break: bool,
        hourly_rate: f64,
    ) -> Self {
        Self {
            id,
            started_at,
            ended_at,
            hours,
            minutes,
            seconds,
            note: note.into(),
            is_break,
            hourly_rate,
        }
    }

    /// Whether this lap is still running.
    pub fn is_running(&self) -> bool {
        self.ended_at.is_none()
    }

    /// Close the lap. `Active -> Closed` is one-way; closing an already
    /// closed lap simply overwrites the end timestamp (user edit).
    pub fn end(&mut self, at: DateTime<Utc>) {
        self.ended_at = Some(at);
    }

    /// Overwrite the elapsed duration components.
    pub fn set_duration(&mut self, hours: u32, minutes: u32, seconds: u32) {
        self.hours = hours;
        self.minutes = minutes;
        self.seconds = seconds;
    }

    /// Raw elapsed seconds.
    pub fn total_seconds(&self) -> u64 {
        u64::from(self.hours) * 3600 + u64::from(self.minutes) * 60 + u64::from(self.seconds)
    }

    /// Elapsed minutes, rounded to 2 decimals.
    pub fn total_minutes(&self) -> f64 {
        round2(self.total_seconds() as f64 / 60.0)
    }

    /// Earned amount: `hourly_rate x elapsed hours`, rounded to 3 decimals.
    pub fn amount(&self) -> f64 {
        round3(self.hourly_rate * (self.total_seconds() as f64 / 3600.0))
    }
}

/// Parse an hourly rate entered at a settings boundary.
///
/// Non-numeric and negative input is rejected outright instead of being
/// coerced into a NaN that would poison every downstream amount.
pub fn parse_hourly_rate(input: &str) -> Result<f64> {
    let rate: f64 = input
        .trim()
        .parse()
        .map_err(|_| ClockworkError::InvalidInput(format!("not a number: {input:?}")))?;
    if !rate.is_finite() || rate < 0.0 {
        return Err(ClockworkError::InvalidInput(format!(
            "hourly rate must be a non-negative number, got {input:?}"
        )));
    }
    Ok(rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_for_ninety_minutes_at_450() {
        let mut lap = WorkLap::start(450.0);
        lap.set_duration(1, 30, 0);
        assert_eq!(lap.amount(), 675.0);
    }

    #[test]
    fn amount_rounds_to_three_decimals() {
        let mut lap = WorkLap::start(100.0);
        lap.set_duration(1, 1, 1); // 3661s -> 101.6944...
        assert_eq!(lap.amount(), 101.694);
    }

    #[test]
    fn fresh_lap_is_running_until_ended() {
        let mut lap = WorkLap::start(0.0);
        assert!(lap.is_running());
        lap.end(Utc::now());
        assert!(!lap.is_running());
    }

    #[test]
    fn total_time_accessors() {
        let mut lap = WorkLap::start(0.0);
        lap.set_duration(0, 10, 30);
        assert_eq!(lap.total_seconds(), 630);
        assert_eq!(lap.total_minutes(), 10.5);
    }

    #[test]
    fn parse_hourly_rate_accepts_numbers() {
        assert_eq!(parse_hourly_rate("450").ok(), Some(450.0));
        assert_eq!(parse_hourly_rate(" 12.5 ").ok(), Some(12.5));
    }

    #[test]
    fn parse_hourly_rate_rejects_garbage() {
        assert!(parse_hourly_rate("abc").is_err());
        assert!(parse_hourly_rate("-3").is_err());
        assert!(parse_hourly_rate("NaN").is_err());
        assert!(parse_hourly_rate("inf").is_err());
    }
}
