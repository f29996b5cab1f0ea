//! Archived work session: a frozen group of laps with aggregate totals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::lap::WorkLap;
use crate::utils::round2;

/// A completed session as stored in the local archive.
///
/// Immutable once archived, except for name/description edits. The lap
/// snapshot preserves the ledger's newest-first ordering.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionRecord {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    /// Start of the oldest lap; `None` for an empty session.
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: DateTime<Utc>,
    pub lap_count: usize,
    pub total_seconds: u64,
    /// Aggregate earnings, rounded to 2 decimals for archive display.
    pub total_amount: f64,
    /// Frozen lap data, newest-first.
    pub laps: Vec<WorkLap>,
    pub session_name: Option<String>,
    pub description: Option<String>,
}

impl SessionRecord {
    /// Freeze the given ledger snapshot (newest-first) into an archive
    /// entry, computing aggregates.
    pub fn from_laps(
        laps: &[WorkLap],
        session_name: Option<String>,
        description: Option<String>,
    ) -> Self {
        let now = Utc::now();
        let total_seconds: u64 = laps.iter().map(WorkLap::total_seconds).sum();
        let total_amount = round2(laps.iter().map(WorkLap::amount).sum());

        Self {
            id: Uuid::new_v4(),
            created_at: now,
            started_at: laps.last().map(|lap| lap.started_at),
            ended_at: now,
            lap_count: laps.len(),
            total_seconds,
            total_amount,
            laps: laps.to_vec(),
            session_name,
            description,
        }
    }

    /// Display name, falling back to the creation date.
    pub fn display_name(&self) -> String {
        self.session_name
            .clone()
            .unwrap_or_else(|| format!("Session {}", self.created_at.format("%Y-%m-%d")))
    }

    /// One-line summary used as the default remote description.
    pub fn summary(&self) -> String {
        format!("{} laps, {}s total", self.lap_count, self.total_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn closed_lap(seconds: u64, rate: f64) -> WorkLap {
        let mut lap = WorkLap::start(rate);
        let (h, m, s) = crate::utils::split_duration(seconds);
        lap.set_duration(h, m, s);
        lap.end(Utc::now());
        lap
    }

    #[test]
    fn aggregates_one_lap_session() {
        let lap = closed_lap(3661, 100.0);
        let session = SessionRecord::from_laps(&[lap], None, None);

        assert_eq!(session.lap_count, 1);
        assert_eq!(session.total_seconds, 3661);
        // 100 * 3661/3600, rounded to 2 decimals for display
        assert_eq!(session.total_amount, 101.69);
    }

    #[test]
    fn start_is_oldest_lap() {
        let older = closed_lap(60, 0.0);
        let newer = closed_lap(60, 0.0);
        // ledger order is newest-first
        let session = SessionRecord::from_laps(&[newer, older.clone()], None, None);
        assert_eq!(session.started_at, Some(older.started_at));
        assert_eq!(session.total_seconds, 120);
    }

    #[test]
    fn empty_session_has_no_start() {
        let session = SessionRecord::from_laps(&[], None, None);
        assert_eq!(session.started_at, None);
        assert_eq!(session.lap_count, 0);
        assert_eq!(session.total_amount, 0.0);
    }
}
