//! The lap ledger: the live, mutable, newest-first collection of laps for
//! the current in-progress session.
//!
//! Index 0 is the most recent lap. At most one lap is running at a time;
//! split and merge operate on closed laps only and preserve aggregate
//! duration and interval boundaries exactly.

use chrono::{DateTime, Duration, Utc};
use clockwork_domain::constants::MIN_SPLIT_SECONDS;
use clockwork_domain::utils::{round2, round3, split_duration};
use clockwork_domain::WorkLap;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

/// Why a ledger mutation was rejected. The ledger is left untouched; the
/// caller decides whether to surface the message to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerRejection {
    #[error("cannot modify the currently running lap; finish or lap it first")]
    LapRunning,
    #[error("lap is too short to split (needs at least 2 seconds)")]
    TooShort,
    #[error("laps must be adjacent to merge")]
    NotAdjacent,
    #[error("no lap with id {0}")]
    UnknownLap(Uuid),
}

#[derive(Debug, Clone, Default)]
pub struct LapLedger {
    laps: Vec<WorkLap>,
}

impl LapLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a ledger from persisted laps (newest-first).
    pub fn from_laps(laps: Vec<WorkLap>) -> Self {
        Self { laps }
    }

    /// Start a new lap now and prepend it.
    ///
    /// The caller is responsible for having ended the previously running
    /// lap first; the ledger does not end it implicitly.
    pub fn add_lap(&mut self, hourly_rate: f64) -> Uuid {
        self.insert_lap(WorkLap::start(hourly_rate))
    }

    /// Prepend an already constructed lap (restore/import path).
    pub fn insert_lap(&mut self, lap: WorkLap) -> Uuid {
        let id = lap.id;
        self.laps.insert(0, lap);
        debug!(lap_id = %id, laps = self.laps.len(), "lap added");
        id
    }

    /// Close the lap with the given id at `ended_at`.
    pub fn end_current(&mut self, id: Uuid, ended_at: DateTime<Utc>) -> Result<(), LedgerRejection> {
        let lap = self.lap_mut(id)?;
        lap.end(ended_at);
        Ok(())
    }

    /// The currently running lap, if any.
    pub fn active(&self) -> Option<&WorkLap> {
        self.laps.iter().find(|lap| lap.is_running())
    }

    /// Most recent lap.
    pub fn newest(&self) -> Option<&WorkLap> {
        self.laps.first()
    }

    pub fn lap(&self, id: Uuid) -> Option<&WorkLap> {
        self.laps.iter().find(|lap| lap.id == id)
    }

    /// All laps, newest-first.
    pub fn laps(&self) -> &[WorkLap] {
        &self.laps
    }

    pub fn len(&self) -> usize {
        self.laps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.laps.is_empty()
    }

    /// Clear the ledger (session stopped and archived).
    pub fn reset(&mut self) {
        self.laps.clear();
    }

    pub fn update_time(
        &mut self,
        id: Uuid,
        hours: u32,
        minutes: u32,
        seconds: u32,
    ) -> Result<(), LedgerRejection> {
        self.lap_mut(id)?.set_duration(hours, minutes, seconds);
        Ok(())
    }

    pub fn update_note(&mut self, id: Uuid, note: impl Into<String>) -> Result<(), LedgerRejection> {
        self.lap_mut(id)?.note = note.into();
        Ok(())
    }

    pub fn update_rate(&mut self, id: Uuid, hourly_rate: f64) -> Result<(), LedgerRejection> {
        self.lap_mut(id)?.hourly_rate = hourly_rate;
        Ok(())
    }

    pub fn set_break(&mut self, id: Uuid, is_break: bool) -> Result<(), LedgerRejection> {
        self.lap_mut(id)?.is_break = is_break;
        Ok(())
    }

    /// Split a closed lap into two halves whose durations sum to the
    /// original. The earlier half keeps the original start and gets a
    /// synthesized end at `start + floor(total/2)`; the later half spans
    /// the rest. Both inherit rate and break flag; the earlier half loses
    /// the note, the later half keeps it.
    ///
    /// Returns the ids of the `(earlier, later)` halves.
    pub fn split(&mut self, id: Uuid) -> Result<(Uuid, Uuid), LedgerRejection> {
        let index = self.index_of(id)?;
        let lap = &self.laps[index];

        if lap.is_running() {
            warn!(lap_id = %id, "split rejected: lap is running");
            return Err(LedgerRejection::LapRunning);
        }

        let total = lap.total_seconds();
        if total < MIN_SPLIT_SECONDS {
            warn!(lap_id = %id, total, "split rejected: lap too short");
            return Err(LedgerRejection::TooShort);
        }

        let half = total / 2;
        let remainder = total - half;
        let midpoint = lap.started_at + Duration::seconds(half as i64);

        let (h1, m1, s1) = split_duration(half);
        let earlier = WorkLap::from_parts(
            Uuid::new_v4(),
            lap.started_at,
            Some(midpoint),
            h1,
            m1,
            s1,
            "",
            lap.is_break,
            lap.hourly_rate,
        );

        let (h2, m2, s2) = split_duration(remainder);
        let later = WorkLap::from_parts(
            Uuid::new_v4(),
            midpoint,
            lap.ended_at,
            h2,
            m2,
            s2,
            lap.note.clone(),
            lap.is_break,
            lap.hourly_rate,
        );

        let ids = (earlier.id, later.id);
        // newest-first: the later half sits at the original index, the
        // earlier half right after it
        self.laps.remove(index);
        self.laps.insert(index, earlier);
        self.laps.insert(index, later);
        debug!(lap_id = %id, earlier = %ids.0, later = %ids.1, "lap split");
        Ok(ids)
    }

    /// Merge two adjacent closed laps into one spanning both intervals.
    ///
    /// Chronological order is given by ledger position (higher index =
    /// older). The merged lap takes the older lap's start and rate, the
    /// newer lap's end, the summed duration, the concatenated notes
    /// (older first, empty parts omitted), and the AND of the break flags.
    /// It is inserted at the newer lap's position.
    pub fn merge(&mut self, id_a: Uuid, id_b: Uuid) -> Result<Uuid, LedgerRejection> {
        let idx_a = self.index_of(id_a)?;
        let idx_b = self.index_of(id_b)?;

        if self.laps[idx_a].is_running() || self.laps[idx_b].is_running() {
            warn!(lap_a = %id_a, lap_b = %id_b, "merge rejected: lap is running");
            return Err(LedgerRejection::LapRunning);
        }

        if idx_a.abs_diff(idx_b) != 1 {
            warn!(lap_a = %id_a, lap_b = %id_b, "merge rejected: laps not adjacent");
            return Err(LedgerRejection::NotAdjacent);
        }

        let older_idx = idx_a.max(idx_b);
        let newer_idx = idx_a.min(idx_b);
        let older = &self.laps[older_idx];
        let newer = &self.laps[newer_idx];

        let total = older.total_seconds() + newer.total_seconds();
        let (hours, minutes, seconds) = split_duration(total);

        let note = [older.note.as_str(), newer.note.as_str()]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join("\n");

        let merged = WorkLap::from_parts(
            Uuid::new_v4(),
            older.started_at,
            newer.ended_at,
            hours,
            minutes,
            seconds,
            note,
            older.is_break && newer.is_break,
            older.hourly_rate,
        );

        let merged_id = merged.id;
        self.laps.remove(older_idx);
        self.laps.remove(newer_idx);
        self.laps.insert(newer_idx, merged);
        debug!(lap_a = %id_a, lap_b = %id_b, merged = %merged_id, "laps merged");
        Ok(merged_id)
    }

    /// Aggregate earnings, rounded to 3 decimals.
    pub fn total_amount(&self, exclude_breaks: bool) -> f64 {
        let sum = self
            .counted_laps(exclude_breaks)
            .map(WorkLap::amount)
            .sum();
        round3(sum)
    }

    /// Aggregate minutes, rounded to 2 decimals.
    pub fn total_minutes(&self, exclude_breaks: bool) -> f64 {
        let sum = self
            .counted_laps(exclude_breaks)
            .map(WorkLap::total_minutes)
            .sum();
        round2(sum)
    }

    /// Aggregate seconds, rounded to 2 decimals.
    pub fn total_seconds(&self, exclude_breaks: bool) -> f64 {
        let sum = self
            .counted_laps(exclude_breaks)
            .map(|lap| lap.total_seconds() as f64)
            .sum();
        round2(sum)
    }

    /// Total minutes spent on break laps, rounded to 2 decimals.
    pub fn total_break_minutes(&self) -> f64 {
        let sum = self
            .laps
            .iter()
            .filter(|lap| lap.is_break)
            .map(WorkLap::total_minutes)
            .sum();
        round2(sum)
    }

    fn counted_laps(&self, exclude_breaks: bool) -> impl Iterator<Item = &WorkLap> {
        self.laps
            .iter()
            .filter(move |lap| !(exclude_breaks && lap.is_break))
    }

    fn index_of(&self, id: Uuid) -> Result<usize, LedgerRejection> {
        self.laps
            .iter()
            .position(|lap| lap.id == id)
            .ok_or(LedgerRejection::UnknownLap(id))
    }

    fn lap_mut(&mut self, id: Uuid) -> Result<&mut WorkLap, LedgerRejection> {
        self.laps
            .iter_mut()
            .find(|lap| lap.id == id)
            .ok_or(LedgerRejection::UnknownLap(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn closed_lap(seconds: u64, note: &str, is_break: bool) -> WorkLap {
        let started_at = Utc::now();
        let (h, m, s) = split_duration(seconds);
        WorkLap::from_parts(
            Uuid::new_v4(),
            started_at,
            Some(started_at + Duration::seconds(seconds as i64)),
            h,
            m,
            s,
            note,
            is_break,
            100.0,
        )
    }

    fn ledger_with(laps: Vec<WorkLap>) -> LapLedger {
        LapLedger::from_laps(laps)
    }

    #[test]
    fn add_lap_prepends_a_running_lap() {
        let mut ledger = LapLedger::new();
        let first = ledger.add_lap(100.0);
        let second = ledger.add_lap(100.0);
        assert_eq!(ledger.newest().map(|lap| lap.id), Some(second));
        assert_eq!(ledger.laps()[1].id, first);
    }

    #[test]
    fn end_current_closes_the_lap() {
        let mut ledger = LapLedger::new();
        let id = ledger.add_lap(100.0);
        assert!(ledger.active().is_some());
        ledger.end_current(id, Utc::now()).unwrap();
        assert!(ledger.active().is_none());
    }

    #[test]
    fn split_preserves_total_duration_and_interval() {
        let lap = closed_lap(7, "deep work", false);
        let start = lap.started_at;
        let end = lap.ended_at;
        let mut ledger = ledger_with(vec![lap]);

        let (earlier_id, later_id) = ledger.split(ledger.laps()[0].id).unwrap();
        assert_eq!(ledger.len(), 2);

        // newest-first: later half at index 0
        let later = ledger.lap(later_id).unwrap().clone();
        let earlier = ledger.lap(earlier_id).unwrap().clone();
        assert_eq!(ledger.laps()[0].id, later_id);
        assert_eq!(ledger.laps()[1].id, earlier_id);

        assert_eq!(earlier.total_seconds() + later.total_seconds(), 7);
        assert_eq!(earlier.total_seconds(), 3);
        assert_eq!(later.total_seconds(), 4);

        // contiguous cover of the original interval
        assert_eq!(earlier.started_at, start);
        assert_eq!(earlier.ended_at, Some(start + Duration::seconds(3)));
        assert_eq!(later.started_at, start + Duration::seconds(3));
        assert_eq!(later.ended_at, end);
    }

    #[test]
    fn split_note_stays_with_the_later_half() {
        let lap = closed_lap(10, "wrote the report", false);
        let mut ledger = ledger_with(vec![lap]);
        let (earlier_id, later_id) = ledger.split(ledger.laps()[0].id).unwrap();

        assert_eq!(ledger.lap(earlier_id).unwrap().note, "");
        assert_eq!(ledger.lap(later_id).unwrap().note, "wrote the report");
    }

    #[test]
    fn split_inherits_rate_and_break_flag() {
        let lap = closed_lap(60, "", true);
        let mut ledger = ledger_with(vec![lap]);
        let (earlier_id, later_id) = ledger.split(ledger.laps()[0].id).unwrap();

        for id in [earlier_id, later_id] {
            let half = ledger.lap(id).unwrap();
            assert!(half.is_break);
            assert_eq!(half.hourly_rate, 100.0);
        }
    }

    #[test]
    fn split_rejects_running_lap_and_leaves_ledger_unchanged() {
        let mut ledger = LapLedger::new();
        let id = ledger.add_lap(100.0);
        ledger.update_time(id, 0, 1, 0).unwrap();
        let before = ledger.laps().to_vec();

        assert_eq!(ledger.split(id), Err(LedgerRejection::LapRunning));
        assert_eq!(ledger.laps(), &before[..]);
    }

    #[test]
    fn split_rejects_too_short_lap() {
        let lap = closed_lap(1, "", false);
        let mut ledger = ledger_with(vec![lap]);
        let id = ledger.laps()[0].id;
        let before = ledger.laps().to_vec();

        assert_eq!(ledger.split(id), Err(LedgerRejection::TooShort));
        assert_eq!(ledger.laps(), &before[..]);
    }

    #[test]
    fn split_two_seconds_is_allowed() {
        let lap = closed_lap(2, "", false);
        let mut ledger = ledger_with(vec![lap]);
        let (earlier_id, later_id) = ledger.split(ledger.laps()[0].id).unwrap();
        assert_eq!(ledger.lap(earlier_id).unwrap().total_seconds(), 1);
        assert_eq!(ledger.lap(later_id).unwrap().total_seconds(), 1);
    }

    #[test]
    fn merge_combines_adjacent_laps() {
        let older = closed_lap(600, "first task", false);
        let newer = closed_lap(300, "second task", false);
        let older_start = older.started_at;
        let newer_end = newer.ended_at;
        let (older_id, newer_id) = (older.id, newer.id);

        // newest-first
        let mut ledger = ledger_with(vec![newer, older]);
        let merged_id = ledger.merge(older_id, newer_id).unwrap();

        assert_eq!(ledger.len(), 1);
        let merged = ledger.lap(merged_id).unwrap();
        assert_eq!(merged.total_seconds(), 900);
        assert_eq!(merged.started_at, older_start);
        assert_eq!(merged.ended_at, newer_end);
        assert_eq!(merged.note, "first task\nsecond task");
        assert!(!merged.is_break);
    }

    #[test]
    fn merge_skips_empty_notes() {
        let older = closed_lap(60, "", false);
        let newer = closed_lap(60, "only note", false);
        let (older_id, newer_id) = (older.id, newer.id);
        let mut ledger = ledger_with(vec![newer, older]);

        let merged_id = ledger.merge(newer_id, older_id).unwrap();
        assert_eq!(ledger.lap(merged_id).unwrap().note, "only note");
    }

    #[test]
    fn merge_break_flag_is_and_of_both() {
        let older = closed_lap(60, "", true);
        let newer = closed_lap(60, "", false);
        let (older_id, newer_id) = (older.id, newer.id);
        let mut ledger = ledger_with(vec![newer, older]);

        let merged_id = ledger.merge(older_id, newer_id).unwrap();
        assert!(!ledger.lap(merged_id).unwrap().is_break);

        let older = closed_lap(60, "", true);
        let newer = closed_lap(60, "", true);
        let (older_id, newer_id) = (older.id, newer.id);
        let mut ledger = ledger_with(vec![newer, older]);

        let merged_id = ledger.merge(older_id, newer_id).unwrap();
        assert!(ledger.lap(merged_id).unwrap().is_break);
    }

    #[test]
    fn merge_inserts_at_newer_position() {
        let oldest = closed_lap(60, "a", false);
        let middle = closed_lap(60, "b", false);
        let newest = closed_lap(60, "c", false);
        let (middle_id, newest_id) = (middle.id, newest.id);
        let oldest_id = oldest.id;
        let mut ledger = ledger_with(vec![newest, middle, oldest]);

        let merged_id = ledger.merge(newest_id, middle_id).unwrap();
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.laps()[0].id, merged_id);
        assert_eq!(ledger.laps()[1].id, oldest_id);
    }

    #[test]
    fn merge_rejects_running_lap() {
        let older = closed_lap(60, "", false);
        let older_id = older.id;
        let mut ledger = ledger_with(vec![older]);
        let running_id = ledger.add_lap(100.0);
        let before = ledger.laps().to_vec();

        assert_eq!(ledger.merge(older_id, running_id), Err(LedgerRejection::LapRunning));
        assert_eq!(ledger.laps(), &before[..]);
    }

    #[test]
    fn merge_rejects_non_adjacent_laps() {
        let a = closed_lap(60, "", false);
        let b = closed_lap(60, "", false);
        let c = closed_lap(60, "", false);
        let (a_id, c_id) = (a.id, c.id);
        let mut ledger = ledger_with(vec![c, b, a]);
        let before = ledger.laps().to_vec();

        assert_eq!(ledger.merge(a_id, c_id), Err(LedgerRejection::NotAdjacent));
        assert_eq!(ledger.laps(), &before[..]);
    }

    #[test]
    fn merge_unknown_lap_is_rejected() {
        let lap = closed_lap(60, "", false);
        let id = lap.id;
        let mut ledger = ledger_with(vec![lap]);
        let ghost = Uuid::new_v4();
        assert_eq!(ledger.merge(id, ghost), Err(LedgerRejection::UnknownLap(ghost)));
    }

    #[test]
    fn time_aggregate_excludes_breaks_when_asked() {
        let work_a = closed_lap(600, "", false); // 10m
        let work_b = closed_lap(1200, "", false); // 20m
        let coffee = closed_lap(300, "", true); // 5m break
        let ledger = ledger_with(vec![coffee, work_b, work_a]);

        assert_eq!(ledger.total_minutes(true), 30.0);
        assert_eq!(ledger.total_minutes(false), 35.0);
        assert_eq!(ledger.total_seconds(true), 1800.0);
        assert_eq!(ledger.total_break_minutes(), 5.0);
    }

    #[test]
    fn amount_aggregate_excludes_breaks_when_asked() {
        // 30m at 100/h each
        let work = closed_lap(1800, "", false);
        let lunch = closed_lap(1800, "", true);
        let ledger = ledger_with(vec![lunch, work]);

        assert_eq!(ledger.total_amount(true), 50.0);
        assert_eq!(ledger.total_amount(false), 100.0);
    }

    #[test]
    fn reset_clears_everything() {
        let mut ledger = ledger_with(vec![closed_lap(60, "", false)]);
        ledger.reset();
        assert!(ledger.is_empty());
    }
}
