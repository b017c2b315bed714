//! Statistics are recomputed from the logs every time. Everything in here is a pure function of
//! the rows it is given.

pub mod questions;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::{storage::entities::SessionRow, timer::TimeLimit, utils::percentage::Accuracy};

/// Descriptive statistics over a list of durations in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DurationStats {
    pub count: usize,
    pub sum: u64,
    pub mean: f64,
    pub min: u32,
    pub max: u32,
}

impl DurationStats {
    /// Returns `None` when there is nothing to describe.
    pub fn from_values(values: impl IntoIterator<Item = u32>) -> Option<Self> {
        let mut count = 0usize;
        let mut sum = 0u64;
        let mut min = u32::MAX;
        let mut max = 0;
        for v in values {
            count += 1;
            sum += u64::from(v);
            min = min.min(v);
            max = max.max(v);
        }
        if count == 0 {
            return None;
        }
        Some(Self {
            count,
            sum,
            mean: sum as f64 / count as f64,
            min,
            max,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionLine {
    pub datetime: NaiveDateTime,
    pub attempted: u32,
    pub correct: u32,
    pub accuracy: Accuracy,
    pub average_seconds: Option<f64>,
}

/// Summary of every logged session of a subject.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub sessions: usize,
    pub total_attempted: u64,
    pub total_correct: u64,
    pub accuracy: Accuracy,
    pub durations: Option<DurationStats>,
    pub limit_seconds: u32,
    /// Questions that took at least `limit_seconds`.
    pub late: usize,
    /// Most recent first.
    pub recent: Vec<SessionLine>,
}

pub fn summarize_sessions(rows: &[SessionRow], limit: TimeLimit, recent: usize) -> SessionSummary {
    let total_attempted = rows.iter().map(|r| u64::from(r.questions_attempted)).sum();
    let total_correct = rows.iter().map(|r| u64::from(r.questions_correct)).sum();
    let all_durations = rows.iter().flat_map(|r| r.durations.iter().copied());

    let recent = rows
        .iter()
        .rev()
        .take(recent)
        .map(|r| SessionLine {
            datetime: r.datetime,
            attempted: r.questions_attempted,
            correct: r.questions_correct,
            accuracy: Accuracy::of(r.questions_correct.into(), r.questions_attempted.into()),
            average_seconds: DurationStats::from_values(r.durations.iter().copied()).map(|s| s.mean),
        })
        .collect();

    SessionSummary {
        sessions: rows.len(),
        total_attempted,
        total_correct,
        accuracy: Accuracy::of(total_correct, total_attempted),
        durations: DurationStats::from_values(all_durations.clone()),
        limit_seconds: limit.seconds(),
        late: all_durations.filter(|d| limit.is_exceeded_by(*d)).count(),
        recent,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use crate::{storage::entities::SessionRow, timer::TimeLimit};

    use super::{summarize_sessions, DurationStats};

    fn row(day: u32, attempted: u32, correct: u32, durations: Vec<u32>) -> SessionRow {
        SessionRow {
            datetime: NaiveDateTime::new(
                NaiveDate::from_ymd_opt(2024, 2, day).unwrap(),
                chrono::NaiveTime::MIN,
            ),
            session_wall_seconds: durations.iter().sum(),
            questions_started: attempted,
            questions_attempted: attempted,
            questions_correct: correct,
            durations,
        }
    }

    #[test]
    fn duration_stats_basic() {
        let stats = DurationStats::from_values([30, 60, 90]).unwrap();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.sum, 180);
        assert_eq!(stats.mean, 60.);
        assert_eq!(stats.min, 30);
        assert_eq!(stats.max, 90);
    }

    #[test]
    fn duration_stats_empty() {
        assert_eq!(DurationStats::from_values([]), None);
    }

    #[test]
    fn summary_of_nothing() {
        let summary = summarize_sessions(&[], TimeLimit::from_minutes(4), 10);
        assert_eq!(summary.sessions, 0);
        assert_eq!(summary.accuracy.to_string(), "N/A");
        assert!(summary.durations.is_none());
        assert_eq!(summary.late, 0);
        assert!(summary.recent.is_empty());
    }

    #[test]
    fn summary_over_sessions() {
        let rows = vec![
            row(1, 4, 3, vec![100, 200, 240, 300]),
            row(2, 0, 0, vec![]),
            row(3, 6, 4, vec![60, 60, 60, 60, 60, 60]),
        ];

        let summary = summarize_sessions(&rows, TimeLimit::from_minutes(4), 2);

        assert_eq!(summary.sessions, 3);
        assert_eq!(summary.total_attempted, 10);
        assert_eq!(summary.total_correct, 7);
        assert_eq!(summary.accuracy.to_string(), "70.0%");
        let durations = summary.durations.unwrap();
        assert_eq!(durations.count, 10);
        assert_eq!(durations.min, 60);
        assert_eq!(durations.max, 300);
        assert_eq!(summary.late, 2);

        assert_eq!(summary.recent.len(), 2);
        assert_eq!(summary.recent[0].datetime.date().to_string(), "2024-02-03");
        assert_eq!(summary.recent[0].average_seconds, Some(60.));
        assert_eq!(summary.recent[1].accuracy.to_string(), "N/A");
        assert_eq!(summary.recent[1].average_seconds, None);
    }
}
