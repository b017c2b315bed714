//! Explicit state of a running session. Handlers in [study] and [mock] own everything they need,
//! nothing is kept in globals.

pub mod mock;
pub mod study;

use std::{fmt::Display, str::FromStr, sync::Arc};

use anyhow::anyhow;
use chrono::{DateTime, Duration, Local};

use crate::{
    storage::entities::QuestionRow,
    timer::TimeLimit,
    utils::{percentage::Accuracy, time::session_id},
};

#[derive(Debug, Clone)]
pub struct Session {
    pub id: Arc<str>,
    pub description: Arc<str>,
    pub created_at: DateTime<Local>,
    pub question_limit: TimeLimit,
    /// Whole session ends once this is reached. Study sessions run until the user leaves.
    pub total_duration: Option<TimeLimit>,
}

impl Session {
    pub fn new(
        description: impl Into<Arc<str>>,
        created_at: DateTime<Local>,
        question_limit: TimeLimit,
        total_duration: Option<TimeLimit>,
    ) -> Self {
        Self {
            id: session_id(created_at).into(),
            description: description.into(),
            created_at,
            question_limit,
            total_duration,
        }
    }

    /// Moment that lies `seconds` ticks after the session was created.
    pub fn moment_after(&self, seconds: u32) -> DateTime<Local> {
        self.created_at + Duration::seconds(seconds.into())
    }
}

/// Kind of work a question needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Thinking,
    Solving,
    Applying,
    Verification,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Thinking,
        Category::Solving,
        Category::Applying,
        Category::Verification,
    ];
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Category::Thinking => "Thinking",
            Category::Solving => "Solving",
            Category::Applying => "Applying",
            Category::Verification => "Verification",
        };
        write!(f, "{name}")
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    /// Accepts the full name or its first letter, in any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| {
                let name = c.to_string().to_lowercase();
                name == s || (s.len() == 1 && name.starts_with(&s))
            })
            .ok_or_else(|| anyhow!("Unknown category '{s}'"))
    }
}

/// A question whose timer was stopped. Never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionRecord {
    pub number: u32,
    pub elapsed_seconds: u32,
    pub categories: Vec<Category>,
    pub theme: Option<String>,
    pub note: String,
    pub exceeded: bool,
    pub finished_at: DateTime<Local>,
}

impl QuestionRecord {
    pub fn to_row(&self, session: &Session) -> QuestionRow {
        QuestionRow {
            session_id: session.id.clone(),
            description: session.description.clone(),
            question: self.number,
            categories: self.categories.iter().map(|c| c.to_string()).collect(),
            limit_seconds: session.question_limit.seconds(),
            elapsed_seconds: self.elapsed_seconds,
            exceeded: self.exceeded,
            timestamp: self.finished_at.naive_local(),
            theme: self.theme.clone(),
            notes: self.note.clone(),
        }
    }
}

/// Counts started questions and keeps the finished ones.
#[derive(Debug, Default, Clone)]
pub struct SessionTally {
    started: u32,
    records: Vec<QuestionRecord>,
}

impl SessionTally {
    pub fn question_started(&mut self) {
        self.started += 1;
    }

    pub fn complete(&mut self, record: QuestionRecord) {
        self.records.push(record);
    }

    pub fn started(&self) -> u32 {
        self.started
    }

    pub fn attempted(&self) -> u32 {
        self.records.len() as u32
    }

    pub fn records(&self) -> &[QuestionRecord] {
        &self.records
    }

    pub fn durations(&self) -> Vec<u32> {
        self.records.iter().map(|r| r.elapsed_seconds).collect()
    }

    pub fn total_seconds(&self) -> u64 {
        self.records.iter().map(|r| u64::from(r.elapsed_seconds)).sum()
    }

    pub fn overruns(&self) -> usize {
        self.records.iter().filter(|r| r.exceeded).count()
    }

    /// Questions whose final time is at or over `limit`.
    pub fn late_count(&self, limit: TimeLimit) -> usize {
        self.records
            .iter()
            .filter(|r| limit.is_exceeded_by(r.elapsed_seconds))
            .count()
    }

    pub fn accuracy(&self, correct: u32) -> Accuracy {
        Accuracy::of(correct.into(), self.attempted().into())
    }
}

/// The user reports mistakes, the logs keep correct answers.
pub fn correct_from_wrong(attempted: u32, wrong: u32) -> u32 {
    attempted.saturating_sub(wrong)
}

#[cfg(test)]
mod tests {
    use chrono::{Local, TimeZone};

    use crate::timer::TimeLimit;

    use super::{correct_from_wrong, Category, QuestionRecord, Session, SessionTally};

    fn record(number: u32, elapsed_seconds: u32) -> QuestionRecord {
        QuestionRecord {
            number,
            elapsed_seconds,
            categories: vec![],
            theme: None,
            note: String::new(),
            exceeded: false,
            finished_at: Local.with_ymd_and_hms(2024, 1, 29, 14, 30, 0).unwrap(),
        }
    }

    #[test]
    fn tally_counts_started_and_attempted() {
        let mut tally = SessionTally::default();
        for _ in 0..3 {
            tally.question_started();
        }
        tally.complete(record(1, 30));
        tally.complete(record(2, 240));

        assert_eq!(tally.started(), 3);
        assert_eq!(tally.attempted(), 2);
        assert_eq!(tally.total_seconds(), 270);
        assert_eq!(tally.late_count(TimeLimit::from_minutes(4)), 1);
    }

    #[test]
    fn tally_accuracy() {
        let mut tally = SessionTally::default();
        assert_eq!(tally.accuracy(0).to_string(), "N/A");
        for i in 0..10 {
            tally.complete(record(i, 10));
        }
        assert_eq!(tally.accuracy(7).to_string(), "70.0%");
    }

    #[test]
    fn wrong_answers_never_go_negative() {
        assert_eq!(correct_from_wrong(10, 3), 7);
        assert_eq!(correct_from_wrong(2, 5), 0);
    }

    #[test]
    fn category_parsing() {
        assert_eq!("solving".parse::<Category>().unwrap(), Category::Solving);
        assert_eq!(" V ".parse::<Category>().unwrap(), Category::Verification);
        assert!("sol".parse::<Category>().is_err());
    }

    #[test]
    fn record_row_carries_session_fields() {
        let created = Local.with_ymd_and_hms(2024, 1, 29, 14, 30, 0).unwrap();
        let session = Session::new("Physics", created, TimeLimit::from_minutes(2), None);
        let mut question = record(4, 55);
        question.categories = vec![Category::Thinking, Category::Applying];
        question.finished_at = session.moment_after(90);

        let row = question.to_row(&session);

        assert_eq!(&*row.session_id, "20240129_143000");
        assert_eq!(row.limit_seconds, 120);
        assert_eq!(row.categories, vec!["Thinking", "Applying"]);
        assert_eq!(row.timestamp.to_string(), "2024-01-29 14:31:30");
    }
}
