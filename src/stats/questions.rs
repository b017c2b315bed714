use std::collections::BTreeMap;

use serde::Serialize;

use crate::{
    storage::entities::QuestionRow,
    timer::TimeLimit,
    utils::percentage::{ratio_percentage, Percentage},
};

use super::DurationStats;

const NO_CATEGORY: &str = "None";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QuestionTime {
    pub question: u32,
    pub seconds: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionEfficiency {
    pub question: u32,
    pub limit_seconds: u32,
    pub elapsed_seconds: u32,
    /// Positive when the question took longer than allowed.
    pub difference_seconds: i64,
    /// Allowed time relative to the time actually spent.
    pub efficiency: Option<Percentage>,
}

/// Analysis of a mock test log.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionSummary {
    pub durations: Option<DurationStats>,
    pub fastest: Option<QuestionTime>,
    pub slowest: Option<QuestionTime>,
    pub by_category: BTreeMap<String, DurationStats>,
    pub by_theme: BTreeMap<String, DurationStats>,
    pub over_limit: usize,
    pub average_overage_seconds: Option<f64>,
    pub within_limit: usize,
    pub average_saved_seconds: Option<f64>,
    pub efficiency: Vec<QuestionEfficiency>,
}

fn group_by<'a>(
    rows: &'a [QuestionRow],
    keys: impl Fn(&'a QuestionRow) -> Vec<String>,
) -> BTreeMap<String, DurationStats> {
    let mut groups = BTreeMap::<String, Vec<u32>>::new();
    for row in rows {
        for key in keys(row) {
            groups.entry(key).or_default().push(row.elapsed_seconds);
        }
    }
    groups
        .into_iter()
        .filter_map(|(key, values)| DurationStats::from_values(values).map(|s| (key, s)))
        .collect()
}

fn mean(values: &[i64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<i64>() as f64 / values.len() as f64)
    }
}

pub fn summarize_questions(rows: &[QuestionRow]) -> QuestionSummary {
    // Earlier questions win ties.
    let fastest = rows
        .iter()
        .min_by_key(|r| r.elapsed_seconds)
        .map(|r| QuestionTime {
            question: r.question,
            seconds: r.elapsed_seconds,
        });
    let slowest = rows
        .iter()
        .max_by_key(|r| (r.elapsed_seconds, std::cmp::Reverse(r.question)))
        .map(|r| QuestionTime {
            question: r.question,
            seconds: r.elapsed_seconds,
        });

    let by_category = group_by(rows, |r| {
        if r.categories.is_empty() {
            vec![NO_CATEGORY.into()]
        } else {
            r.categories.clone()
        }
    });
    let by_theme = group_by(rows, |r| {
        r.theme
            .as_ref()
            .filter(|v| !v.is_empty())
            .map(|v| vec![v.clone()])
            .unwrap_or_default()
    });

    let efficiency = rows
        .iter()
        .map(|r| QuestionEfficiency {
            question: r.question,
            limit_seconds: r.limit_seconds,
            elapsed_seconds: r.elapsed_seconds,
            difference_seconds: i64::from(r.elapsed_seconds) - i64::from(r.limit_seconds),
            efficiency: ratio_percentage(r.limit_seconds.into(), r.elapsed_seconds.into()),
        })
        .collect::<Vec<_>>();

    let (over, within): (Vec<_>, Vec<_>) = efficiency.iter().partition(|e| {
        TimeLimit::from_seconds(e.limit_seconds).is_exceeded_by(e.elapsed_seconds)
    });
    let overage = over.iter().map(|e| e.difference_seconds).collect::<Vec<_>>();
    let saved = within.iter().map(|e| -e.difference_seconds).collect::<Vec<_>>();

    QuestionSummary {
        durations: DurationStats::from_values(rows.iter().map(|r| r.elapsed_seconds)),
        fastest,
        slowest,
        by_category,
        by_theme,
        over_limit: over.len(),
        average_overage_seconds: mean(&overage),
        within_limit: within.len(),
        average_saved_seconds: mean(&saved),
        efficiency,
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDateTime;

    use crate::storage::entities::QuestionRow;

    use super::summarize_questions;

    fn row(question: u32, categories: &[&str], elapsed_seconds: u32, theme: Option<&str>) -> QuestionRow {
        QuestionRow {
            session_id: "20240129_143000".into(),
            description: "JEE Main Physics".into(),
            question,
            categories: categories.iter().map(|c| c.to_string()).collect(),
            limit_seconds: 120,
            elapsed_seconds,
            exceeded: elapsed_seconds >= 120,
            timestamp: NaiveDateTime::default(),
            theme: theme.map(str::to_string),
            notes: String::new(),
        }
    }

    #[test]
    fn empty_log_has_no_data() {
        let summary = summarize_questions(&[]);
        assert!(summary.durations.is_none());
        assert!(summary.fastest.is_none());
        assert!(summary.by_category.is_empty());
        assert_eq!(summary.average_overage_seconds, None);
        assert_eq!(summary.average_saved_seconds, None);
    }

    #[test]
    fn groups_and_limits() {
        let rows = vec![
            row(1, &["Thinking"], 150, Some("Optics")),
            row(2, &["Solving", "Verification"], 60, Some("Mechanics")),
            row(3, &[], 90, Some("Optics")),
            row(4, &["Thinking"], 246, None),
            row(5, &["Solving"], 60, Some("")),
        ];

        let summary = summarize_questions(&rows);

        let durations = summary.durations.unwrap();
        assert_eq!(durations.sum, 606);
        assert_eq!(summary.fastest.unwrap().question, 2);
        assert_eq!(summary.slowest.unwrap().question, 4);

        assert_eq!(summary.by_category["Thinking"].count, 2);
        assert_eq!(summary.by_category["Thinking"].mean, 198.);
        assert_eq!(summary.by_category["Solving"].sum, 120);
        assert_eq!(summary.by_category["Verification"].count, 1);
        assert_eq!(summary.by_category["None"].sum, 90);
        assert_eq!(summary.by_theme.len(), 2);
        assert_eq!(summary.by_theme["Optics"].sum, 240);

        assert_eq!(summary.over_limit, 2);
        assert_eq!(summary.average_overage_seconds, Some(78.));
        assert_eq!(summary.within_limit, 3);
        assert_eq!(summary.average_saved_seconds, Some(50.));
        assert_eq!(summary.efficiency[1].difference_seconds, -60);
        assert_eq!(*summary.efficiency[1].efficiency.unwrap(), 200.);
    }
}
