use std::{
    collections::BTreeMap,
    fmt::Display,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Local, NaiveDateTime};
use chrono_english::parse_date_string;
use clap::{CommandFactory, ValueEnum};
use now::DateTimeNow;
use serde::Serialize;

use crate::{
    stats::{
        questions::{summarize_questions, QuestionSummary},
        summarize_sessions, DurationStats, SessionSummary,
    },
    storage::{csv_log::CsvLog, entities::QuestionRow},
    timer::TimeLimit,
    utils::time::{format_clock, next_day_start},
};

use super::{
    mock::MOCK_LOG_DIR,
    study::{subject_log, RECENT_SESSIONS},
    Args,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

#[derive(Debug, clap::Args)]
pub struct StatsCommand {
    #[arg(long, short, help = "Subject whose sessions are summarized")]
    subject: String,
    #[arg(
        long,
        help = "Only sessions logged at or after this moment. Examples are \"yesterday\", \"1 week ago\", \"15/03/2025\""
    )]
    since: Option<String>,
    #[arg(
        long,
        help = "Only sessions logged before this moment. Examples are \"today\", \"1 hour ago\", \"12:00 16/03/2025\""
    )]
    until: Option<String>,
    #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
    date_style: DateStyle,
    #[arg(
        long = "days",
        default_value_t = false,
        help = "Take inputs as whole days. For example if since and until are both 15/03/2025 this option selects the whole day"
    )]
    treat_as_days: bool,
    #[arg(
        long,
        short,
        default_value_t = 4,
        value_parser = clap::value_parser!(u32).range(1..=600),
        help = "Minutes per question. Durations at or over it are counted as late"
    )]
    limit: u32,
    #[arg(long, default_value_t = RECENT_SESSIONS, help = "Number of recent sessions listed")]
    recent: usize,
    #[arg(long, help = "Print the summary as JSON")]
    json: bool,
}

#[derive(Debug, clap::Args)]
pub struct ReviewCommand {
    #[arg(
        help = "Mock test log to analyze. Names that don't exist are looked up in the mock test log directory"
    )]
    file: PathBuf,
    #[arg(long, help = "Print the summary as JSON")]
    json: bool,
}

/// Half open range of local datetimes, unbounded where missing.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct DateRange {
    start: Option<NaiveDateTime>,
    end: Option<NaiveDateTime>,
}

impl DateRange {
    fn contains(&self, moment: NaiveDateTime) -> bool {
        self.start.map_or(true, |start| start <= moment) && self.end.map_or(true, |end| moment < end)
    }
}

fn parse_date(
    label: &str,
    value: Option<String>,
    now: DateTime<Local>,
    date_style: DateStyle,
) -> Result<Option<DateTime<Local>>> {
    match value.map(|s| parse_date_string(&s, now, date_style.into())) {
        Some(Ok(v)) => Ok(Some(v.with_timezone(&Local))),
        Some(Err(e)) => Err(Args::command()
            .error(
                clap::error::ErrorKind::ValueValidation,
                format!("Failed to validate {label} date {e}"),
            )
            .into()),
        None => Ok(None),
    }
}

fn parse_range(
    since: Option<String>,
    until: Option<String>,
    date_style: DateStyle,
    treat_as_days: bool,
    now: DateTime<Local>,
) -> Result<DateRange> {
    let mut start = parse_date("since", since, now, date_style)?;
    let mut end = parse_date("until", until, now, date_style)?;
    if treat_as_days {
        start = start.map(|v| v.beginning_of_day());
        end = match end {
            Some(v) => Some(next_day_start(v).ok_or_else(|| anyhow!("Can't find the day after {v}"))?),
            None => None,
        };
    }
    if let (Some(start), Some(end)) = (start, end) {
        if start >= end {
            return Err(Args::command()
                .error(
                    clap::error::ErrorKind::ValueValidation,
                    format!("Range start {start} is not before its end {end}"),
                )
                .into());
        }
    }
    Ok(DateRange {
        start: start.map(|v| v.naive_local()),
        end: end.map(|v| v.naive_local()),
    })
}

pub async fn process_stats_command(
    StatsCommand {
        subject,
        since,
        until,
        date_style,
        treat_as_days,
        limit,
        recent,
        json,
    }: StatsCommand,
    app_dir: &Path,
) -> Result<()> {
    let range = parse_range(since, until, date_style, treat_as_days, Local::now())?;
    let log = subject_log(app_dir, &subject);
    let rows = log
        .read_all()
        .await?
        .into_iter()
        .filter(|row| range.contains(row.datetime))
        .collect::<Vec<_>>();

    let summary = summarize_sessions(&rows, TimeLimit::from_minutes(limit), recent);
    if json {
        print_json(&summary)?;
    } else {
        println!("Subject: {subject} ({:?})", log.path());
        print_session_summary(&summary);
    }
    Ok(())
}

pub async fn process_review_command(
    ReviewCommand { file, json }: ReviewCommand,
    app_dir: &Path,
) -> Result<()> {
    let path = if file.exists() {
        file
    } else {
        app_dir.join(MOCK_LOG_DIR).join(file)
    };
    if !path.exists() {
        bail!("No mock test log at {path:?}");
    }

    let rows = CsvLog::<QuestionRow>::new(path.clone()).read_all().await?;
    let summary = summarize_questions(&rows);
    if json {
        print_json(&summary)?;
    } else {
        if let Some(first) = rows.first() {
            println!("Test: {} ({})", first.description, first.session_id);
        }
        println!("Log: {path:?}");
        print_question_summary(&summary);
    }
    Ok(())
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn clock(seconds: u64) -> String {
    format_clock(seconds.try_into().unwrap_or(u32::MAX))
}

fn print_durations(stats: &DurationStats) {
    println!("Average question duration: {:.1}s", stats.mean);
    println!(
        "Fastest question: {}s, Slowest question: {}s",
        stats.min, stats.max
    );
}

pub(super) fn print_session_summary(summary: &SessionSummary) {
    println!("\n--- Subject summary ---");
    println!("Sessions recorded: {}", summary.sessions);
    println!("Total questions attempted: {}", summary.total_attempted);
    println!("Total correct: {}", summary.total_correct);
    match summary.accuracy.value() {
        Some(accuracy) => println!("Overall accuracy: {accuracy}"),
        None => println!("Overall accuracy: N/A (no attempted questions)"),
    }
    match &summary.durations {
        Some(durations) => {
            print_durations(durations);
            println!(
                "Questions finished at or after {}s: {}",
                summary.limit_seconds, summary.late
            );
        }
        None => println!("No per-question durations recorded yet."),
    }

    if !summary.recent.is_empty() {
        println!("\nPer-session accuracy (most recent first):");
        for line in &summary.recent {
            let average = line
                .average_seconds
                .map_or_else(|| "N/A".to_string(), |v| format!("{v:.1}s"));
            println!(
                "{} | attempted={} correct={} acc={} avg_q={average}",
                line.datetime.format("%Y-%m-%d %H:%M:%S"),
                line.attempted,
                line.correct,
                line.accuracy
            );
        }
    }
    println!("--- end summary ---\n");
}

fn print_group_table(title: &str, groups: &BTreeMap<String, DurationStats>) {
    if groups.is_empty() {
        return;
    }
    println!("\n{title}");
    println!("{:<20}{:>8}{:>12}{:>12}", "", "Count", "Total", "Average");
    for (name, stats) in groups {
        println!(
            "{name:<20}{:>8}{:>12}{:>11.1}s",
            stats.count,
            clock(stats.sum),
            stats.mean
        );
    }
}

pub(super) fn print_question_summary(summary: &QuestionSummary) {
    let Some(durations) = &summary.durations else {
        println!("No questions recorded in this log.");
        return;
    };

    println!("\nTotal questions: {}", durations.count);
    println!("Total time: {}", clock(durations.sum));
    println!("Average time per question: {:.1}s", durations.mean);
    if let (Some(fastest), Some(slowest)) = (&summary.fastest, &summary.slowest) {
        println!(
            "Fastest: Q{} ({}s), Slowest: Q{} ({}s)",
            fastest.question, fastest.seconds, slowest.question, slowest.seconds
        );
    }

    print_group_table("TIME BY CATEGORY", &summary.by_category);
    print_group_table("TIME BY THEME", &summary.by_theme);

    println!("\nTIME EFFICIENCY");
    println!(
        "{:<10}{:>10}{:>10}{:>12}{:>12}",
        "Question", "Elapsed", "Limit", "Difference", "Efficiency"
    );
    for line in &summary.efficiency {
        let efficiency = line
            .efficiency
            .map_or_else(|| "N/A".to_string(), |v| v.to_string());
        println!(
            "{:<10}{:>10}{:>10}{:>+12}{:>12}",
            format!("Q{}", line.question),
            line.elapsed_seconds,
            line.limit_seconds,
            line.difference_seconds,
            efficiency
        );
    }

    println!("\nPERFORMANCE");
    let overage = summary
        .average_overage_seconds
        .map_or_else(String::new, |v| format!(", average overage {v:.1}s"));
    println!(
        "Over the limit: {}/{}{overage}",
        summary.over_limit, durations.count
    );
    let saved = summary
        .average_saved_seconds
        .map_or_else(String::new, |v| format!(", average time saved {v:.1}s"));
    println!(
        "Within the limit: {}/{}{saved}",
        summary.within_limit, durations.count
    );
}

#[cfg(test)]
mod tests {
    use chrono::{Local, NaiveDate, NaiveDateTime, TimeZone};

    use super::{parse_range, DateRange, DateStyle};

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn empty_range_contains_everything() {
        assert!(DateRange::default().contains(at(15, 12)));
    }

    #[test]
    fn range_is_half_open() {
        let range = DateRange {
            start: Some(at(15, 0)),
            end: Some(at(16, 0)),
        };
        assert!(range.contains(at(15, 0)));
        assert!(range.contains(at(15, 23)));
        assert!(!range.contains(at(16, 0)));
        assert!(!range.contains(at(14, 23)));
    }

    #[test]
    fn whole_days_cover_the_end_date() {
        let now = Local.with_ymd_and_hms(2025, 3, 20, 12, 0, 0).unwrap();
        let range = parse_range(
            Some("15/03/2025".into()),
            Some("15/03/2025".into()),
            DateStyle::Uk,
            true,
            now,
        )
        .unwrap();
        assert_eq!(range.start, Some(at(15, 0)));
        assert_eq!(range.end, Some(at(16, 0)));
    }

    #[test]
    fn reversed_range_is_rejected() {
        let now = Local.with_ymd_and_hms(2025, 3, 20, 12, 0, 0).unwrap();
        assert!(parse_range(
            Some("16/03/2025".into()),
            Some("15/03/2025".into()),
            DateStyle::Uk,
            false,
            now,
        )
        .is_err());
    }

    #[test]
    fn invalid_date_is_rejected() {
        assert!(parse_range(Some("not a date".into()), None, DateStyle::Uk, false, Local::now()).is_err());
    }
}
