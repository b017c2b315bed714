use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::csv_log::LogRow;

/// One finished study session. Column names match the files written by earlier versions of the
/// study logger, so those files can still be read.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
pub struct SessionRow {
    #[serde(with = "local_datetime")]
    pub datetime: NaiveDateTime,
    pub session_wall_seconds: u32,
    pub questions_started: u32,
    pub questions_attempted: u32,
    pub questions_correct: u32,
    #[serde(rename = "per_question_durations_seconds", with = "semicolon_list")]
    pub durations: Vec<u32>,
}

impl LogRow for SessionRow {
    const HEADER: &'static [&'static str] = &[
        "datetime",
        "session_wall_seconds",
        "questions_started",
        "questions_attempted",
        "questions_correct",
        "per_question_durations_seconds",
    ];
}

/// One finished question of a mock test.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
pub struct QuestionRow {
    pub session_id: Arc<str>,
    pub description: Arc<str>,
    pub question: u32,
    #[serde(with = "semicolon_list")]
    pub categories: Vec<String>,
    pub limit_seconds: u32,
    pub elapsed_seconds: u32,
    pub exceeded: bool,
    #[serde(with = "local_datetime")]
    pub timestamp: NaiveDateTime,
    pub theme: Option<String>,
    pub notes: String,
}

impl LogRow for QuestionRow {
    const HEADER: &'static [&'static str] = &[
        "session_id",
        "description",
        "question",
        "categories",
        "limit_seconds",
        "elapsed_seconds",
        "exceeded",
        "timestamp",
        "theme",
        "notes",
    ];
}

/// Local time without offset, `2024-01-29 14:30:00`.
mod local_datetime {
    use chrono::NaiveDateTime;
    use serde::{self, Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S>(moment: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&moment.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(s.trim(), FORMAT).map_err(serde::de::Error::custom)
    }
}

/// Lists are kept inside a single column, joined with `;`.
mod semicolon_list {
    use std::{fmt::Display, str::FromStr};

    use serde::{self, Deserialize, Deserializer, Serializer};

    #[allow(clippy::ptr_arg)]
    pub fn serialize<S, T>(values: &Vec<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Display,
    {
        let joined = values
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(";");
        serializer.serialize_str(&joined)
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: FromStr,
        T::Err: Display,
    {
        let s = String::deserialize(deserializer)?;
        s.split(';')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| v.parse::<T>().map_err(serde::de::Error::custom))
            .collect()
    }
}
