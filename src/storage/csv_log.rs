use std::{
    io::ErrorKind,
    marker::PhantomData,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use fs4::tokio::AsyncFileExt;
use serde::{de::DeserializeOwned, Serialize};
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncWriteExt},
};
use tracing::{debug, warn};

/// A row type that can live in a [CsvLog]. Field order of the serialized struct must match
/// `HEADER`.
pub trait LogRow: Serialize + DeserializeOwned {
    const HEADER: &'static [&'static str];
}

/// Append-only CSV file.
pub struct CsvLog<R> {
    path: PathBuf,
    row: PhantomData<fn() -> R>,
}

impl<R: LogRow> CsvLog<R> {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            row: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the file with its header row. Existing files are left untouched, so this can be
    /// called any number of times.
    pub async fn ensure(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Can't create log directory {parent:?}"))?;
        }

        let mut file = match File::options()
            .write(true)
            .create_new(true)
            .open(&self.path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!("Log {:?} already exists", self.path);
                return Ok(());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Can't create log {:?}", self.path));
            }
        };

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(vec![]);
        writer.write_record(R::HEADER)?;
        let header = writer.into_inner().map_err(|e| e.into_error())?;

        file.write_all(&header).await?;
        file.flush().await?;
        debug!("Created log {:?}", self.path);
        Ok(())
    }

    /// Appends rows at the end of the file. The file must exist, see [CsvLog::ensure].
    pub async fn append(&self, rows: &[R]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let buffer = encode_rows(rows)?;

        let mut file = File::options()
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("Can't open log {:?} for appending", self.path))?;

        // Semi-safe acquire-release for a file
        file.lock_exclusive()?;
        let result = async {
            file.write_all(&buffer).await?;
            file.flush().await
        }
        .await;
        file.unlock_async().await?;
        result.with_context(|| format!("Failed writing to log {:?}", self.path))?;

        debug!("Appended {} rows to {:?}", rows.len(), self.path);
        Ok(())
    }

    /// Reads every parsable row. A missing file is the same as an empty one.
    pub async fn read_all(&self) -> Result<Vec<R>> {
        let mut file = match File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e).with_context(|| format!("Can't open log {:?}", self.path)),
        };

        file.lock_shared()?;
        let mut bytes = vec![];
        let result = file.read_to_end(&mut bytes).await;
        file.unlock_async().await?;
        result.with_context(|| format!("Can't read log {:?}", self.path))?;

        Ok(decode_rows(&bytes, &self.path))
    }
}

fn encode_rows<R: Serialize>(rows: &[R]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(vec![]);
    for row in rows {
        writer.serialize(row)?;
    }
    Ok(writer.into_inner().map_err(|e| e.into_error())?)
}

fn decode_rows<R: DeserializeOwned>(bytes: &[u8], path: &Path) -> Vec<R> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let mut rows = vec![];
    for record in reader.deserialize::<R>() {
        match record {
            Ok(v) => rows.push(v),
            Err(e) => {
                // ignore illegal rows. Might come from manual edits or a cut off write
                warn!("Skipping malformed row in {path:?}: {e}")
            }
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use anyhow::Result;
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
    use tempfile::tempdir;

    use crate::{
        storage::entities::{QuestionRow, SessionRow},
        utils::logging::TEST_LOGGING,
    };

    use super::CsvLog;

    const TEST_START_DATE: NaiveDateTime = NaiveDateTime::new(
        NaiveDate::from_ymd_opt(2018, 7, 4).unwrap(),
        NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
    );

    fn session_row(attempted: u32, durations: Vec<u32>) -> SessionRow {
        SessionRow {
            datetime: TEST_START_DATE,
            session_wall_seconds: durations.iter().sum(),
            questions_started: attempted + 1,
            questions_attempted: attempted,
            questions_correct: attempted / 2,
            durations,
        }
    }

    #[tokio::test]
    async fn ensure_writes_header_once() -> Result<()> {
        let dir = tempdir()?;
        let log = CsvLog::<SessionRow>::new(dir.path().join("nested").join("sessions.csv"));
        log.ensure().await?;
        log.append(&[session_row(2, vec![30, 60])]).await?;
        log.ensure().await?;

        let content = std::fs::read_to_string(log.path())?;
        assert_eq!(
            content,
            "datetime,session_wall_seconds,questions_started,questions_attempted,questions_correct,per_question_durations_seconds\n\
             2018-07-04 09:30:00,90,3,2,1,30;60\n"
        );
        Ok(())
    }

    #[tokio::test]
    async fn append_leaves_previous_rows_untouched() -> Result<()> {
        let dir = tempdir()?;
        let log = CsvLog::<SessionRow>::new(dir.path().join("sessions.csv"));
        log.ensure().await?;

        log.append(&[session_row(1, vec![45])]).await?;
        let before = std::fs::read(log.path())?;
        log.append(&[session_row(3, vec![10, 20, 30])]).await?;
        let after = std::fs::read(log.path())?;

        assert!(after.len() > before.len());
        assert_eq!(&after[..before.len()], &before[..]);
        assert_eq!(log.read_all().await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn append_to_missing_file_fails() -> Result<()> {
        let dir = tempdir()?;
        let log = CsvLog::<SessionRow>::new(dir.path().join("missing.csv"));
        assert!(log.append(&[session_row(1, vec![1])]).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn missing_file_reads_as_empty() -> Result<()> {
        let dir = tempdir()?;
        let log = CsvLog::<SessionRow>::new(dir.path().join("missing.csv"));
        assert!(log.read_all().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn malformed_rows_are_skipped() -> Result<()> {
        *TEST_LOGGING;
        let dir = tempdir()?;
        let path = dir.path().join("sessions.csv");
        let mut file = std::fs::File::create(&path)?;
        write!(
            file,
            "datetime,session_wall_seconds,questions_started,questions_attempted,questions_correct,per_question_durations_seconds\n\
             2024-01-29 14:30:00,300,5,4,3,60;70;80;90\n\
             not a date,1,1,1,1,1\n\
             2024-01-29 15:00:00,oops,1,1,1,5\n\
             2024-01-29 16:00:00,10\n\
             2024-01-30 08:00:00,120,2,2,2,\n"
        )?;

        let rows = CsvLog::<SessionRow>::new(path).read_all().await?;

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].durations, vec![60, 70, 80, 90]);
        assert!(rows[1].durations.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn question_rows_keep_free_text() -> Result<()> {
        let dir = tempdir()?;
        let log = CsvLog::<QuestionRow>::new(dir.path().join("mock.csv"));
        log.ensure().await?;
        let row = QuestionRow {
            session_id: "20240129_143000".into(),
            description: "JEE Main, Physics".into(),
            question: 2,
            categories: vec!["Solving".into(), "Verification".into()],
            limit_seconds: 120,
            elapsed_seconds: 192,
            exceeded: true,
            timestamp: TEST_START_DATE,
            theme: None,
            notes: "Had to draw a \"force\" diagram".into(),
        };
        log.append(&[row.clone()]).await?;

        assert_eq!(log.read_all().await?, vec![row]);
        Ok(())
    }
}
