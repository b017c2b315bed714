use std::{io::Write, ops::ControlFlow};

use ansi_term::Colour::Red;
use anyhow::Result;
use chrono::NaiveDateTime;
use tracing::info;

use crate::{
    alarm::Alarm,
    storage::entities::SessionRow,
    timer::{ticker::TickHandler, ItemTimer, TickOutcome, TimeLimit},
    utils::time::format_clock,
};

use super::{correct_from_wrong, QuestionRecord, Session, SessionTally};

/// Study session driven by single lines: an empty line finishes the running question and starts
/// the next one, the exit letter ends the session.
pub struct StudySession {
    session: Session,
    exit_key: char,
    current: Option<ItemTimer>,
    wall: ItemTimer,
    tally: SessionTally,
    alarm: Box<dyn Alarm>,
}

impl StudySession {
    pub fn new(session: Session, exit_key: char, alarm: Box<dyn Alarm>) -> Self {
        Self {
            session,
            exit_key,
            current: None,
            wall: ItemTimer::unlimited(),
            tally: SessionTally::default(),
            alarm,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn is_exit(&self, line: &str) -> bool {
        let mut chars = line.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => c.to_lowercase().eq(self.exit_key.to_lowercase()),
            _ => false,
        }
    }

    fn start_question(&mut self) {
        // Wall time is measured from the first question, not from the prompts.
        self.wall.start();
        let mut timer = ItemTimer::new(self.session.question_limit);
        timer.start();
        self.current = Some(timer);
        self.tally.question_started();
        println!("\nTimer started (question #{}).", self.tally.started());
    }

    fn end_question(&mut self) -> Option<u32> {
        let mut timer = self.current.take()?;
        let elapsed = timer.stop();
        self.tally.complete(QuestionRecord {
            number: self.tally.attempted() + 1,
            elapsed_seconds: elapsed,
            categories: vec![],
            theme: None,
            note: String::new(),
            exceeded: timer.overran(),
            finished_at: self.session.moment_after(self.wall.elapsed()),
        });
        println!("\nTimer ended, elapsed {elapsed}s.");
        Some(elapsed)
    }

    pub fn handle_line(&mut self, line: &str) -> ControlFlow<()> {
        if self.is_exit(line) {
            println!("\nExiting session.");
            return ControlFlow::Break(());
        }
        if line.is_empty() {
            self.end_question();
            self.start_question();
        } else {
            println!("Received input: {line}");
        }
        ControlFlow::Continue(())
    }

    pub fn handle_tick(&mut self) {
        self.wall.tick();
        let Some(timer) = self.current.as_mut() else {
            return;
        };
        if timer.tick() == TickOutcome::Overrun {
            println!(
                "\nTimer exceeded {}; press Enter to end the question.",
                format_clock(self.session.question_limit.seconds())
            );
            self.alarm.alert();
        }
    }

    /// Single line describing the running question.
    pub fn status_line(&self) -> Option<String> {
        let timer = self.current.as_ref()?;
        if timer.is_overdue() {
            let over = timer.elapsed() - self.session.question_limit.seconds();
            Some(format!(
                "{} (press Enter to end and start next)",
                Red.bold().paint(format!("Overdue: +{}", format_clock(over)))
            ))
        } else {
            Some(format!(
                "Time left: {} (press Enter to end and start next)",
                format_clock(timer.remaining().unwrap_or_default())
            ))
        }
    }

    /// Closes the session. A question that is still running was never finished, so it counts
    /// as started but not attempted.
    pub fn finish(mut self) -> StudySummary {
        let wall_seconds = self.wall.stop();
        if let Some(mut timer) = self.current.take() {
            info!("Discarding unfinished question at {}s", timer.stop());
        }
        StudySummary {
            wall_seconds,
            limit: self.session.question_limit,
            tally: self.tally,
        }
    }
}

impl TickHandler for StudySession {
    async fn on_input(&mut self, line: String) -> Result<ControlFlow<()>> {
        Ok(self.handle_line(&line))
    }

    async fn on_tick(&mut self) -> Result<ControlFlow<()>> {
        self.handle_tick();
        if let Some(status) = self.status_line() {
            print!("\r{status} ");
            std::io::stdout().flush()?;
        }
        Ok(ControlFlow::Continue(()))
    }
}

#[derive(Debug, Clone)]
pub struct StudySummary {
    pub wall_seconds: u32,
    pub limit: TimeLimit,
    pub tally: SessionTally,
}

impl StudySummary {
    pub fn late_count(&self) -> usize {
        self.tally.late_count(self.limit)
    }

    pub fn to_row(&self, wrong: u32, datetime: NaiveDateTime) -> SessionRow {
        SessionRow {
            datetime,
            session_wall_seconds: self.wall_seconds,
            questions_started: self.tally.started(),
            questions_attempted: self.tally.attempted(),
            questions_correct: correct_from_wrong(self.tally.attempted(), wrong),
            durations: self.tally.durations(),
        }
    }
}
