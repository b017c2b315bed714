use std::{collections::BTreeSet, io::Write, ops::ControlFlow, str::FromStr};

use ansi_term::Colour::Red;
use anyhow::{anyhow, bail, Result};
use tracing::{debug, info};

use crate::{
    alarm::Alarm,
    storage::{csv_log::CsvLog, entities::QuestionRow},
    timer::{ticker::TickHandler, ItemTimer, TickOutcome, TimerState},
    utils::time::format_clock,
};

use super::{Category, QuestionRecord, Session, SessionTally};

/// A line typed during a mock test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCommand {
    /// Stop the current question and start the next one.
    Next,
    /// Start or resume a question, the current one by default.
    Start(Option<u32>),
    Pause,
    ToggleCategory(Category),
    Theme(String),
    Note(String),
    Save,
    End,
    Help,
}

impl FromStr for MockCommand {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (command, rest) = match s.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (s, ""),
        };
        let command = match command.to_lowercase().as_str() {
            "" | "n" | "next" => MockCommand::Next,
            "s" | "start" if rest.is_empty() => MockCommand::Start(None),
            "s" | "start" => MockCommand::Start(Some(
                rest.parse()
                    .map_err(|_| anyhow!("'{rest}' is not a question number"))?,
            )),
            "p" | "pause" => MockCommand::Pause,
            "c" | "cat" | "category" => MockCommand::ToggleCategory(rest.parse()?),
            "t" | "theme" => MockCommand::Theme(rest.to_string()),
            "note" => MockCommand::Note(rest.to_string()),
            "save" => MockCommand::Save,
            "q" | "end" => MockCommand::End,
            "h" | "help" | "?" => MockCommand::Help,
            _ => bail!("Unknown command '{s}'"),
        };
        Ok(command)
    }
}

const HELP: &str = "\
Commands:
  <Enter> | n        stop the current question and start the next one
  s [N]              start or resume question N (current question by default)
  p                  pause the current question
  c <category>       toggle Thinking, Solving, Applying or Verification
  t <theme>          set the theme of the current question, empty to clear
  note <text>        set the note of the current question
  save               write finished questions to the log
  q | end            save and end the test";

struct QuestionSlot {
    timer: ItemTimer,
    categories: BTreeSet<Category>,
    theme: Option<String>,
    note: String,
}

impl QuestionSlot {
    fn touched(&self) -> bool {
        self.timer.state() != TimerState::Idle
            || !self.categories.is_empty()
            || self.theme.is_some()
            || !self.note.is_empty()
    }
}

/// Mock test with a fixed number of questions, each timed on its own, and a session clock that
/// ends the paper when the total duration runs out.
pub struct MockSession {
    session: Session,
    slots: Vec<QuestionSlot>,
    /// Index into `slots`. Equal to `slots.len()` after the last question was stopped.
    current: usize,
    clock: ItemTimer,
    tally: SessionTally,
    flushed: usize,
    ended: bool,
    log: CsvLog<QuestionRow>,
    alarm: Box<dyn Alarm>,
}

impl MockSession {
    /// Creates the session and starts the first question.
    pub fn start(
        session: Session,
        question_count: u32,
        log: CsvLog<QuestionRow>,
        alarm: Box<dyn Alarm>,
    ) -> Self {
        let slots = (0..question_count.max(1))
            .map(|_| QuestionSlot {
                timer: ItemTimer::new(session.question_limit),
                categories: BTreeSet::new(),
                theme: None,
                note: String::new(),
            })
            .collect();
        let clock = match session.total_duration {
            Some(total) => ItemTimer::new(total),
            None => ItemTimer::unlimited(),
        };
        let mut mock = Self {
            session,
            slots,
            current: 0,
            clock,
            tally: SessionTally::default(),
            flushed: 0,
            ended: false,
            log,
            alarm,
        };
        mock.clock.start();
        mock.resume(0);
        mock
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn tally(&self) -> &SessionTally {
        &self.tally
    }

    pub fn log(&self) -> &CsvLog<QuestionRow> {
        &self.log
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Number of the question edits apply to, if any is left.
    pub fn current_question(&self) -> Option<u32> {
        self.slots
            .get(self.current)
            .filter(|slot| !slot.timer.is_stopped())
            .map(|_| self.current as u32 + 1)
    }

    fn active_slot(&mut self) -> Result<&mut QuestionSlot> {
        match self.slots.get_mut(self.current) {
            Some(slot) if !slot.timer.is_stopped() => Ok(slot),
            _ => Err(anyhow!("No active question")),
        }
    }

    fn resume(&mut self, index: usize) {
        let slot = &mut self.slots[index];
        let first_start = slot.timer.state() == TimerState::Idle;
        if slot.timer.start() {
            if first_start {
                self.tally.question_started();
            }
            println!("\nQuestion {} running.", index + 1);
        }
    }

    fn record(&mut self, index: usize) {
        let finished_at = self.session.moment_after(self.clock.elapsed());
        let slot = &mut self.slots[index];
        let elapsed = slot.timer.stop();
        let record = QuestionRecord {
            number: index as u32 + 1,
            elapsed_seconds: elapsed,
            categories: slot.categories.iter().copied().collect(),
            theme: slot.theme.clone(),
            note: slot.note.clone(),
            exceeded: slot.timer.overran(),
            finished_at,
        };
        debug!("Recorded {record:?}");
        self.tally.complete(record);
    }

    /// Makes `number` the current question and runs it. Whatever ran before is paused so that
    /// only one question counts at a time.
    pub fn select(&mut self, number: Option<u32>) -> Result<()> {
        let index = match number {
            Some(number) if number == 0 || number as usize > self.slots.len() => {
                bail!("There is no question {number}")
            }
            Some(number) => number as usize - 1,
            None => self.current,
        };
        match self.slots.get(index) {
            Some(slot) if slot.timer.is_stopped() => bail!("Question {} is already recorded", index + 1),
            Some(_) => {}
            None => bail!("No active question"),
        }
        if index != self.current {
            if let Some(slot) = self.slots.get_mut(self.current) {
                slot.timer.pause();
            }
            self.current = index;
        }
        self.resume(index);
        Ok(())
    }

    pub fn pause(&mut self) -> Result<()> {
        let number = self.current + 1;
        if self.active_slot()?.timer.pause() {
            println!("\nQuestion {number} paused.");
        }
        Ok(())
    }

    /// Stops the current question and starts the following one.
    pub fn next(&mut self) -> Result<()> {
        self.active_slot()?;
        self.record(self.current);
        let recorded = self.current + 1;
        let elapsed = self.tally.records().last().map(|r| r.elapsed_seconds).unwrap_or_default();
        println!("\nQuestion {recorded} done in {}.", format_clock(elapsed));

        match (self.current + 1..self.slots.len()).find(|i| !self.slots[*i].timer.is_stopped()) {
            Some(next) => {
                self.current = next;
                self.resume(next);
            }
            None => {
                self.current = self.slots.len();
                println!("That was the last question, type 'q' to end the test.");
            }
        }
        Ok(())
    }

    pub fn toggle_category(&mut self, category: Category) -> Result<()> {
        let slot = self.active_slot()?;
        if !slot.categories.remove(&category) {
            slot.categories.insert(category);
        }
        let selected = slot
            .categories
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>();
        println!(
            "Categories: {}",
            if selected.is_empty() { "None".into() } else { selected.join(", ") }
        );
        Ok(())
    }

    pub fn set_theme(&mut self, theme: String) -> Result<()> {
        self.active_slot()?.theme = Some(theme).filter(|v| !v.is_empty());
        Ok(())
    }

    pub fn set_note(&mut self, note: String) -> Result<()> {
        self.active_slot()?.note = note;
        Ok(())
    }

    /// Writes every recorded question that isn't in the log yet. Running it again without new
    /// records writes nothing.
    pub async fn save(&mut self) -> Result<usize> {
        let rows = self.tally.records()[self.flushed..]
            .iter()
            .map(|record| record.to_row(&self.session))
            .collect::<Vec<_>>();
        self.log.append(&rows).await?;
        self.flushed += rows.len();
        info!("Saved {} questions into {:?}", rows.len(), self.log.path());
        Ok(rows.len())
    }

    /// Ends the test: every question that was worked on gets recorded, then everything is saved.
    /// Safe to call more than once.
    pub async fn finish(&mut self) -> Result<()> {
        if !self.ended {
            self.ended = true;
            self.clock.stop();
            for index in 0..self.slots.len() {
                if self.slots[index].touched() && !self.slots[index].timer.is_stopped() {
                    self.record(index);
                }
            }
            self.current = self.slots.len();
        }
        self.save().await?;
        Ok(())
    }

    /// Counts one second for the running question and the paper. The question is ticked first so
    /// the last second of the paper still belongs to it.
    pub fn handle_tick(&mut self) -> ControlFlow<()> {
        if let Some(slot) = self.slots.get_mut(self.current) {
            if slot.timer.tick() == TickOutcome::Overrun {
                println!(
                    "\nQuestion {} went over {}.",
                    self.current + 1,
                    format_clock(self.session.question_limit.seconds())
                );
                self.alarm.alert();
            }
        }
        if self.clock.tick() == TickOutcome::Overrun {
            return ControlFlow::Break(());
        }
        ControlFlow::Continue(())
    }

    /// Time on the current question, time spent on all questions and time left for the paper.
    pub fn status_line(&self) -> String {
        let total: u32 = self.slots.iter().map(|s| s.timer.elapsed()).sum();
        let question = match self.slots.get(self.current) {
            Some(slot) => {
                let time = format!("Q{} {}", self.current + 1, format_clock(slot.timer.elapsed()));
                if slot.timer.is_overdue() {
                    Red.bold().paint(time).to_string()
                } else if slot.timer.state() == TimerState::Paused {
                    format!("{time} (paused)")
                } else {
                    time
                }
            }
            None => "no question".into(),
        };
        let left = self
            .clock
            .remaining()
            .map(|v| format!(" | left {}", format_clock(v)))
            .unwrap_or_default();
        format!("{question} | total {}{left}", format_clock(total))
    }

    async fn save_reported(&mut self) -> Result<()> {
        match self.save().await {
            Ok(count) => {
                println!("\nSaved {count} new question(s) to {:?}", self.log.path());
                Ok(())
            }
            Err(e) => {
                println!("\nFailed to save: {e:#}");
                Err(e)
            }
        }
    }
}

impl TickHandler for MockSession {
    async fn on_input(&mut self, line: String) -> Result<ControlFlow<()>> {
        let command = match line.parse::<MockCommand>() {
            Ok(command) => command,
            Err(e) => {
                println!("{e}. Type 'help' for commands.");
                return Ok(ControlFlow::Continue(()));
            }
        };
        let result = match command {
            MockCommand::Next => self.next(),
            MockCommand::Start(number) => self.select(number),
            MockCommand::Pause => self.pause(),
            MockCommand::ToggleCategory(category) => self.toggle_category(category),
            MockCommand::Theme(theme) => self.set_theme(theme),
            MockCommand::Note(note) => self.set_note(note),
            MockCommand::Save => return self.save_reported().await.map(|_| ControlFlow::Continue(())),
            MockCommand::End => {
                if let Err(e) = self.finish().await {
                    println!("\nFailed to save: {e:#}");
                    return Err(e);
                }
                return Ok(ControlFlow::Break(()));
            }
            MockCommand::Help => {
                println!("{HELP}");
                Ok(())
            }
        };
        if let Err(e) = result {
            println!("{e}.");
        }
        Ok(ControlFlow::Continue(()))
    }

    async fn on_tick(&mut self) -> Result<ControlFlow<()>> {
        if self.handle_tick().is_break() {
            let minutes = self.clock.limit().map(|v| v.minutes()).unwrap_or_default();
            println!("\nTHE PAPER HAS ENDED. Total duration: {minutes} minutes.");
            self.alarm.alert();
            if let Err(e) = self.finish().await {
                println!("Failed to save: {e:#}");
            }
            return Ok(ControlFlow::Break(()));
        }
        print!("\r{} ", self.status_line());
        std::io::stdout().flush()?;
        Ok(ControlFlow::Continue(()))
    }
}
