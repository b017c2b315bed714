use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use tracing::info;

use crate::{
    alarm::GenericAlarm,
    session::{study::StudySession, Session},
    stats::summarize_sessions,
    storage::{csv_log::CsvLog, entities::SessionRow},
    timer::{
        input::{spawn_stdin_reader, Prompter},
        ticker::{LoopExit, TickLoop, TICK_INTERVAL},
        TimeLimit,
    },
    utils::{
        clock::{Clock, DefaultClock},
        dir::sanitize_file_stem,
    },
};

use super::{shutdown::listen_for_shutdown, stats::print_session_summary};

const DEFAULT_LIMIT_MINUTES: u32 = 4;
const DEFAULT_EXIT_KEY: char = 'q';
pub(super) const RECENT_SESSIONS: usize = 10;

#[derive(Debug, clap::Args)]
pub struct StudyCommand {
    #[arg(
        long,
        short,
        help = "Subject name, also used for the log file name. Asked for when missing"
    )]
    subject: Option<String>,
    #[arg(
        long = "exit-key",
        short = 'k',
        help = "Letter that ends the session. Asked for when missing"
    )]
    exit_key: Option<char>,
    #[arg(
        long,
        short,
        default_value_t = DEFAULT_LIMIT_MINUTES,
        value_parser = clap::value_parser!(u32).range(1..=600),
        help = "Minutes per question before the alarm goes off"
    )]
    limit: u32,
    #[arg(long, help = "Print a marker instead of ringing the bell")]
    silent: bool,
}

/// Log of all sessions of a subject.
pub(super) fn subject_log(app_dir: &Path, subject: &str) -> CsvLog<SessionRow> {
    CsvLog::new(
        app_dir
            .join("sessions")
            .join(format!("sessions_{}.csv", sanitize_file_stem(subject))),
    )
}

fn print_instructions(subject: &str, limit: TimeLimit, exit_key: char) {
    println!("Subject: {subject}");
    println!("Instructions:");
    println!(" - Press Enter to start a {}-minute timer.", limit.minutes());
    println!(" - While a timer is running, press Enter to end the current timer and immediately start a new one.");
    println!(" - To exit the session type '{exit_key}' then press Enter.");
}

pub async fn process_study_command(command: StudyCommand, app_dir: &Path) -> Result<()> {
    let mut input = spawn_stdin_reader();
    println!("Study Timer Logger");

    let (subject, exit_key) = {
        let mut prompter = Prompter::new(&mut input);
        let subject = match command.subject.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()) {
            Some(subject) => subject,
            None => {
                prompter
                    .non_empty("Enter subject name (used for CSV filename): ")
                    .await?
            }
        };
        let exit_key = match command.exit_key {
            Some(key) => key,
            None => {
                prompter
                    .letter(
                        "Choose a single letter to use for exiting the session (press Enter for default 'q'): ",
                        DEFAULT_EXIT_KEY,
                    )
                    .await?
            }
        };
        (subject, exit_key)
    };

    let log = subject_log(app_dir, &subject);
    log.ensure().await?;

    let clock = DefaultClock;
    let limit = TimeLimit::from_minutes(command.limit);
    let session = Session::new(subject.as_str(), clock.time().with_timezone(&Local), limit, None);
    info!("Starting study session {} for {subject}", session.id);
    print_instructions(&subject, limit, exit_key);

    let shutdown = listen_for_shutdown();
    let mut study = StudySession::new(
        session,
        exit_key,
        Box::new(GenericAlarm::new(command.silent)),
    );
    let exit = TickLoop::new(Box::new(DefaultClock), shutdown.clone(), TICK_INTERVAL)
        .run(&mut input, &mut study)
        .await;
    // The session is over, another Ctrl-C should leave immediately.
    shutdown.cancel();
    if exit == LoopExit::Interrupted {
        println!("\nSession interrupted by user (Ctrl+C).");
    }

    let summary = study.finish();
    println!(
        "Session ended. Questions started: {}, attempted (ended): {}.",
        summary.tally.started(),
        summary.tally.attempted()
    );
    println!(
        "Questions ended at or after the {}s limit: {}",
        limit.seconds(),
        summary.late_count()
    );

    if summary.tally.attempted() == 0 {
        println!("No question timings were recorded. Nothing will be logged.");
        return Ok(());
    }

    let wrong = Prompter::new(&mut input)
        .count("How many questions were wrong? ", None)
        .await
        .context("Session was not logged")?;
    let row = summary.to_row(wrong, clock.time().with_timezone(&Local).naive_local());
    let correct = row.questions_correct;
    log.append(&[row]).await?;
    info!("Logged study session into {:?}", log.path());
    println!(
        "Logged session to {:?}. Correct: {correct}, Wrong: {wrong}.",
        log.path()
    );

    match log.read_all().await {
        Ok(rows) => print_session_summary(&summarize_sessions(&rows, limit, RECENT_SESSIONS)),
        Err(e) => println!("Could not compute stats: {e:#}"),
    }
    Ok(())
}
