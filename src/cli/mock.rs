use std::path::Path;

use anyhow::Result;
use chrono::Local;
use tracing::info;

use crate::{
    alarm::GenericAlarm,
    session::{mock::MockSession, Session},
    storage::{csv_log::CsvLog, entities::QuestionRow},
    timer::{
        input::{spawn_stdin_reader, Prompter},
        ticker::{LoopExit, TickLoop, TICK_INTERVAL},
        TimeLimit,
    },
    utils::{
        clock::{Clock, DefaultClock},
        time::format_clock,
    },
};

use super::shutdown::listen_for_shutdown;

pub(super) const MOCK_LOG_DIR: &str = "mock_test_logs";

#[derive(Debug, clap::Args)]
pub struct MockTestCommand {
    #[arg(long, short, help = "Description of the test. Asked for when missing")]
    description: Option<String>,
    #[arg(
        long,
        short,
        default_value_t = 5,
        value_parser = clap::value_parser!(u32).range(1..=60),
        help = "Maximum minutes per question"
    )]
    limit: u32,
    #[arg(
        long,
        default_value_t = 180,
        value_parser = clap::value_parser!(u32).range(1..=480),
        help = "Total duration of the test in minutes. The test ends on its own afterwards"
    )]
    duration: u32,
    #[arg(
        long,
        short,
        default_value_t = 75,
        value_parser = clap::value_parser!(u32).range(1..=500),
        help = "Number of questions in the test"
    )]
    questions: u32,
    #[arg(long, help = "Print a marker instead of ringing the bell")]
    silent: bool,
}

pub async fn process_mock_command(command: MockTestCommand, app_dir: &Path) -> Result<()> {
    let mut input = spawn_stdin_reader();

    let description = match command
        .description
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
    {
        Some(description) => description,
        None => {
            Prompter::new(&mut input)
                .non_empty("Test description: ")
                .await?
        }
    };

    let clock = DefaultClock;
    let session = Session::new(
        description,
        clock.time().with_timezone(&Local),
        TimeLimit::from_minutes(command.limit),
        Some(TimeLimit::from_minutes(command.duration)),
    );
    let log = CsvLog::<QuestionRow>::new(
        app_dir
            .join(MOCK_LOG_DIR)
            .join(format!("mock_test_{}.csv", session.id)),
    );
    log.ensure().await?;

    info!("Starting mock test {}", session.id);
    println!("Test Description: {}", session.description);
    println!("Session ID: {}", session.id);
    println!("Started: {}", session.created_at.format("%Y-%m-%d %H:%M:%S"));
    println!("Maximum Time per Question: {} minutes", command.limit);
    println!("Total Test Duration: {} minutes", command.duration);
    println!("Log: {:?}", log.path());
    println!("Type 'help' for commands.");

    let shutdown = listen_for_shutdown();
    let mut mock = MockSession::start(
        session,
        command.questions,
        log,
        Box::new(GenericAlarm::new(command.silent)),
    );
    let exit = TickLoop::new(Box::new(DefaultClock), shutdown.clone(), TICK_INTERVAL)
        .run(&mut input, &mut mock)
        .await;
    shutdown.cancel();
    match exit {
        LoopExit::Interrupted => println!("\nTest interrupted by user (Ctrl+C)."),
        LoopExit::InputClosed => println!("\nInput closed, ending the test."),
        LoopExit::Requested => {}
    }

    // Saving is idempotent, this only writes what the loop didn't.
    mock.finish().await?;

    let tally = mock.tally();
    println!("\nSession data saved at: {:?}", mock.log().path());
    println!(
        "Questions recorded: {}, time on questions: {}, over the limit: {}",
        tally.attempted(),
        format_clock(tally.total_seconds().try_into().unwrap_or(u32::MAX)),
        tally.overruns()
    );
    Ok(())
}
