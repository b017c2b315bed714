pub mod mock;
pub mod shutdown;
pub mod stats;
pub mod study;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use mock::{process_mock_command, MockTestCommand};
use stats::{process_review_command, process_stats_command, ReviewCommand, StatsCommand};
use study::{process_study_command, StudyCommand};
use tracing::level_filters::LevelFilter;

use crate::utils::{
    dir::{create_application_default_path, create_dir},
    logging::enable_logging,
};

#[derive(Parser, Debug)]
#[command(name = "Studytimer", version, long_about = None)]
#[command(about = "Timers for mock exams and study sessions", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
    #[arg(long = "log-filter", global = true, help = "Level of the application log")]
    log: Option<LevelFilter>,
    /// This option is for debugging purposes only.
    #[arg(long = "log-console", global = true)]
    log_console: bool,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Time every question of a mock test and log them")]
    Mock {
        #[command(flatten)]
        command: MockTestCommand,
    },
    #[command(about = "Time study questions and log a summary of the session")]
    Study {
        #[command(flatten)]
        command: StudyCommand,
    },
    #[command(about = "Summarize the logged study sessions of a subject")]
    Stats {
        #[command(flatten)]
        command: StatsCommand,
    },
    #[command(about = "Analyze the log of a mock test")]
    Review {
        #[command(flatten)]
        command: ReviewCommand,
    },
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let app_dir = match args.dir {
        Some(dir) => create_dir(dir)?,
        None => create_application_default_path()?,
    };
    enable_logging(&app_dir.join("logs"), args.log, args.log_console)?;

    match args.commands {
        Commands::Mock { command } => process_mock_command(command, &app_dir).await,
        Commands::Study { command } => process_study_command(command, &app_dir).await,
        Commands::Stats { command } => process_stats_command(command, &app_dir).await,
        Commands::Review { command } => process_review_command(command, &app_dir).await,
    }
}
