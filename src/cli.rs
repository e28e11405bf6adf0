//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;

use crate::commands;

/// mkrepo - Build Yum/DNF repositories from multiple sources
#[derive(Parser, Debug)]
#[command(name = "mkrepo")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Log level to use
    #[arg(
        short,
        long,
        global = true,
        value_name = "LEVEL",
        value_enum,
        default_value_t = LogLevel::Info
    )]
    log_level: LogLevel,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sync the RPM cache and build the target repository
    Reposetup(commands::reposetup::ReposetupArgs),

    /// Print version and exit
    Version,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        init_logging(self.log_level.into());

        match self.command {
            Commands::Reposetup(args) => commands::reposetup::execute(args),
            Commands::Version => commands::version::execute(),
        }
    }
}

/// Install the process logger; `RUST_LOG` still refines the chosen level
fn init_logging(level: LevelFilter) {
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .try_init();
}
