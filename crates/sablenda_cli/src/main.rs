//! Command-line front end for the Sablenda calendar.
//!
//! Opens the SQLite store (default `<data dir>/sablenda/sablenda.db`) and
//! dispatches one subcommand against a `CalendarService`.

mod commands;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime};
use clap::{Parser, Subcommand};
use sablenda_core::{
    default_log_level, init_logging, parse_wall_time, CalendarService, EntryId, Recurrence,
    SqliteEntryRepository,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sablenda")]
#[command(about = "Manage calendar entries stored in a local SQLite database")]
struct Cli {
    /// Database file (defaults to the per-user data directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Write rotating log files into this absolute directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the core library is linked
    Ping,
    /// Print the core library version
    Version,
    /// Add an entry
    Add {
        title: String,

        /// Anchor date (YYYY-MM-DD)
        #[arg(short, long)]
        date: NaiveDate,

        /// Start time (HH:MM); makes the entry timed
        #[arg(long, value_parser = wall_time, requires = "end")]
        start: Option<NaiveTime>,

        /// End time (HH:MM)
        #[arg(long, value_parser = wall_time, requires = "start")]
        end: Option<NaiveTime>,

        /// none, daily, weekly, monthly or yearly
        #[arg(short, long, default_value = "none")]
        recurrence: Recurrence,

        #[arg(long, default_value = "")]
        description: String,
    },
    /// List entries occurring on one date
    Day {
        /// Date (YYYY-MM-DD)
        date: NaiveDate,
    },
    /// Print the month grid with entry counts
    Month { year: i32, month: u32 },
    /// Remove an entry by id
    Remove { id: EntryId },
    /// Write every entry to a JSON backup file
    Export { path: PathBuf },
    /// Add every entry from a JSON backup file
    Import { path: PathBuf },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir.as_deref() {
        let log_dir = log_dir
            .to_str()
            .context("log directory must be valid UTF-8")?;
        init_logging(default_log_level().as_str(), log_dir).context("failed to start logging")?;
    }

    match cli.command {
        Commands::Ping => {
            println!("sablenda_core ping={}", sablenda_core::ping());
            Ok(())
        }
        Commands::Version => {
            println!("sablenda_core version={}", sablenda_core::core_version());
            Ok(())
        }
        Commands::Add {
            title,
            date,
            start,
            end,
            recurrence,
            description,
        } => {
            let times = start.zip(end);
            commands::add(
                &mut open_calendar(cli.db)?,
                commands::NewEntry {
                    title,
                    date,
                    times,
                    recurrence,
                    description,
                },
            )
        }
        Commands::Day { date } => commands::day(&open_calendar(cli.db)?, date),
        Commands::Month { year, month } => {
            commands::month(&mut open_calendar(cli.db)?, year, month)
        }
        Commands::Remove { id } => commands::remove(&mut open_calendar(cli.db)?, id),
        Commands::Export { path } => commands::export(&open_calendar(cli.db)?, path),
        Commands::Import { path } => commands::import(&mut open_calendar(cli.db)?, path),
    }
}

fn open_calendar(db: Option<PathBuf>) -> Result<CalendarService<SqliteEntryRepository>> {
    let path = match db {
        Some(path) => path,
        None => sablenda_core::db::default_database_path()
            .context("could not resolve the default database location")?,
    };
    let repo = SqliteEntryRepository::open(&path)
        .with_context(|| format!("failed to open database `{}`", path.display()))?;
    Ok(CalendarService::new(repo))
}

fn wall_time(value: &str) -> Result<NaiveTime, String> {
    parse_wall_time(value).ok_or_else(|| format!("`{value}` is not a HH:MM time"))
}
