use std::path::PathBuf;

use clap::Parser;

use crate::classify::WorkFormat;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "vacancy-radar",
    about = "Collects, classifies and browses job listings"
)]
pub struct Config {
    /// Database connection URL
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Run database migrations on startup
    #[arg(long, env = "RUN_MIGRATIONS", default_value = "true", action = clap::ArgAction::Set)]
    pub run_migrations: bool,

    /// JSON profile to use instead of the built-in one
    #[arg(long, env = "VACANCY_PROFILE")]
    pub profile: Option<PathBuf>,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value = "text")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(clap::Subcommand, Debug, Clone)]
pub enum Command {
    /// Run one ingestion pass and print the run summary
    Collect,
    /// List stored vacancies, most relevant first
    Browse(BrowseArgs),
    /// Category, work format and city breakdowns
    Stats {
        /// Recency window in days (1-30)
        #[arg(long, default_value_t = 7)]
        days: i32,
    },
    /// Print one stored vacancy in full
    Show { hh_id: i64 },
    /// Open a stored vacancy in the system browser
    Open { hh_id: i64 },
}

#[derive(clap::Args, Debug, Clone)]
pub struct BrowseArgs {
    /// Recency window in days (1-30)
    #[arg(long, default_value_t = 7)]
    pub days: i32,

    /// Only this category label
    #[arg(long)]
    pub category: Option<String>,

    /// Only this work format
    #[arg(long, value_enum)]
    pub format: Option<WorkFormat>,

    /// Either salary bound at least this much
    #[arg(long)]
    pub min_salary: Option<i64>,

    #[arg(long, default_value_t = 20)]
    pub limit: i64,
}

/// Recency windows outside 1..=30 days are pulled back into range.
pub fn clamp_days(days: i32) -> i32 {
    days.clamp(1, 30)
}
