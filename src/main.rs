mod browse;
mod classify;
mod collectors;
mod config;
mod db;
mod error;
mod models;
mod pipeline;
mod profile;
mod sanitize;
mod skills;
mod store;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use sqlx::PgPool;
use tracing_subscriber::EnvFilter;

use crate::collectors::hh::HhClient;
use crate::collectors::runner::{self, RunReport};
use crate::config::{Command, Config, LogFormat};
use crate::profile::Profile;
use crate::store::PgStore;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("vacancy_radar=info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    init_tracing(config.log_format);

    let profile = match &config.profile {
        Some(path) => Profile::load(path)
            .with_context(|| format!("Failed to load profile {}", path.display()))?,
        None => Profile::builtin()?,
    };

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    if config.run_migrations {
        tracing::info!("Running database migrations...");
        db::run_migrations(&pool).await?;
        tracing::info!("Migrations complete");
    }

    match config.command {
        Command::Collect => collect(&pool, &profile).await?,
        Command::Browse(args) => browse::browse(&pool, args).await?,
        Command::Stats { days } => browse::stats(&pool, days).await?,
        Command::Show { hh_id } => browse::show(&pool, hh_id).await?,
        Command::Open { hh_id } => browse::open(&pool, hh_id).await?,
    }

    Ok(())
}

async fn collect(pool: &PgPool, profile: &Profile) -> anyhow::Result<()> {
    let source = HhClient::new(&profile.search)?;
    let collected = runner::collect(&source, profile, Utc::now()).await;

    let save = runner::persist(
        || PgStore::acquire(pool),
        &collected.listings,
        &profile.limits.columns,
    )
    .await;

    browse::print_run_summary(&RunReport::new(collected, save));
    Ok(())
}
