//! # Reportbell — scheduled daily-report reminder bot for Slack
//!
//! At fixed local times of day the bot queries a SQLite store for who owes
//! a daily report and posts form/reminder/status messages to one Slack
//! channel.
//!
//! Usage:
//!   reportbell                       # Start the bot
//!   reportbell --init-db             # Create tables, seed assignments, exit
//!   reportbell --config bot.toml     # Custom config path

mod lifecycle;

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use lifecycle::Lifecycle;
use reportbell_core::BotConfig;
use reportbell_notify::SlackNotifier;
use reportbell_scheduler::{ReportEngine, Schedule, run_loop};
use reportbell_store::ReportStore;

#[derive(Parser)]
#[command(
    name = "reportbell",
    version,
    about = "🔔 Reportbell — daily report reminder bot for Slack"
)]
struct Cli {
    /// Config file path (default: ~/.reportbell/config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Database path (overrides config)
    #[arg(long)]
    db_path: Option<String>,

    /// Slack channel ID (overrides config and SLACK_CHANNEL_ID)
    #[arg(long)]
    channel: Option<String>,

    /// Create the database, seed assignments from config, and exit
    #[arg(long)]
    init_db: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn expand_path(p: &str) -> String {
    shellexpand::tilde(p).to_string()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "reportbell=debug"
    } else {
        "reportbell=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    // Config: file → env → CLI, later wins
    let mut config = match &cli.config {
        Some(path) => BotConfig::load_from(Path::new(path))
            .with_context(|| format!("loading config from {path}"))?,
        None => BotConfig::load().context("loading config")?,
    };
    config.apply_env_overrides();
    if let Some(db_path) = &cli.db_path {
        config.store.db_path = db_path.clone();
    }
    if let Some(channel) = &cli.channel {
        config.slack.channel_id = channel.clone();
    }

    let db_path = expand_path(&config.store.db_path);

    // --init-db: one-time setup, then exit
    if cli.init_db {
        let store = ReportStore::open(Path::new(&db_path))
            .with_context(|| format!("initializing store at {db_path}"))?;
        let pairs: Vec<(String, String)> = config
            .store
            .seed_assignments
            .iter()
            .map(|seed| (seed.location.clone(), seed.user_id.clone()))
            .collect();
        let inserted = store.seed_assignments(&pairs)?;
        println!("✅ Database initialized at {db_path}");
        println!(
            "   Assignments: {} total ({} newly seeded)",
            store.assignment_count()?,
            inserted
        );
        return Ok(());
    }

    // Startup checks — missing credentials are fatal before the loop starts
    if config.slack.token.is_empty() {
        bail!("SLACK_APP_TOKEN not set (env or [slack].token in config)");
    }
    if config.slack.channel_id.is_empty() {
        bail!("SLACK_CHANNEL_ID not set (env, --channel, or [slack].channel_id in config)");
    }

    // Store open runs migrations; failure aborts startup
    let store = Arc::new(
        ReportStore::open(Path::new(&db_path))
            .with_context(|| format!("opening store at {db_path}"))?,
    );
    tracing::info!(
        "💾 Store ready at {db_path} ({} assignments)",
        store.assignment_count().unwrap_or(0)
    );

    let notifier = SlackNotifier::with_api_base(
        &config.slack.token,
        &config.slack.channel_id,
        &config.slack.api_base,
    );
    if let Err(e) = notifier.auth_test().await {
        tracing::warn!("⚠️ Slack auth check failed (continuing): {e}");
    }

    let offset = config.schedule.offset();
    let schedule = Schedule::from_config(&config.schedule).context("building schedule")?;
    let engine = ReportEngine::new(store, notifier, offset, &config.schedule.deadline_text);

    let pid_file = expand_path(&config.runtime.pid_file);
    let lifecycle = Arc::new(Lifecycle::start(pid_file.into()).context("writing PID marker")?);

    // Signal handlers talk only to the lifecycle context
    {
        let lifecycle = Arc::clone(&lifecycle);
        tokio::spawn(async move {
            wait_for_signal().await;
            tracing::info!("📡 Termination signal received");
            lifecycle.shutdown();
        });
    }

    tracing::info!(
        "📅 Schedule ({:+03}:{:02}): form {}, reminder {}, status {}",
        config.schedule.utc_offset_minutes / 60,
        (config.schedule.utc_offset_minutes % 60).abs(),
        config.schedule.form_at,
        config.schedule.reminder_at,
        config.schedule.status_at
    );

    run_loop(
        &engine,
        &schedule,
        offset,
        std::time::Duration::from_secs(config.runtime.error_backoff_secs),
        lifecycle.subscribe(),
    )
    .await;

    tracing::info!("👋 Reportbell stopped");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};
    let mut term = match signal(SignalKind::terminate()) {
        Ok(term) => term,
        Err(e) => {
            tracing::warn!("⚠️ SIGTERM handler unavailable: {e}");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = term.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
