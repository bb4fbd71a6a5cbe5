mod dashboard;
mod interview;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use services::{AiSettings, AppServices, Clock};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use crate::dashboard::DashboardArgs;
use crate::interview::InterviewArgs;

/// Timed mock interviews in the terminal.
#[derive(Debug, Parser)]
#[command(name = "interview", version)]
struct Cli {
    /// `SQLite` URL or plain file path of the session store.
    #[arg(
        long = "db",
        env = "INTERVIEW_DB_URL",
        default_value = "sqlite://interview.sqlite3",
        global = true
    )]
    db_url: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start a new interview, or pick up the last unfinished one.
    Interview(InterviewArgs),
    /// Interviewer view: candidates, scores and transcripts.
    Dashboard(DashboardArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed == "sqlite::memory:" || trimmed.starts_with("sqlite://") {
        return trimmed.to_owned();
    }

    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// Make sure the database file and its directory exist before connecting.
fn prepare_sqlite_file(db_url: &str) -> Result<()> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let Some(path) = db_url.strip_prefix("sqlite://") else {
        bail!("invalid --db value: {db_url}");
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        bail!("invalid --db value: {db_url}");
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("creating {}", path.display()))?;
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let db_url = normalize_sqlite_url(&cli.db_url);
    prepare_sqlite_file(&db_url)?;

    let services = AppServices::new_sqlite(&db_url, Clock::default_clock(), AiSettings::from_env())
        .await
        .with_context(|| format!("opening {db_url}"))?;
    debug!(
        db_url = %db_url,
        remote_scoring = services.orchestrator().scoring().primary_available(),
        "session store ready"
    );

    match cli.command {
        None => interview::run(&services, InterviewArgs::default()).await,
        Some(Command::Interview(args)) => interview::run(&services, args).await,
        Some(Command::Dashboard(args)) => dashboard::run(&services, args).await,
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run(Cli::parse()).await {
        error!(error = %err, "interview failed");
        eprintln!("{err:#}");
        std::process::exit(2);
    }
}
