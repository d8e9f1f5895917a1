use std::fmt;
use std::time::Duration;

use services::{AppServices, Clock, DEFAULT_QUIET_INTERVAL};
use storage::repository::Storage;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

mod commands;
mod shell;

use commands::{Command, execute};

const DEFAULT_DB_URL: &str = "sqlite://study-tracker.sqlite3";

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    InvalidDbUrl { raw: String },
    InvalidDebounce { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidDebounce { raw } => {
                write!(f, "invalid --debounce-ms value: {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  study-tracker [--db <sqlite_url>] [--debounce-ms <n>] [command ...]");
    eprintln!();
    eprintln!("Without a command the interactive shell starts.");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db {DEFAULT_DB_URL}");
    eprintln!("  --debounce-ms {}", DEFAULT_QUIET_INTERVAL.as_millis());
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  STUDY_DB_URL, STUDY_DEBOUNCE_MS, STUDY_LOG (log filter, default warn)");
    eprintln!();
    eprintln!("{}", commands::HELP);
}

struct Args {
    db_url: String,
    debounce: Duration,
    /// Everything that is not a global flag, in order.
    command: Vec<String>,
}

impl Args {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("STUDY_DB_URL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map_or_else(|| DEFAULT_DB_URL.into(), normalize_sqlite_url);
        let mut debounce = match std::env::var("STUDY_DEBOUNCE_MS") {
            Ok(raw) => parse_debounce(raw)?,
            Err(_) => DEFAULT_QUIET_INTERVAL,
        };
        let mut command = Vec::new();

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--debounce-ms" => {
                    let value = require_value(&mut args, "--debounce-ms")?;
                    debounce = parse_debounce(value)?;
                }
                _ => command.push(arg),
            }
        }

        Ok(Self {
            db_url,
            debounce,
            command,
        })
    }
}

fn parse_debounce(raw: String) -> Result<Duration, ArgsError> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| ArgsError::InvalidDebounce { raw })
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .with_env_var("STUDY_LOG")
        .from_env_lossy();
    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let parsed = Args::parse(std::env::args().skip(1)).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let cmd = if parsed.command.is_empty() {
        Command::Shell
    } else {
        Command::parse(&parsed.command)?
    };
    if cmd == Command::Help {
        print_usage();
        return Ok(());
    }

    // Open + migrate SQLite here so the services crate never touches the filesystem layout.
    prepare_sqlite_file(&parsed.db_url)?;
    let storage = Storage::sqlite(&parsed.db_url).await?;
    let mut services =
        AppServices::with_storage(storage, Clock::default_clock(), parsed.debounce).await;
    tracing::debug!(
        db = %parsed.db_url,
        quiet_ms = services.scheduler().quiet_interval().as_millis(),
        "services ready"
    );

    let result = match cmd {
        Command::Shell => shell::run(&mut services).await.map_err(Into::into),
        Command::Quit => Ok(()),
        cmd => execute(&mut services, cmd)
            .await
            .map(|out| print!("{out}"))
            .map_err(Into::into),
    };

    services.shutdown().await;
    result
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
