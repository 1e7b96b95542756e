use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;

use toolcrib_cli::config::CribConfig;
use toolcrib_cli::{sample, store};
use toolcrib_lending::{
    AssetNumber, Condition, HoldView, HolderId, LedgerEngine, ListView, SystemClock,
};
use toolcrib_observability::LogFormat;

#[derive(Debug, Parser)]
#[command(name = "toolcrib", about = "Tool crib checkout ledger")]
struct Cli {
    /// Ledger snapshot file (overrides TOOLCRIB_SNAPSHOT).
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,

    /// Log output format: json or text (overrides TOOLCRIB_LOG_FORMAT).
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the sample crib on a simulated clock and print what happened.
    Demo,
    /// Add a tool to the crib.
    Register {
        number: String,
        name: String,
        #[arg(long, default_value = "good")]
        condition: Condition,
    },
    /// Check a tool out to someone.
    Checkout {
        number: String,
        holder: String,
        /// RFC 3339 timestamp or YYYY-MM-DD (midnight UTC).
        #[arg(long)]
        due: String,
    },
    /// Check a tool back in.
    Return {
        number: String,
        #[arg(long)]
        condition: Condition,
        #[arg(long)]
        note: Option<String>,
    },
    /// Tools currently out, oldest first.
    CheckedOut {
        #[arg(long)]
        search: Option<String>,
    },
    /// Tools past their due-back time.
    Overdue {
        #[arg(long)]
        search: Option<String>,
    },
    /// Most recent returns.
    Recent {
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        search: Option<String>,
    },
    /// Every hold recorded for one tool.
    History { number: String },
    /// Headline counts.
    Summary,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = CribConfig::from_env()?;
    if let Some(path) = cli.snapshot {
        config.snapshot_path = path;
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }

    toolcrib_observability::init(config.log_format);
    run(cli.command, &config)
}

fn run(command: Command, config: &CribConfig) -> Result<()> {
    let load = || store::load(&config.snapshot_path, SystemClock);

    match command {
        Command::Demo => print(&sample::run_demo()?),
        Command::Register {
            number,
            name,
            condition,
        } => {
            let number = AssetNumber::parse(number)?;
            let asset = store::update(&config.snapshot_path, SystemClock, |crib| {
                Ok(crib.register_asset(number, name, condition)?)
            })?;
            print(&asset)
        }
        Command::Checkout {
            number,
            holder,
            due,
        } => {
            let number = AssetNumber::parse(number)?;
            let holder = HolderId::parse(holder)?;
            let due = parse_due(&due)?;
            let hold = store::update(&config.snapshot_path, SystemClock, |crib| {
                let hold_id = crib.checkout(&number, holder, due)?;
                Ok(crib.open_hold(&number).filter(|hold| hold.id == hold_id))
            })?;
            print(&hold)
        }
        Command::Return {
            number,
            condition,
            note,
        } => {
            let number = AssetNumber::parse(number)?;
            let hold = store::update(&config.snapshot_path, SystemClock, |crib| {
                crib.return_asset(&number, condition, note)?;
                Ok(crib.history(&number).pop())
            })?;
            print(&hold)
        }
        Command::CheckedOut { search } => print(&list(&load()?, ListView::CheckedOut, search)),
        Command::Overdue { search } => print(&list(&load()?, ListView::Overdue, search)),
        Command::Recent { limit, search } => {
            let crib = load()?;
            let limit = limit.unwrap_or(config.recent_limit);
            print(&list(&crib, ListView::RecentlyReturned { limit }, search))
        }
        Command::History { number } => {
            let crib = load()?;
            let number = AssetNumber::parse(number)?;
            crib.registry().lookup(&number)?;
            print(&crib.history(&number))
        }
        Command::Summary => print(&load()?.summary()),
    }
}

fn list(
    crib: &LedgerEngine<SystemClock>,
    view: ListView,
    search: Option<String>,
) -> Vec<HoldView> {
    crib.search(search.as_deref().unwrap_or(""), view)
}

fn parse_due(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("--due must be RFC 3339 or YYYY-MM-DD, got '{raw}'"))?;
    match date.and_hms_opt(0, 0, 0) {
        Some(midnight) => Ok(midnight.and_utc()),
        None => bail!("--due {raw} has no midnight"),
    }
}

fn print(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
