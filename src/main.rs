use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use delta_lag::commands::{self, ReportFormat, ReportOptions, RunOptions};
use delta_lag::config::{AppConfig, DEFAULT_CONFIG_FILE};
use delta_lag::logging;

/// Spreadsheet ingestion and lag reporting
#[derive(Parser, Debug)]
#[command(name = "delta-lag", version)]
#[command(about = "Load delta spreadsheets into SQLite and report the two-period lag view", long_about = None)]
struct Cli {
    /// Path to the YAML config file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll the source directory and ingest spreadsheets
    Run {
        /// Run one pass and exit
        #[arg(long)]
        once: bool,

        /// Also wake up when a new file arrives
        #[arg(long)]
        watch: bool,
    },
    /// Print both lag views and check they agree
    Report {
        #[arg(long, value_enum, default_value_t = ReportFormat::Table)]
        format: ReportFormat,

        /// Also write the view to this .xlsx file
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Create the database and schema
    InitDb,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    logging::init(&config.logging).context("initialising logging")?;

    match cli.command {
        Command::Run { once, watch } => {
            commands::run_ingest(&config, &RunOptions { once, watch })?;
        }
        Command::Report { format, export } => {
            commands::run_report(&config, &ReportOptions { format, export })?;
        }
        Command::InitDb => commands::init_db(&config)?,
    }

    Ok(())
}
