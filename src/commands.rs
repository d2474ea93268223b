use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::AppConfig;
use crate::database::{Database, DbError};
use crate::excel::{DirectoryWatcher, ExcelError};
use crate::ingest::{IngestError, Ingestor, PassSummary};
use crate::lagview::{export_lag_view, render_table, LagMismatch, LagView, LagViewBuilder};

#[derive(Debug)]
pub struct CommandError {
    message: String,
}

impl CommandError {
    pub fn new(message: impl Into<String>) -> Self {
        CommandError {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CommandError {}

impl From<DbError> for CommandError {
    fn from(e: DbError) -> Self {
        CommandError {
            message: e.to_string(),
        }
    }
}

impl From<ExcelError> for CommandError {
    fn from(e: ExcelError) -> Self {
        CommandError {
            message: e.to_string(),
        }
    }
}

impl From<IngestError> for CommandError {
    fn from(e: IngestError) -> Self {
        CommandError {
            message: e.to_string(),
        }
    }
}

impl From<std::io::Error> for CommandError {
    fn from(e: std::io::Error) -> Self {
        CommandError {
            message: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for CommandError {
    fn from(e: serde_json::Error) -> Self {
        CommandError {
            message: e.to_string(),
        }
    }
}

// Ingestion loop

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Run a single pass and return
    pub once: bool,
    /// Wake early when a spreadsheet lands in the source directory
    pub watch: bool,
}

/// Ingestion loop. Each pass completes before the next sleep starts; a
/// failing file or an unreadable directory never ends the loop.
pub fn run_ingest(config: &AppConfig, options: &RunOptions) -> Result<(), CommandError> {
    let db = Database::open(&config.database)?;
    let ingestor = Ingestor::new(config, db);

    let source_dir = ingestor.source_dir().to_path_buf();
    if !source_dir.exists() {
        std::fs::create_dir_all(&source_dir)?;
        tracing::info!(dir = %source_dir.display(), "Created source directory");
    }

    let watcher = if options.watch {
        Some(DirectoryWatcher::new(&source_dir, config.data.case_insensitive)?)
    } else {
        None
    };

    let interval = config.poll_interval();
    tracing::info!(
        dir = %source_dir.display(),
        db = %ingestor.store().path().display(),
        interval_secs = interval.as_secs(),
        watch = options.watch,
        "Starting ingestion"
    );

    loop {
        run_single_pass(&ingestor);

        if options.once {
            return Ok(());
        }

        match &watcher {
            Some(watcher) => {
                if watcher.wait_for_arrival(interval) {
                    tracing::debug!("Woken by new file");
                }
            }
            None => std::thread::sleep(interval),
        }
    }
}

fn run_single_pass(ingestor: &Ingestor<Database>) -> Option<PassSummary> {
    match ingestor.run_pass() {
        Ok(summary) => {
            if summary.discovered > 0 {
                tracing::info!(
                    discovered = summary.discovered,
                    ingested = summary.ingested,
                    quarantined = summary.quarantined,
                    deferred = summary.deferred,
                    rows = summary.rows_appended,
                    "Pass complete"
                );
            }
            Some(summary)
        }
        Err(e) => {
            tracing::error!(error = %e, "Pass failed");
            None
        }
    }
}

// Report

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportFormat {
    #[default]
    Table,
    Json,
}

#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    pub format: ReportFormat,
    pub export: Option<PathBuf>,
}

/// Both lag views plus whether they agree
#[derive(Debug, Clone, Serialize)]
pub struct LagReport {
    pub query: LagView,
    pub memory: LagView,
    pub mismatch: Option<LagMismatch>,
}

impl LagReport {
    pub fn agree(&self) -> bool {
        self.mismatch.is_none()
    }
}

/// Compute both views. Store errors are returned to the caller unhandled.
pub fn build_report(builder: &LagViewBuilder) -> Result<LagReport, DbError> {
    let query = builder.compute_via_query()?;
    let memory = builder.compute_via_memory()?;
    let mismatch = query.diff(&memory);
    Ok(LagReport { query, memory, mismatch })
}

/// Compute, print and optionally export the lag views.
pub fn run_report(config: &AppConfig, options: &ReportOptions) -> Result<(), CommandError> {
    let db = Database::open(&config.database)?;
    let builder = LagViewBuilder::new(db);
    let report = build_report(&builder)?;

    match options.format {
        ReportFormat::Table => {
            println!("Lag view (SQL window function):");
            print!("{}", render_table(&report.query));
            println!();
            println!("Lag view (in-memory shift):");
            print!("{}", render_table(&report.memory));
            println!();
            match &report.mismatch {
                None => println!("Views agree ({} rows)", report.query.len()),
                Some(m) => println!("Views disagree at {}", m),
            }
        }
        ReportFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    if let Some(path) = &options.export {
        export_report(&report, path)?;
    }

    match report.mismatch {
        None => Ok(()),
        Some(m) => Err(CommandError::new(format!("Lag views disagree at {}", m))),
    }
}

fn export_report(report: &LagReport, path: &Path) -> Result<(), CommandError> {
    let checksum = export_lag_view(&report.query, path)?;
    tracing::info!(file = %path.display(), sha256 = %checksum, "Exported lag view");
    Ok(())
}

// Schema

/// Create the store and its schema if absent.
pub fn init_db(config: &AppConfig) -> Result<(), CommandError> {
    let db = Database::open(&config.database)?;
    let rows = db.count_records()?;
    tracing::info!(db = %db.path().display(), rows, "Database ready");
    println!("Database ready at {} ({} rows)", db.path().display(), rows);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::DeltaRecord;
    use chrono::NaiveDate;

    fn config_for(dir: &Path) -> AppConfig {
        AppConfig::from_yaml_str(&format!(
            "data:\n  path: [{:?}, incoming]\ndatabase:\n  type: sqlite\n  path: {:?}\n  name: delta.db\n",
            dir.display().to_string(),
            dir.join("db").display().to_string(),
        ))
        .unwrap()
    }

    #[test]
    fn test_run_once_creates_source_dir_and_db() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(dir.path());

        run_ingest(&config, &RunOptions { once: true, watch: false }).unwrap();

        assert!(dir.path().join("incoming").is_dir());
        assert!(dir.path().join("db/delta.db").is_file());
    }

    #[test]
    fn test_build_report_agrees() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(dir.path());
        let db = Database::open(&config.database).unwrap();
        db.append_records(&[
            DeltaRecord::new(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(), 2.0),
            DeltaRecord::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 1.0),
            DeltaRecord::new(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(), 3.0),
        ])
        .unwrap();

        let report = build_report(&LagViewBuilder::new(db)).unwrap();
        assert!(report.agree());
        assert_eq!(report.query.lags(), vec![Some(3.0), None, None]);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["query"]["rows"][0]["delta_lag"], 3.0);
        assert!(json["mismatch"].is_null());
    }

    #[test]
    fn test_report_export_writes_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(dir.path());
        let export = dir.path().join("lag.xlsx");

        run_report(
            &config,
            &ReportOptions {
                format: ReportFormat::Json,
                export: Some(export.clone()),
            },
        )
        .unwrap();

        assert!(export.is_file());
    }
}
