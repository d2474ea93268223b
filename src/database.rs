use chrono::NaiveDate;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::{is_supported_backend, DatabaseConfig};

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unsupported database backend: {0}")]
    UnsupportedBackend(String),
}

/// One (report-date, delta) pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeltaRecord {
    pub report_date: NaiveDate,
    pub delta: f64,
}

impl DeltaRecord {
    pub fn new(report_date: NaiveDate, delta: f64) -> Self {
        Self { report_date, delta }
    }
}

/// Handle to the delta store. Holds only the location; every operation opens
/// its own connection and drops it when done.
#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
    busy_timeout: Duration,
}

impl Database {
    /// Open the store described by the config, creating the file and schema
    /// if absent.
    pub fn open(config: &DatabaseConfig) -> Result<Self, DbError> {
        if !is_supported_backend(&config.kind) {
            return Err(DbError::UnsupportedBackend(config.kind.clone()));
        }
        let path = Path::new(&config.path).join(&config.name);
        let db = Database {
            path,
            busy_timeout: Duration::from_millis(config.busy_timeout_ms),
        };
        db.init()?;
        Ok(db)
    }

    /// Open a SQLite store at an explicit path.
    pub fn at(path: impl Into<PathBuf>) -> Result<Self, DbError> {
        let db = Database {
            path: path.into(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        };
        db.init()?;
        Ok(db)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn init(&self) -> Result<(), DbError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        self.create_delta_table()
    }

    /// Open a fresh connection for a single operation.
    pub fn connect(&self) -> Result<Connection, DbError> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(self.busy_timeout)?;
        Ok(conn)
    }

    /// Create the delta table and its date index
    pub fn create_delta_table(&self) -> Result<(), DbError> {
        let conn = self.connect()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS deltatable (
                id INTEGER PRIMARY KEY,
                Rep_dt DATE,
                Delta FLOAT
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_deltatable_rep_dt ON deltatable(Rep_dt)",
            [],
        )?;

        Ok(())
    }

    /// Number of stored records
    pub fn count_records(&self) -> Result<u64, DbError> {
        let conn = self.connect()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM deltatable", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}
