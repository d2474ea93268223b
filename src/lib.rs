//! Spreadsheet ingestion into SQLite and a two-period lag view over the
//! ingested delta series.

pub mod commands;
pub mod config;
pub mod database;
pub mod excel;
pub mod ingest;
pub mod lagview;
pub mod logging;

pub use config::AppConfig;
pub use database::{Database, DbError, DeltaRecord};
pub use ingest::{IngestOutcome, Ingestor, PassSummary, RecordStore};
pub use lagview::{LagComputation, LagRow, LagView, LagViewBuilder, DEFAULT_LAG_PERIODS};
