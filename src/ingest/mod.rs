//! Ingestion of spreadsheet files into the delta store.

pub mod types;
pub mod discovery;
pub mod quarantine;
pub mod ingestor;
mod storage;

pub use types::*;
pub use discovery::discover;
pub use quarantine::quarantine_file;
pub use ingestor::{Ingestor, RecordStore};
