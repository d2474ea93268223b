//! Excel module for loading, exporting, and watching spreadsheet files.
//!
//! This module provides:
//! - Reading the first worksheet of a workbook into typed cells
//! - Normalising cells into dated delta records
//! - Exporting tables to new workbooks
//! - Directory watching for new arrivals

pub mod types;
pub mod reader;
pub mod normalize;
pub mod writer;
pub mod watcher;

// Re-export commonly used types and functions
pub use types::*;
pub use reader::{compute_checksum, has_spreadsheet_extension, is_lock_file, read_sheet, SPREADSHEET_EXTENSION};
pub use normalize::{load_delta_records, parse_date_str, parse_delta, parse_report_date};
pub use writer::export_to_new_file;
pub use watcher::DirectoryWatcher;
