use std::path::{Path, PathBuf};

use super::discovery::discover;
use super::quarantine::quarantine_file;
use super::types::{IngestError, IngestOutcome, PassSummary};
use crate::config::{AppConfig, ColumnConfig};
use crate::database::{DbError, DeltaRecord};
use crate::excel::{compute_checksum, load_delta_records};

/// Destination for loaded records. Implementations must be all-or-nothing:
/// on error, nothing from `records` may remain persisted.
pub trait RecordStore {
    fn append(&self, records: &[DeltaRecord]) -> Result<usize, DbError>;
}

/// Pulls spreadsheets from the source directory into a [`RecordStore`].
///
/// Load failures are permanent for a file: it is quarantined. Store failures
/// are assumed transient: the file stays where it is and the next pass
/// rediscovers it. No other retry state is kept.
pub struct Ingestor<S> {
    source_dir: PathBuf,
    quarantine_dir: PathBuf,
    case_insensitive: bool,
    columns: ColumnConfig,
    store: S,
}

impl<S: RecordStore> Ingestor<S> {
    pub fn new(config: &AppConfig, store: S) -> Self {
        let source_dir = config.source_dir();
        Ingestor {
            quarantine_dir: source_dir.join(&config.data.quarantine_dir),
            source_dir,
            case_insensitive: config.data.case_insensitive,
            columns: config.columns.clone(),
            store,
        }
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    pub fn quarantine_dir(&self) -> &Path {
        &self.quarantine_dir
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Current candidate files in the source directory.
    pub fn discover(&self) -> Result<Vec<PathBuf>, IngestError> {
        discover(&self.source_dir, self.case_insensitive)
    }

    /// Discover and ingest every candidate, one transaction per file.
    pub fn run_pass(&self) -> Result<PassSummary, IngestError> {
        let files = self.discover()?;
        let mut summary = PassSummary {
            discovered: files.len(),
            ..Default::default()
        };

        for file in &files {
            let outcome = self.ingest(file);
            summary.record(&outcome);
        }

        Ok(summary)
    }

    /// Load one file and append its records. Never fails: every problem is
    /// logged and reflected in the returned outcome.
    pub fn ingest(&self, file: &Path) -> IngestOutcome {
        let name = display_name(file);

        let records = match load_delta_records(file, &self.columns) {
            Ok(records) => {
                tracing::info!(file = %name, rows = records.len(), "Loaded file");
                records
            }
            Err(e) => return self.quarantine(file, &name, e.to_string()),
        };

        // Before the append: the file is gone once the rows are committed.
        let checksum = compute_checksum(file)
            .unwrap_or_else(|_| "unavailable".to_string());

        match self.store.append(&records) {
            Ok(rows) => {
                match std::fs::remove_file(file) {
                    Ok(()) => tracing::info!(
                        file = %name,
                        rows,
                        sha256 = %checksum,
                        "Committed rows to store, original file deleted"
                    ),
                    // Rows are committed; a leftover file would be ingested again.
                    Err(e) => tracing::error!(
                        file = %name,
                        rows,
                        error = %e,
                        "Committed rows but failed to delete original file"
                    ),
                }
                IngestOutcome::Ingested { rows }
            }
            Err(e) => {
                tracing::error!(
                    file = %name,
                    error = %e,
                    "Failed transaction, rolled back; file left for next pass"
                );
                IngestOutcome::Deferred { reason: e.to_string() }
            }
        }
    }

    fn quarantine(&self, file: &Path, name: &str, reason: String) -> IngestOutcome {
        match quarantine_file(file, &self.quarantine_dir) {
            Ok(destination) => {
                tracing::error!(
                    file = %name,
                    error = %reason,
                    quarantined_to = %destination.display(),
                    "Wrong file, moved to quarantine"
                );
                IngestOutcome::Quarantined { destination, reason }
            }
            Err(move_err) => {
                tracing::error!(
                    file = %name,
                    error = %reason,
                    move_error = %move_err,
                    "Wrong file, and moving it to quarantine failed"
                );
                IngestOutcome::QuarantineFailed {
                    reason: format!("{}; quarantine failed: {}", reason, move_err),
                }
            }
        }
    }
}

fn display_name(file: &Path) -> String {
    file.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::excel::{export_to_new_file, CellValue};
    use std::cell::{Cell, RefCell};
    use std::fs;

    /// Records every append; optionally fails them all.
    #[derive(Default)]
    struct SpyStore {
        calls: Cell<usize>,
        rows: RefCell<Vec<DeltaRecord>>,
        fail: bool,
    }

    impl RecordStore for SpyStore {
        fn append(&self, records: &[DeltaRecord]) -> Result<usize, DbError> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                return Err(DbError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "simulated store failure",
                )));
            }
            self.rows.borrow_mut().extend_from_slice(records);
            Ok(records.len())
        }
    }

    fn config_for(dir: &Path) -> AppConfig {
        AppConfig::from_yaml_str(&format!(
            "data:\n  path: [{:?}]\ndatabase:\n  type: sqlite\n  path: {:?}\n  name: delta.db\n",
            dir.display().to_string(),
            dir.display().to_string(),
        ))
        .unwrap()
    }

    fn write_sheet(path: &Path, rows: &[(&str, &str)]) {
        let rows: Vec<Vec<CellValue>> = rows
            .iter()
            .map(|(d, v)| vec![CellValue::String(d.to_string()), CellValue::String(v.to_string())])
            .collect();
        export_to_new_file(&["Rep_dt", "Delta"], &rows, path, None).unwrap();
    }

    #[test]
    fn test_successful_ingest_deletes_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("jan.xlsx");
        write_sheet(&file, &[("2024-01-01", "10"), ("2024-02-01", "12,5")]);

        let ingestor = Ingestor::new(&config_for(dir.path()), SpyStore::default());
        let outcome = ingestor.ingest(&file);

        assert_eq!(outcome, IngestOutcome::Ingested { rows: 2 });
        assert!(!file.exists());
        let rows = ingestor.store().rows.borrow();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].delta, 12.5);
    }

    #[test]
    fn test_malformed_file_is_quarantined_without_store_access() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("broken.xlsx");
        fs::write(&file, b"definitely not a workbook").unwrap();

        let ingestor = Ingestor::new(&config_for(dir.path()), SpyStore::default());
        assert_eq!(ingestor.quarantine_dir(), dir.path().join("problem_files"));
        let outcome = ingestor.ingest(&file);

        let quarantined = ingestor.quarantine_dir().join("broken.xlsx");
        assert!(matches!(outcome, IngestOutcome::Quarantined { ref destination, .. } if *destination == quarantined));
        assert!(!file.exists());
        assert_eq!(fs::read(&quarantined).unwrap(), b"definitely not a workbook");
        assert_eq!(ingestor.store().calls.get(), 0);
    }

    #[test]
    fn test_bad_value_quarantines_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("mixed.xlsx");
        write_sheet(&file, &[("2024-01-01", "1"), ("not a date", "2")]);

        let ingestor = Ingestor::new(&config_for(dir.path()), SpyStore::default());
        let outcome = ingestor.ingest(&file);

        assert!(matches!(outcome, IngestOutcome::Quarantined { .. }));
        assert_eq!(ingestor.store().calls.get(), 0);
        assert!(ingestor.store().rows.borrow().is_empty());
    }

    #[test]
    fn test_store_failure_leaves_file_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("feb.xlsx");
        write_sheet(&file, &[("2024-02-01", "5")]);

        let store = SpyStore { fail: true, ..Default::default() };
        let ingestor = Ingestor::new(&config_for(dir.path()), store);
        let outcome = ingestor.ingest(&file);

        assert!(matches!(outcome, IngestOutcome::Deferred { .. }));
        assert!(file.exists());
        assert!(!dir.path().join("problem_files").exists());
        assert_eq!(ingestor.store().calls.get(), 1);
    }

    #[test]
    fn test_run_pass_summarises_outcomes() {
        let dir = tempfile::tempdir().unwrap();
        write_sheet(&dir.path().join("a.xlsx"), &[("2024-01-01", "1"), ("2024-02-01", "2")]);
        write_sheet(&dir.path().join("b.xlsx"), &[("2024-03-01", "3")]);
        fs::write(dir.path().join("c.xlsx"), b"junk").unwrap();
        fs::write(dir.path().join("readme.txt"), b"ignored").unwrap();

        let ingestor = Ingestor::new(&config_for(dir.path()), SpyStore::default());
        let summary = ingestor.run_pass().unwrap();

        assert_eq!(
            summary,
            PassSummary {
                discovered: 3,
                ingested: 2,
                quarantined: 1,
                deferred: 0,
                rows_appended: 3,
            }
        );
        assert!(dir.path().join("readme.txt").exists());

        // Quarantined files are out of the normal flow.
        let second = ingestor.run_pass().unwrap();
        assert_eq!(second.discovered, 0);
    }

    #[test]
    fn test_deferred_file_is_retried_next_pass() {
        let dir = tempfile::tempdir().unwrap();
        write_sheet(&dir.path().join("a.xlsx"), &[("2024-01-01", "1")]);

        let failing = Ingestor::new(&config_for(dir.path()), SpyStore { fail: true, ..Default::default() });
        assert_eq!(failing.run_pass().unwrap().deferred, 1);

        let healthy = Ingestor::new(&config_for(dir.path()), SpyStore::default());
        let summary = healthy.run_pass().unwrap();
        assert_eq!(summary.ingested, 1);
        assert_eq!(summary.rows_appended, 1);
    }
}
