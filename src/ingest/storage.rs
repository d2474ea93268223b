use rusqlite::Transaction;

use super::ingestor::RecordStore;
use crate::database::{Database, DbError, DeltaRecord};

impl Database {
    /// Append records in a single transaction. On any error the transaction
    /// is rolled back and the store is left as it was.
    pub fn append_records(&self, records: &[DeltaRecord]) -> Result<usize, DbError> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        match insert_records(&tx, records) {
            Ok(inserted) => {
                tx.commit()?;
                Ok(inserted)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback() {
                    tracing::error!(error = %rollback_err, "Rollback failed");
                }
                Err(e)
            }
        }
    }
}

fn insert_records(tx: &Transaction<'_>, records: &[DeltaRecord]) -> Result<usize, DbError> {
    let mut stmt = tx.prepare("INSERT INTO deltatable (Rep_dt, Delta) VALUES (?1, ?2)")?;
    for record in records {
        stmt.execute(rusqlite::params![record.report_date, record.delta])?;
    }
    Ok(records.len())
}

impl RecordStore for Database {
    fn append(&self, records: &[DeltaRecord]) -> Result<usize, DbError> {
        self.append_records(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(month: u32, delta: f64) -> DeltaRecord {
        DeltaRecord::new(NaiveDate::from_ymd_opt(2024, month, 1).unwrap(), delta)
    }

    #[test]
    fn test_append_commits_all_rows() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::at(dir.path().join("delta.db")).unwrap();

        let inserted = db.append_records(&[record(1, 1.0), record(2, 2.0)]).unwrap();
        assert_eq!(inserted, 2);
        assert_eq!(db.count_records().unwrap(), 2);

        let conn = db.connect().unwrap();
        let stored: String = conn
            .query_row("SELECT Rep_dt FROM deltatable ORDER BY id LIMIT 1", [], |row| row.get(0))
            .unwrap();
        assert_eq!(stored, "2024-01-01");
    }

    #[test]
    fn test_failed_append_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::at(dir.path().join("delta.db")).unwrap();
        db.append_records(&[record(1, 1.0)]).unwrap();

        // Reject the third row of the next batch.
        db.connect()
            .unwrap()
            .execute_batch(
                "CREATE TRIGGER reject_march BEFORE INSERT ON deltatable
                 WHEN NEW.Rep_dt = '2024-03-01'
                 BEGIN SELECT RAISE(ABORT, 'simulated store failure'); END;",
            )
            .unwrap();

        let result = db.append_records(&[record(2, 2.0), record(4, 4.0), record(3, 3.0)]);
        assert!(result.is_err());
        assert_eq!(db.count_records().unwrap(), 1);
    }
}
