use super::frame::StoredRow;
use super::types::LagRow;
use crate::database::{Database, DbError};

impl Database {
    /// Lag view computed by SQLite's `LEAD` window function, ordered by date.
    /// `id` breaks ties between equal dates.
    pub fn query_lag_rows(&self, periods: usize) -> Result<Vec<LagRow>, DbError> {
        let conn = self.connect()?;

        // The offset is a plain integer, formatted rather than bound.
        let sql = format!(
            "SELECT Rep_dt, Delta,
                    LEAD(Delta, {periods}) OVER (ORDER BY Rep_dt, id) AS DeltaLag
             FROM deltatable
             ORDER BY Rep_dt, id"
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            Ok(LagRow {
                report_date: row.get(0)?,
                delta: row.get(1)?,
                delta_lag: row.get(2)?,
            })
        })?;

        let mut lag_rows = Vec::new();
        for row in rows {
            lag_rows.push(row?);
        }

        Ok(lag_rows)
    }

    /// All stored rows in whatever order SQLite returns them
    pub fn fetch_stored_rows(&self) -> Result<Vec<StoredRow>, DbError> {
        let conn = self.connect()?;

        let mut stmt = conn.prepare("SELECT id, Rep_dt, Delta FROM deltatable")?;
        let rows = stmt.query_map([], |row| {
            Ok(StoredRow {
                id: row.get(0)?,
                report_date: row.get(1)?,
                delta: row.get(2)?,
            })
        })?;

        let mut stored = Vec::new();
        for row in rows {
            stored.push(row?);
        }

        Ok(stored)
    }
}
