use std::path::Path;

use super::types::LagView;
use crate::excel::{export_to_new_file, CellValue, ExcelError};

/// Write a lag view to a new workbook with `Rep_dt`, `Delta`, `DeltaLag`
/// columns. Missing lags are left blank. Returns the file checksum.
pub fn export_lag_view(view: &LagView, output_path: &Path) -> Result<String, ExcelError> {
    let rows: Vec<Vec<CellValue>> = view
        .rows
        .iter()
        .map(|row| {
            vec![
                CellValue::String(row.report_date.format("%Y-%m-%d").to_string()),
                CellValue::Number(row.delta),
                row.delta_lag.map(CellValue::Number).unwrap_or(CellValue::Empty),
            ]
        })
        .collect();

    export_to_new_file(&["Rep_dt", "Delta", "DeltaLag"], &rows, output_path, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColumnConfig;
    use crate::excel::{load_delta_records, read_sheet};
    use crate::lagview::LagRow;
    use chrono::NaiveDate;

    #[test]
    fn test_exported_view_is_loadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lag.xlsx");
        let view = LagView {
            periods: 2,
            rows: vec![
                LagRow {
                    report_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                    delta: 1.0,
                    delta_lag: Some(3.0),
                },
                LagRow {
                    report_date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
                    delta: 2.0,
                    delta_lag: None,
                },
            ],
        };

        export_lag_view(&view, &path).unwrap();

        let table = read_sheet(&path, None).unwrap();
        assert_eq!(table.headers, vec!["Rep_dt", "Delta", "DeltaLag"]);
        assert_eq!(table.rows[0][2], CellValue::Number(3.0));

        // The export doubles as an ingestible file.
        let records = load_delta_records(&path, &ColumnConfig::default()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].delta, 2.0);
    }
}
