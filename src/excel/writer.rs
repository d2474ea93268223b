use std::path::Path;
use umya_spreadsheet::{new_file, writer};

use super::reader::compute_checksum;
use super::types::{CellValue, ExcelError};

/// Export a header row and data rows to a new Excel file.
/// Returns the checksum of the written file.
pub fn export_to_new_file(
    headers: &[&str],
    rows: &[Vec<CellValue>],
    output_path: &Path,
    sheet_name: Option<&str>,
) -> Result<String, ExcelError> {
    let mut book = new_file();

    let sheet_name = sheet_name.unwrap_or("Sheet1");

    // Create sheet if it doesn't exist
    if book.get_sheet_by_name(sheet_name).is_none() {
        book.new_sheet(sheet_name)
            .map_err(|e| ExcelError::write_error(format!("Failed to create sheet '{}': {}", sheet_name, e)))?;
    }

    let sheet = book.get_sheet_by_name_mut(sheet_name)
        .ok_or_else(|| ExcelError::sheet_not_found(sheet_name))?;

    for (col_idx, header) in headers.iter().enumerate() {
        let col_num = (col_idx + 1) as u32;
        sheet.get_cell_mut((col_num, 1)).set_value_string(*header);
    }

    // Data starts below the header row
    for (row_idx, row) in rows.iter().enumerate() {
        let row_num = 2 + row_idx as u32;

        for (col_idx, cell) in row.iter().enumerate() {
            let col_num = (col_idx + 1) as u32;

            match cell {
                CellValue::Empty => {}
                CellValue::String(s) => {
                    sheet.get_cell_mut((col_num, row_num)).set_value_string(s);
                }
                CellValue::Number(n) => {
                    sheet.get_cell_mut((col_num, row_num)).set_value_number(*n);
                }
                CellValue::Boolean(b) => {
                    sheet.get_cell_mut((col_num, row_num)).set_value_bool(*b);
                }
                CellValue::DateTime(dt) => {
                    let text = if dt.time() == chrono::NaiveTime::MIN {
                        dt.format("%Y-%m-%d").to_string()
                    } else {
                        dt.format("%Y-%m-%dT%H:%M:%S").to_string()
                    };
                    sheet.get_cell_mut((col_num, row_num)).set_value_string(text);
                }
                CellValue::Error(e) => {
                    sheet.get_cell_mut((col_num, row_num)).set_value_string(format!("#{}", e));
                }
            }
        }
    }

    writer::xlsx::write(&book, output_path)
        .map_err(|e| ExcelError::write_error(format!("Failed to write file: {}", e)))?;

    compute_checksum(output_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::excel::reader::read_sheet;

    #[test]
    fn test_export_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xlsx");
        let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();

        let rows = vec![
            vec![CellValue::DateTime(date), CellValue::Number(1.5), CellValue::Empty],
            vec![CellValue::String("2024-02-01".into()), CellValue::String("12,5".into()), CellValue::Boolean(true)],
        ];
        let checksum = export_to_new_file(&["Rep_dt", "Delta", "Flag"], &rows, &path, None).unwrap();
        assert_eq!(checksum.len(), 64);

        let table = read_sheet(&path, None).unwrap();
        assert_eq!(table.headers, vec!["Rep_dt", "Delta", "Flag"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][0], CellValue::String("2024-01-01".into()));
        assert_eq!(table.rows[0][1], CellValue::Number(1.5));
        assert_eq!(table.rows[1][1], CellValue::String("12,5".into()));
    }

    #[test]
    fn test_export_to_named_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("named.xlsx");
        export_to_new_file(&["A"], &[vec![CellValue::Number(1.0)]], &path, Some("LagView")).unwrap();

        let table = read_sheet(&path, Some("LagView")).unwrap();
        assert_eq!(table.sheet, "LagView");
        assert_eq!(table.rows, vec![vec![CellValue::Number(1.0)]]);
    }
}
