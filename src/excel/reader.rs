use calamine::{open_workbook_auto, Data, Range, Reader, Sheets};
use chrono::{NaiveDate, NaiveDateTime};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::types::*;

/// Extension of files picked up from the source directory
pub const SPREADSHEET_EXTENSION: &str = "xlsx";

/// Read a worksheet (the first one unless named) into a header + rows table.
pub fn read_sheet(path: &Path, sheet: Option<&str>) -> Result<SheetTable, ExcelError> {
    if !path.exists() {
        return Err(ExcelError::file_not_found(&path.display().to_string()));
    }

    let mut workbook: Sheets<_> = open_workbook_auto(path)
        .map_err(|e| ExcelError::invalid_format(format!("Failed to open workbook: {}", e)))?;

    let sheet_names = workbook.sheet_names().to_vec();

    let target_sheet = match sheet {
        Some(name) => {
            if !sheet_names.iter().any(|s| s == name) {
                return Err(ExcelError::sheet_not_found(name));
            }
            name.to_string()
        }
        None => sheet_names
            .first()
            .cloned()
            .ok_or_else(|| ExcelError::invalid_format("Workbook has no worksheets"))?,
    };

    let range = workbook.worksheet_range(&target_sheet)
        .map_err(|e| ExcelError::read_error(format!("Failed to read sheet '{}': {}", target_sheet, e)))?;

    table_from_range(&target_sheet, &range)
}

fn table_from_range(sheet: &str, range: &Range<Data>) -> Result<SheetTable, ExcelError> {
    let mut rows_iter = range.rows();

    let header_cells = rows_iter
        .next()
        .ok_or_else(|| ExcelError::invalid_format(format!("Sheet '{}' is empty", sheet)))?;

    let headers = header_cells
        .iter()
        .map(|cell| match convert_cell_value(Some(cell)) {
            CellValue::String(s) => s.trim().to_string(),
            CellValue::Number(n) => n.to_string(),
            _ => String::new(),
        })
        .collect();

    let rows = rows_iter
        .map(|row| row.iter().map(|cell| convert_cell_value(Some(cell))).collect())
        .collect();

    // Header sits on the range's first row; data starts one below it.
    let (start_row, start_col) = range.start().unwrap_or((0, 0));

    Ok(SheetTable {
        sheet: sheet.to_string(),
        headers,
        rows,
        first_row_number: start_row + 2,
        first_column: start_col,
    })
}

/// Convert calamine Data to our CellValue
fn convert_cell_value(cell: Option<&Data>) -> CellValue {
    match cell {
        None => CellValue::Empty,
        Some(data) => match data {
            Data::Empty => CellValue::Empty,
            Data::String(s) => CellValue::String(s.clone()),
            Data::Float(f) => CellValue::Number(*f),
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Bool(b) => CellValue::Boolean(*b),
            Data::DateTime(dt) => match excel_serial_to_datetime(dt.as_f64()) {
                Some(value) => CellValue::DateTime(value),
                None => CellValue::Error(format!("date serial out of range: {}", dt.as_f64())),
            },
            // Kept as text; the normaliser parses ISO strings like any other.
            Data::DateTimeIso(s) => CellValue::String(s.clone()),
            Data::DurationIso(s) => CellValue::String(s.clone()),
            Data::Error(e) => CellValue::Error(format!("{:?}", e)),
        },
    }
}

/// Convert an Excel date serial (days since 1899-12-30) to a datetime
pub fn excel_serial_to_datetime(value: f64) -> Option<NaiveDateTime> {
    if !value.is_finite() || value < 0.0 {
        return None;
    }

    let days = value.floor() as i64;
    let time_fraction = value.fract();

    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    let date = epoch.checked_add_signed(chrono::Duration::days(days))?;

    let total_seconds = (time_fraction * 86400.0).round() as u32;
    let hours = (total_seconds / 3600).min(23);
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    let time = chrono::NaiveTime::from_hms_opt(hours, minutes, seconds).unwrap_or_default();
    Some(NaiveDateTime::new(date, time))
}

/// Convert column index (0-based) to Excel column letter (A, B, ..., Z, AA, AB, ...)
pub fn column_index_to_letter(index: u32) -> String {
    let mut result = String::new();
    let mut n = index + 1;

    while n > 0 {
        n -= 1;
        let c = (b'A' + (n % 26) as u8) as char;
        result.insert(0, c);
        n /= 26;
    }

    result
}

/// Whether a path ends in `.xlsx`, optionally ignoring case
pub fn has_spreadsheet_extension(path: &Path, case_insensitive: bool) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if case_insensitive => ext.eq_ignore_ascii_case(SPREADSHEET_EXTENSION),
        Some(ext) => ext == SPREADSHEET_EXTENSION,
        None => false,
    }
}

/// Office owner/lock files (`~$Book.xlsx`) that sit next to open workbooks
pub fn is_lock_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with("~$"))
        .unwrap_or(false)
}

/// Compute SHA-256 checksum of a file
pub fn compute_checksum(path: &Path) -> Result<String, ExcelError> {
    let mut file = File::open(path)
        .map_err(|e| ExcelError::read_error(format!("Failed to open file for checksum: {}", e)))?;

    let mut hasher = Sha256::new();
    let mut buffer = [0; 8192];

    loop {
        let bytes_read = file.read(&mut buffer)
            .map_err(|e| ExcelError::read_error(format!("Failed to read file for checksum: {}", e)))?;

        if bytes_read == 0 {
            break;
        }

        hasher.update(&buffer[..bytes_read]);
    }

    let result = hasher.finalize();
    Ok(format!("{:x}", result))
}
