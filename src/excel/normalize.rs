//! Type normalisation from raw cells into [`DeltaRecord`]s.
//!
//! Report dates accept mixed formats. Ambiguous numeric dates are read
//! month-first (`03/04/2024` is 4 March); day-first is used only when the
//! first component cannot be a month (`13/04/2024` is 13 April). Delta values
//! accept a comma decimal separator.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use std::path::Path;

use super::reader::{column_index_to_letter, read_sheet};
use super::types::*;
use crate::config::ColumnConfig;
use crate::database::DeltaRecord;

const MIN_REPORT_YEAR: i32 = 1;
const MAX_REPORT_YEAR: i32 = 9999;

const ISO_DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"];

const ISO_DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

// Two-digit years first: `%Y` would otherwise accept "24" as year 24.
const MONTH_FIRST_FORMATS: [&str; 6] = ["%m/%d/%y", "%m-%d-%y", "%m.%d.%y", "%m/%d/%Y", "%m-%d-%Y", "%m.%d.%Y"];

const DAY_FIRST_FORMATS: [&str; 6] = ["%d/%m/%y", "%d-%m-%y", "%d.%m.%y", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"];

const TEXTUAL_FORMATS: [&str; 8] = [
    "%d %b %Y",
    "%d %B %Y",
    "%d-%b-%Y",
    "%d-%B-%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
    "%B %d %Y",
];

/// Load a workbook and normalise its date and delta columns.
///
/// Fails on the first problem; no partial result is returned.
pub fn load_delta_records(path: &Path, columns: &ColumnConfig) -> Result<Vec<DeltaRecord>, ExcelError> {
    let table = read_sheet(path, None)?;
    records_from_table(&table, columns)
}

/// Normalise an in-memory sheet.
pub fn records_from_table(table: &SheetTable, columns: &ColumnConfig) -> Result<Vec<DeltaRecord>, ExcelError> {
    let date_idx = table
        .column_index(&columns.date)
        .ok_or_else(|| ExcelError::missing_column(&columns.date))?;
    let delta_idx = table
        .column_index(&columns.delta)
        .ok_or_else(|| ExcelError::missing_column(&columns.delta))?;

    let mut records = Vec::with_capacity(table.rows.len());

    for (offset, row) in table.rows.iter().enumerate() {
        if row.iter().all(CellValue::is_empty) {
            continue;
        }

        let row_number = table.first_row_number + offset as u32;
        let cell_ref = |idx: usize| {
            format!("{}{}", column_index_to_letter(table.first_column + idx as u32), row_number)
        };

        let date_cell = row.get(date_idx).unwrap_or(&CellValue::Empty);
        let report_date = parse_report_date(date_cell)
            .map_err(|e| ExcelError::new(format!("{} ({}): {}", cell_ref(date_idx), columns.date, e.message), e.error_type))?;

        let delta_cell = row.get(delta_idx).unwrap_or(&CellValue::Empty);
        let delta = parse_delta(delta_cell)
            .map_err(|e| ExcelError::new(format!("{} ({}): {}", cell_ref(delta_idx), columns.delta, e.message), e.error_type))?;

        records.push(DeltaRecord::new(report_date, delta));
    }

    Ok(records)
}

/// Parse a report-date cell. Time-of-day is discarded.
///
/// Dates must fall within years 1..=9999, where stored ISO text sorts in
/// date order.
pub fn parse_report_date(cell: &CellValue) -> Result<NaiveDate, ExcelError> {
    let date = parse_date_cell(cell)?;
    if !(MIN_REPORT_YEAR..=MAX_REPORT_YEAR).contains(&date.year()) {
        return Err(ExcelError::new(
            format!("date {} is outside years {}..={}", date, MIN_REPORT_YEAR, MAX_REPORT_YEAR),
            ExcelErrorType::InvalidDate,
        ));
    }
    Ok(date)
}

fn parse_date_cell(cell: &CellValue) -> Result<NaiveDate, ExcelError> {
    match cell {
        CellValue::DateTime(dt) => Ok(dt.date()),
        CellValue::String(s) if !s.trim().is_empty() => parse_date_str(s.trim()),
        CellValue::Empty | CellValue::String(_) => {
            Err(ExcelError::new("date is empty", ExcelErrorType::EmptyCell))
        }
        CellValue::Number(n) => Err(ExcelError::new(
            format!("expected a date, found number {}", n),
            ExcelErrorType::InvalidDate,
        )),
        CellValue::Boolean(b) => Err(ExcelError::new(
            format!("expected a date, found boolean {}", b),
            ExcelErrorType::InvalidDate,
        )),
        CellValue::Error(e) => Err(ExcelError::new(
            format!("cell error {}", e),
            ExcelErrorType::InvalidDate,
        )),
    }
}

/// Parse a textual date using the mixed-format rules.
pub fn parse_date_str(s: &str) -> Result<NaiveDate, ExcelError> {
    if let Some(date) = try_parse_date(s) {
        return Ok(date);
    }

    // Fall back to the date part of "<date> <time>" strings.
    if let Some(first) = s.split_whitespace().next() {
        if first.len() < s.len() {
            if let Some(date) = try_parse_numeric(first) {
                return Ok(date);
            }
        }
    }

    Err(ExcelError::new(format!("invalid date '{}'", s), ExcelErrorType::InvalidDate))
}

fn try_parse_date(s: &str) -> Option<NaiveDate> {
    if let Some(date) = try_parse_numeric(s) {
        return Some(date);
    }

    if leading_digits(s) == 4 {
        for fmt in ISO_DATETIME_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
                return Some(dt.date());
            }
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.date_naive());
        }
    }

    TEXTUAL_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

fn try_parse_numeric(s: &str) -> Option<NaiveDate> {
    let formats: &[&str] = match leading_digits(s) {
        4 => &ISO_DATE_FORMATS,
        1 | 2 => {
            return MONTH_FIRST_FORMATS
                .iter()
                .chain(DAY_FIRST_FORMATS.iter())
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok());
        }
        _ => return None,
    };
    formats.iter().find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

fn leading_digits(s: &str) -> usize {
    s.chars().take_while(|c| c.is_ascii_digit()).count()
}

/// Parse a delta cell. Text accepts `,` as the decimal separator.
pub fn parse_delta(cell: &CellValue) -> Result<f64, ExcelError> {
    let value = match cell {
        CellValue::Number(n) => *n,
        CellValue::String(s) if !s.trim().is_empty() => parse_decimal_str(s)?,
        CellValue::Empty | CellValue::String(_) => {
            return Err(ExcelError::new("delta is empty", ExcelErrorType::EmptyCell));
        }
        CellValue::Boolean(b) => {
            return Err(ExcelError::new(
                format!("expected a number, found boolean {}", b),
                ExcelErrorType::InvalidNumber,
            ));
        }
        CellValue::DateTime(dt) => {
            return Err(ExcelError::new(
                format!("expected a number, found date {}", dt),
                ExcelErrorType::InvalidNumber,
            ));
        }
        CellValue::Error(e) => {
            return Err(ExcelError::new(format!("cell error {}", e), ExcelErrorType::InvalidNumber));
        }
    };

    if !value.is_finite() {
        return Err(ExcelError::new(
            format!("delta {} is not finite", value),
            ExcelErrorType::InvalidNumber,
        ));
    }
    Ok(value)
}

fn parse_decimal_str(raw: &str) -> Result<f64, ExcelError> {
    let invalid = || ExcelError::new(format!("invalid number '{}'", raw), ExcelErrorType::InvalidNumber);

    let compact: String = raw
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}')
        .collect();

    let commas = compact.matches(',').count();
    if commas > 1 || (commas == 1 && compact.contains('.')) {
        return Err(invalid());
    }

    compact.replace(',', ".").parse::<f64>().map_err(|_| invalid())
}
