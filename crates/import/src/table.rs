//! Reading uploaded CSV and Excel files into a header + rows table.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use tracing::debug;

use crate::ImportError;

/// Largest number of data rows accepted in one upload.
pub const MAX_ROWS: usize = 5_000;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// An uploaded sheet. Every row has exactly `headers.len()` cells.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// 1-based source line (CSV) or sheet row (Excel) of each entry in `rows`.
    lines: Vec<usize>,
}

impl Table {
    /// A table whose header sits on line 1 and rows follow without gaps.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let lines = (2..rows.len() + 2).collect();
        Self { headers, rows, lines }
    }

    /// Where row `index` came from in the uploaded file.
    pub fn line(&self, index: usize) -> usize {
        self.lines.get(index).copied().unwrap_or(index + 2)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Build a table from `(line, cells)` records. The first record is the
    /// header row; blank rows after it are skipped and every row is padded
    /// or cut to the header width.
    fn from_records(records: Vec<(usize, Vec<String>)>) -> Result<Self, ImportError> {
        let mut records = records
            .into_iter()
            .map(|(line, r)| (line, r.into_iter().map(|c| c.trim().to_string()).collect::<Vec<_>>()));

        let (_, mut headers) = records.next().ok_or(ImportError::Empty)?;
        while headers.last().is_some_and(|h| h.is_empty()) {
            headers.pop();
        }
        if headers.is_empty() {
            let any_data = records.any(|(_, r)| r.iter().any(|c| !c.is_empty()));
            return Err(if any_data { ImportError::NoHeaders } else { ImportError::Empty });
        }

        let width = headers.len();
        let mut rows = Vec::new();
        let mut lines = Vec::new();
        for (line, mut row) in records {
            row.truncate(width);
            if row.iter().all(|c| c.is_empty()) {
                continue;
            }
            if rows.len() == MAX_ROWS {
                return Err(ImportError::TooManyRows { max: MAX_ROWS });
            }
            row.resize(width, String::new());
            rows.push(row);
            lines.push(line);
        }

        Ok(Self { headers, rows, lines })
    }
}

/// Parse an uploaded file, choosing the reader by extension.
pub fn read_table(filename: &str, bytes: &[u8]) -> Result<Table, ImportError> {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    let table = match extension.as_str() {
        "csv" | "txt" => read_csv(bytes)?,
        "xlsx" | "xls" | "xlsm" => read_workbook(bytes)?,
        _ => return Err(ImportError::UnsupportedFormat(filename.to_string())),
    };

    debug!(
        file = %filename,
        columns = table.headers.len(),
        rows = table.len(),
        "read import table"
    );
    Ok(table)
}

pub fn read_csv(bytes: &[u8]) -> Result<Table, ImportError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(ImportError::Empty);
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut records = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let line = record
            .position()
            .map_or(index + 1, |p| usize::try_from(p.line()).unwrap_or(usize::MAX));
        records.push((line, record.iter().map(str::to_string).collect()));
    }
    Table::from_records(records)
}

/// First worksheet of an xlsx/xls workbook. Date cells become `YYYY-MM-DD`.
pub fn read_workbook(bytes: &[u8]) -> Result<Table, ImportError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(ImportError::Empty)??;

    let first_row = range.start().map_or(0, |(row, _)| row as usize);
    let records: Vec<(usize, Vec<String>)> = range
        .rows()
        .enumerate()
        .map(|(i, row)| (first_row + i + 1, row.iter().map(cell_text).collect()))
        .collect();
    Table::from_records(records)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        // Whole floats come back from Excel for integer cells.
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => excel_serial_date(dt.as_f64())
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        Data::DateTimeIso(s) => s.split('T').next().unwrap_or_default().to_string(),
        Data::DurationIso(s) => s.clone(),
    }
}

/// Excel's 1900 date system counts days from 1899-12-30.
fn excel_serial_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_signed(Duration::days(serial.trunc() as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_csv_with_bom_and_blank_rows() {
        let csv = "\u{feff}Title,Due Date\nFirst,2026-03-01\n,\n\nSecond,\n";
        let table = read_table("items.csv", csv.as_bytes()).unwrap();
        assert_eq!(table.headers, vec!["Title", "Due Date"]);
        assert_eq!(
            table.rows,
            vec![
                vec!["First".to_string(), "2026-03-01".to_string()],
                vec!["Second".to_string(), String::new()],
            ]
        );
    }

    #[test]
    fn rows_remember_their_line_in_the_file() {
        let csv = "Title,Owner\nFirst,a@example.com\n\n,\nSecond,\n\"Multi\nline\",\nThird,\n";
        let table = read_csv(csv.as_bytes()).unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.line(0), 2);
        assert_eq!(table.line(1), 5);
        assert_eq!(table.line(2), 6);
        assert_eq!(table.line(3), 8);
    }

    #[test]
    fn ragged_rows_are_padded_and_cut() {
        let csv = "a,b,c\n1\n1,2,3,4\n";
        let table = read_csv(csv.as_bytes()).unwrap();
        assert_eq!(table.rows[0], vec!["1", "", ""]);
        assert_eq!(table.rows[1], vec!["1", "2", "3"]);
    }

    #[test]
    fn rejects_empty_and_headerless_files() {
        assert!(matches!(read_csv(b""), Err(ImportError::Empty)));
        assert!(matches!(read_csv(b" \n \n"), Err(ImportError::Empty)));
        assert!(matches!(read_csv(b",,\n,,\n"), Err(ImportError::Empty)));
        assert!(matches!(read_csv(b",,\nx,y,z\n"), Err(ImportError::NoHeaders)));
    }

    #[test]
    fn header_only_file_has_no_rows() {
        let table = read_csv(b"Title,Status\n").unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn rejects_unknown_extension() {
        let err = read_table("notes.pdf", b"x").unwrap_err();
        assert!(matches!(err, ImportError::UnsupportedFormat(_)));
    }

    #[test]
    fn enforces_row_limit() {
        let mut csv = String::from("title\n");
        for i in 0..=MAX_ROWS {
            csv.push_str(&format!("row {i}\n"));
        }
        let err = read_csv(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, ImportError::TooManyRows { max: MAX_ROWS }));

        let mut exact = String::from("title\n");
        for i in 0..MAX_ROWS {
            exact.push_str(&format!("row {i}\n"));
        }
        assert_eq!(read_csv(exact.as_bytes()).unwrap().len(), MAX_ROWS);
    }

    #[test]
    fn garbage_workbook_is_a_spreadsheet_error() {
        let err = read_table("book.xlsx", b"not a zip").unwrap_err();
        assert!(matches!(err, ImportError::Spreadsheet(_)));
    }

    #[test]
    fn excel_serial_dates() {
        assert_eq!(excel_serial_date(46_082.0), NaiveDate::from_ymd_opt(2026, 3, 1));
        assert_eq!(excel_serial_date(46_082.75), NaiveDate::from_ymd_opt(2026, 3, 1));
        assert_eq!(excel_serial_date(0.0), None);
    }
}
