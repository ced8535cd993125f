//! Spreadsheet import and CSV export for work items, risks, suppliers and
//! governance items.
//!
//! An import runs in three steps: [`read_table`] parses the upload,
//! [`preview`] validates it against a [`ColumnMapping`], and [`confirm`]
//! yields normalised JSON records for the server to insert.

mod error;
pub mod export;
pub mod mapping;
pub mod table;
pub mod target;
pub mod values;

pub use error::ImportError;
pub use export::{export_records, write_csv, ExportRecord};
pub use mapping::{
    confirm, normalize_row, preview, suggest_mapping, validate_mapping, ColumnMapping, Confirmed,
    Preview, PreviewRow, Record,
};
pub use table::{read_csv, read_table, read_workbook, Table, MAX_ROWS};
pub use target::{FieldKind, FieldSpec, ImportTarget};
