use thiserror::Error;

use bow_core::ValidationErrors;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("unsupported file type: {0} (expected .csv, .xlsx or .xls)")]
    UnsupportedFormat(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("the file is empty")]
    Empty,

    #[error("the file has no header row")]
    NoHeaders,

    #[error("the file has more than {max} data rows")]
    TooManyRows { max: usize },

    #[error("invalid column mapping: {0}")]
    InvalidMapping(ValidationErrors),

    #[error("{count} row(s) failed validation")]
    InvalidRows { count: usize },
}

impl From<calamine::Error> for ImportError {
    fn from(e: calamine::Error) -> Self {
        ImportError::Spreadsheet(e.to_string())
    }
}
