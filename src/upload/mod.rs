//! Splitting uploaded CSV rows into records that can be inserted and rows that cannot.
mod classify;
mod flow;

pub use classify::{
    classify_csv, classify_rows, parse_date, parse_row, read_rows, Classification, CsvRows,
    ErrorRow, RawRow, DATE_FORMATS, MAX_ERROR_PERCENT, MAX_ROWS,
};
pub use flow::UploadFlow;
