//! CSV interchange format shared by raw inputs and processed outputs.
//!
//! Nulls are written as empty fields and dates as `YYYY-MM-DD`.

use std::io::Cursor;

use polars::prelude::*;

pub const CSV_CONTENT_TYPE: &str = "text/csv";

/// Parses a comma-separated object with a header row. The schema is inferred
/// over the whole file so a late non-numeric value turns the column into text
/// instead of failing the read.
pub fn read_csv(content: &[u8]) -> PolarsResult<DataFrame> {
    let cursor = Cursor::new(content);
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .into_reader_with_file_handle(cursor)
        .finish()
}

pub fn write_csv(df: &DataFrame) -> PolarsResult<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut clone = df.clone();
    CsvWriter::new(&mut buffer)
        .include_header(true)
        .finish(&mut clone)?;
    Ok(buffer)
}
