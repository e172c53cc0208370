//! Turns uploaded bytes into a [`Table`].
//!
//! The format is chosen from the file name suffix only: `csv` is parsed as
//! comma-delimited text with a header row, `xlsx`/`xls` as a workbook whose
//! first sheet starts with a header row. Cell contents are not validated.

use std::io::Cursor;

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use encoding_rs::Encoding;
use log::debug;

use crate::{
    data::Table,
    error::{MapError, Result},
    io_utils,
};

/// Cell texts read as null, following the usual spreadsheet/dataframe tokens.
pub const NULL_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Delimited,
    Spreadsheet,
}

impl SourceFormat {
    pub fn from_filename(filename: &str) -> Result<Self> {
        let extension = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "csv" => Ok(SourceFormat::Delimited),
            "xlsx" | "xls" => Ok(SourceFormat::Spreadsheet),
            _ => Err(MapError::UnsupportedFormat {
                filename: filename.to_string(),
                extension,
            }),
        }
    }

    fn label(self) -> &'static str {
        match self {
            SourceFormat::Delimited => "csv",
            SourceFormat::Spreadsheet => "spreadsheet",
        }
    }
}

pub fn load_table(bytes: &[u8], filename: &str, encoding: &'static Encoding) -> Result<Table> {
    let format = SourceFormat::from_filename(filename)?;
    debug!("Loading '{}' as {}", filename, format.label());
    match format {
        SourceFormat::Delimited => load_delimited(bytes, encoding),
        SourceFormat::Spreadsheet => load_spreadsheet(bytes),
    }
}

fn load_delimited(bytes: &[u8], encoding: &'static Encoding) -> Result<Table> {
    let fail = |message: String| MapError::TableLoad {
        format: SourceFormat::Delimited.label(),
        message,
    };
    let text = io_utils::decode_bytes(bytes, encoding).map_err(|err| fail(err.to_string()))?;
    let mut reader =
        io_utils::open_csv_reader(text.as_bytes(), io_utils::DEFAULT_CSV_DELIMITER, true);
    let headers = reader
        .headers()
        .map_err(|err| fail(format!("reading header row: {err}")))?
        .iter()
        .map(str::to_string)
        .collect::<Vec<_>>();
    if headers.is_empty() {
        return Err(fail("no columns to parse".to_string()));
    }

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.map_err(|err| fail(format!("row {}: {err}", idx + 2)))?;
        if record.len() > headers.len() {
            return Err(fail(format!(
                "row {}: expected at most {} field(s), saw {}",
                idx + 2,
                headers.len(),
                record.len()
            )));
        }
        rows.push(record.iter().map(null_or_text).collect());
    }
    Ok(Table::from_rows(headers, rows))
}

fn load_spreadsheet(bytes: &[u8]) -> Result<Table> {
    let fail = |message: String| MapError::TableLoad {
        format: SourceFormat::Spreadsheet.label(),
        message,
    };
    let mut workbook =
        open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(|err| fail(err.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| fail("workbook has no sheets".to_string()))?
        .map_err(|err| fail(err.to_string()))?;

    let mut rows = range.rows();
    let headers = rows
        .next()
        .ok_or_else(|| fail("first sheet is empty".to_string()))?
        .iter()
        .map(|cell| cell_text(cell).unwrap_or_default())
        .collect::<Vec<_>>();
    let body = rows
        .map(|row| row.iter().map(cell_text).collect())
        .collect::<Vec<_>>();
    Ok(Table::from_rows(headers, body))
}

fn null_or_text(raw: &str) -> Option<String> {
    if NULL_TOKENS.contains(&raw) {
        None
    } else {
        Some(raw.to_string())
    }
}

fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) => null_or_text(s),
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) => Some(format_float(*f)),
        Data::Bool(b) => Some(if *b { "True" } else { "False" }.to_string()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(value) if value.time() == chrono::NaiveTime::MIN => {
                Some(value.format("%Y-%m-%d").to_string())
            }
            Some(value) => Some(value.format("%Y-%m-%d %H:%M:%S").to_string()),
            None => Some(format_float(dt.as_f64())),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(s.clone()),
    }
}

fn format_float(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}
