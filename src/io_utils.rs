//! Delimited text helpers: encoding resolution, decoding, CSV reader and
//! writer construction.
//!
//! Uploaded bytes are decoded with the configured encoding (a leading BOM
//! overrides it). Normalized tables are always written as UTF-8 with a header
//! row and minimal quoting.

use std::io::Read;

use anyhow::{Context, Result, anyhow};
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};

use crate::data::Table;

pub const DEFAULT_CSV_DELIMITER: u8 = b',';

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!("Failed to decode text with encoding {}", used.name()))
    } else {
        Ok(text.into_owned())
    }
}

/// Builds a reader for uploaded text. Records may carry fewer fields than the
/// header; callers decide what to do with longer ones.
pub fn open_csv_reader<R>(reader: R, delimiter: u8, has_headers: bool) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(has_headers)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true);
    builder.from_reader(reader)
}

pub fn table_to_csv(table: &Table, delimiter: u8) -> Result<Vec<u8>> {
    let mut builder = csv::WriterBuilder::new();
    builder
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Necessary)
        .double_quote(true);
    let mut writer = builder.from_writer(Vec::new());
    writer
        .write_record(table.column_names())
        .context("Writing header row")?;
    for (idx, row) in table.rows().enumerate() {
        writer
            .write_record(&row)
            .with_context(|| format!("Writing row {}", idx + 2))?;
    }
    writer
        .into_inner()
        .map_err(|err| anyhow!("Flushing CSV output: {}", err.error()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::WINDOWS_1252;

    #[test]
    fn decode_bytes_prefers_bom_over_label() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice("id,name\n".as_bytes());
        let text = decode_bytes(&bytes, WINDOWS_1252).expect("decode");
        assert_eq!(text, "id,name\n");
    }

    #[test]
    fn resolve_encoding_rejects_unknown_labels() {
        assert!(resolve_encoding(Some("not-a-charset")).is_err());
        assert_eq!(resolve_encoding(None).unwrap(), UTF_8);
        assert_eq!(resolve_encoding(Some(" latin1 ")).unwrap(), WINDOWS_1252);
    }

    #[test]
    fn table_to_csv_quotes_only_when_needed() {
        let table = Table::from_rows(
            vec!["name".into(), "note".into()],
            vec![vec![Some("a".into()), Some("x, y".into())], vec![None, None]],
        );
        let csv = String::from_utf8(table_to_csv(&table, b',').unwrap()).unwrap();
        assert_eq!(csv, "name,note\na,\"x, y\"\n,\n");
    }
}
