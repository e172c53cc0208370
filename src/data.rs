//! In-memory table model shared by the loader, resolver and emitter.
//!
//! A [`Table`] is an ordered list of uniquely named [`Column`]s that all hold
//! the same number of cells. Cells keep the raw text read from the source
//! (`None` for null); each column also records the [`ColumnKind`] inferred
//! from its non-null cells.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%Y/%m/%d", "%d-%m-%Y"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ColumnKind {
    Number,
    Date,
    Text,
    Empty,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ColumnKind::Number => "number",
            ColumnKind::Date => "date",
            ColumnKind::Text => "text",
            ColumnKind::Empty => "empty",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
    pub values: Vec<Option<String>>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        let kind = infer_kind(&values);
        Self {
            name: name.into(),
            kind,
            values,
        }
    }

    pub fn filled(name: impl Into<String>, value: &str, rows: usize) -> Self {
        Self::new(name, vec![Some(value.to_string()); rows])
    }

    pub fn renamed(&self, name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: self.kind,
            values: self.values.clone(),
        }
    }

    /// First non-null cell, or an empty string when every cell is null.
    pub fn sample(&self) -> &str {
        self.values.iter().flatten().next().map_or("", String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    pub fn empty(row_count: usize) -> Self {
        Self {
            columns: Vec::new(),
            row_count,
        }
    }

    /// Builds a table from a header row and raw data rows.
    ///
    /// Header text is kept verbatim. Empty headers become `Unnamed: <index>`
    /// and repeated headers receive `.1`, `.2`, ... suffixes. Short rows are
    /// padded with nulls.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        let names = unique_headers(headers);
        let row_count = rows.len();
        let mut cells: Vec<Vec<Option<String>>> = vec![Vec::with_capacity(row_count); names.len()];
        for row in rows {
            let mut row = row.into_iter();
            for column in cells.iter_mut() {
                column.push(row.next().flatten());
            }
        }
        let columns = names
            .into_iter()
            .zip(cells)
            .map(|(name, values)| Column::new(name, values))
            .collect();
        Self { columns, row_count }
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Replaces the column with the same name in place, or appends it.
    pub fn upsert(&mut self, column: Column) {
        debug_assert_eq!(column.values.len(), self.row_count);
        match self.columns.iter_mut().find(|c| c.name == column.name) {
            Some(existing) => *existing = column,
            None => self.columns.push(column),
        }
    }

    /// Iterates rows as cell slices, rendering nulls as empty strings.
    pub fn rows(&self) -> impl Iterator<Item = Vec<&str>> + '_ {
        (0..self.row_count).map(move |idx| {
            self.columns
                .iter()
                .map(|c| c.values[idx].as_deref().unwrap_or(""))
                .collect()
        })
    }
}

fn unique_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(headers.len());
    for (idx, header) in headers.into_iter().enumerate() {
        let base = if header.is_empty() {
            format!("Unnamed: {idx}")
        } else {
            header
        };
        let mut candidate = base.clone();
        let mut suffix = 1;
        while seen.contains(&candidate) {
            candidate = format!("{base}.{suffix}");
            suffix += 1;
        }
        seen.push(candidate);
    }
    seen
}

#[derive(Debug, Clone)]
struct KindCandidate {
    possible_number: bool,
    possible_date: bool,
    observed: bool,
}

impl KindCandidate {
    fn new() -> Self {
        Self {
            possible_number: true,
            possible_date: true,
            observed: false,
        }
    }

    fn observe(&mut self, value: &str) {
        self.observed = true;
        if self.possible_number && value.trim().parse::<f64>().is_err() {
            self.possible_number = false;
        }
        if self.possible_date && !is_temporal(value.trim()) {
            self.possible_date = false;
        }
    }

    fn decide(&self) -> ColumnKind {
        if !self.observed {
            ColumnKind::Empty
        } else if self.possible_number {
            ColumnKind::Number
        } else if self.possible_date {
            ColumnKind::Date
        } else {
            ColumnKind::Text
        }
    }
}

pub fn infer_kind(values: &[Option<String>]) -> ColumnKind {
    let mut candidate = KindCandidate::new();
    for value in values.iter().flatten() {
        candidate.observe(value);
    }
    candidate.decide()
}

fn is_temporal(value: &str) -> bool {
    DATE_FORMATS
        .iter()
        .any(|fmt| NaiveDate::parse_from_str(value, fmt).is_ok())
        || DATETIME_FORMATS
            .iter()
            .any(|fmt| NaiveDateTime::parse_from_str(value, fmt).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(values: &[&str]) -> Vec<Option<String>> {
        values
            .iter()
            .map(|v| (!v.is_empty()).then(|| v.to_string()))
            .collect()
    }

    #[test]
    fn infer_kind_distinguishes_numbers_dates_and_text() {
        assert_eq!(infer_kind(&cells(&["1", "2.5", ""])), ColumnKind::Number);
        assert_eq!(
            infer_kind(&cells(&["2024-01-01", "02/03/2024"])),
            ColumnKind::Date
        );
        assert_eq!(infer_kind(&cells(&["2024-01-01", "soon"])), ColumnKind::Text);
        assert_eq!(infer_kind(&cells(&["", ""])), ColumnKind::Empty);
    }

    #[test]
    fn from_rows_mangles_blank_and_duplicate_headers() {
        let table = Table::from_rows(
            vec!["id".into(), "".into(), "id".into(), "id".into()],
            vec![cells(&["1", "x", "2", "3"])],
        );
        assert_eq!(
            table.column_names(),
            vec!["id", "Unnamed: 1", "id.1", "id.2"]
        );
    }

    #[test]
    fn from_rows_keeps_surrounding_whitespace_in_headers() {
        let table = Table::from_rows(
            vec![" Patient ID".into(), " ".into()],
            vec![cells(&["P1", "x"])],
        );
        assert_eq!(table.column_names(), vec![" Patient ID", " "]);
    }

    #[test]
    fn from_rows_pads_short_rows_with_nulls() {
        let table = Table::from_rows(
            vec!["a".into(), "b".into()],
            vec![cells(&["1"]), cells(&["2", "x"])],
        );
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column("b").unwrap().values, vec![None, Some("x".into())]);
    }

    #[test]
    fn sample_skips_leading_nulls() {
        let column = Column::new("c", cells(&["", "", "P3"]));
        assert_eq!(column.sample(), "P3");
        assert_eq!(Column::new("d", cells(&["", ""])).sample(), "");
    }

    #[test]
    fn upsert_keeps_position_of_existing_column() {
        let mut table = Table::from_rows(
            vec!["a".into(), "b".into()],
            vec![cells(&["1", "2"])],
        );
        table.upsert(Column::filled("a", "z", 1));
        table.upsert(Column::filled("c", "q", 1));
        assert_eq!(table.column_names(), vec!["a", "b", "c"]);
        assert_eq!(table.rows().next().unwrap(), vec!["z", "2", "q"]);
    }
}
