//! Renders the instruction sent to the mapper for one target schema.
//!
//! Output is a pure function of [`PromptRequest`]; iteration orders are fixed
//! (source column order, schema order, rule document order).

use std::fmt::Write as _;

use itertools::Itertools;

use crate::{
    data::{ColumnKind, Table},
    rules::{self, RuleEntries},
    schema::SchemaSpec,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSample {
    pub name: String,
    pub value: String,
    pub quoted: bool,
}

impl ColumnSample {
    fn render(&self) -> String {
        if self.quoted {
            format!("{:?}", self.value)
        } else {
            self.value.clone()
        }
    }
}

/// Picks one sample per source column, skipping columns already covered by a
/// manual mapping with a non-empty target.
pub fn column_samples(table: &Table, manual: Option<&RuleEntries>) -> Vec<ColumnSample> {
    table
        .columns()
        .iter()
        .filter(|column| {
            !manual
                .and_then(|m| rules::lookup(m, &column.name))
                .is_some_and(|target| !target.is_empty())
        })
        .map(|column| ColumnSample {
            name: column.name.clone(),
            value: column.sample().to_string(),
            quoted: column.kind != ColumnKind::Number,
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct PromptRequest<'a> {
    pub schema: &'a SchemaSpec,
    pub samples: &'a [ColumnSample],
    pub definitions: Option<&'a RuleEntries>,
    pub exclusions: Option<&'a RuleEntries>,
}

impl<'a> PromptRequest<'a> {
    pub fn new(schema: &'a SchemaSpec, samples: &'a [ColumnSample]) -> Self {
        Self {
            schema,
            samples,
            definitions: None,
            exclusions: None,
        }
    }

    pub fn with_definitions(mut self, definitions: Option<&'a RuleEntries>) -> Self {
        self.definitions = definitions.filter(|d| !d.is_empty());
        self
    }

    pub fn with_exclusions(mut self, exclusions: Option<&'a RuleEntries>) -> Self {
        self.exclusions = exclusions.filter(|e| !e.is_empty());
        self
    }

    pub fn render(&self) -> String {
        let format = self.schema.name;
        let mut out = String::new();
        let _ = writeln!(
            out,
            "You are a medical laboratory data expert converting proprietary lab exports \
             into the NCBI {format} submission format."
        );
        let _ = writeln!(
            out,
            "Map each laboratory column below to the NCBI {format} column it corresponds to."
        );

        let _ = writeln!(out, "\nLaboratory columns with a sample value:");
        for sample in self.samples {
            let _ = writeln!(out, "- {}: {}", sample.name, sample.render());
        }

        if let Some(definitions) = self.definitions {
            let _ = writeln!(out, "\nColumn definitions:");
            for (column, text) in definitions {
                let _ = writeln!(out, "- {column}: {text}");
            }
        }

        if let Some(exclusions) = self.exclusions {
            let _ = writeln!(out, "\nForbidden mappings:");
            for (source, target) in exclusions {
                let _ = writeln!(out, "- {source:?} must not be mapped to {target:?}");
            }
        }

        let _ = writeln!(out, "\nRequired NCBI {format} columns:");
        let _ = writeln!(out, "{}", self.schema.required.iter().join(", "));

        let _ = writeln!(out, "\nExample {format} values:");
        let _ = writeln!(out, "{}", render_examples(self.schema.examples));

        let _ = writeln!(out, "\nInstructions:");
        let _ = writeln!(
            out,
            "1. Map each laboratory column to the most appropriate NCBI {format} column."
        );
        let _ = writeln!(
            out,
            "2. Use an empty string \"\" for laboratory columns without a suitable match."
        );
        let _ = writeln!(
            out,
            "3. Return ONLY a single JSON object mapping laboratory column names to NCBI \
             column names, with no other text:"
        );
        let _ = write!(
            out,
            "{{\n  \"lab_column1\": \"ncbi_column1\",\n  \"lab_column2\": \"\"\n}}"
        );
        out
    }
}

fn render_examples(examples: &[(&str, &str)]) -> String {
    if examples.is_empty() {
        return "{}".to_string();
    }
    let body = examples
        .iter()
        .map(|(column, value)| format!("  {}: {}", json_string(column), json_string(value)))
        .join(",\n");
    format!("{{\n{body}\n}}")
}

fn json_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}
