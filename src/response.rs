//! Extracts a column mapping from free-form mapper output.

use std::sync::OnceLock;

use log::{debug, warn};
use regex::Regex;
use serde_json::Value;

use crate::{
    error::{MapError, Result},
    rules::ColumnMapping,
};

fn object_span() -> &'static Regex {
    static OBJECT_SPAN: OnceLock<Regex> = OnceLock::new();
    // Greedy: first '{' through last '}', across newlines.
    OBJECT_SPAN.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("static regex"))
}

/// Decodes the outermost `{...}` span of `text` as a mapping.
///
/// Non-string values count as "no match" and become empty targets.
pub fn try_parse(text: &str) -> Result<ColumnMapping> {
    let span = object_span()
        .find(text)
        .ok_or(MapError::ResponseParse)?
        .as_str();
    let Ok(Value::Object(entries)) = serde_json::from_str::<Value>(span) else {
        return Err(MapError::ResponseParse);
    };
    Ok(entries
        .into_iter()
        .map(|(source, target)| {
            let target = match target {
                Value::String(s) => s,
                _ => String::new(),
            };
            (source, target)
        })
        .collect())
}

/// Like [`try_parse`], but any failure yields an empty mapping.
pub fn parse(text: &str) -> ColumnMapping {
    match try_parse(text) {
        Ok(mapping) => {
            debug!("Parsed {} mapping entr(ies) from response", mapping.len());
            mapping
        }
        Err(err) => {
            warn!("{err}; continuing with an empty mapping");
            ColumnMapping::new()
        }
    }
}
