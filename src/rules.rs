//! Optional per-request rule documents.
//!
//! Four JSON documents may accompany an upload. Each is looked up by request
//! id; a missing or malformed document is logged and treated as absent.
//! Section entries keep document order, so a later entry wins when two of
//! them write the same target column.

use std::collections::BTreeMap;

use log::{info, warn};
use serde_json::{Map, Value};

use crate::{
    error::{MapError, Result},
    schema::SchemaSpec,
    storage::{ObjectStore, keys},
};

/// Source column -> target column, as persisted in the mapping record.
pub type ColumnMapping = BTreeMap<String, String>;
/// `(key, value)` pairs of one rule section in document order.
pub type RuleEntries = Vec<(String, String)>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestRules {
    pub manual: Option<Map<String, Value>>,
    pub statics: Option<Map<String, Value>>,
    pub definitions: Option<Map<String, Value>>,
    pub exclusions: Option<Map<String, Value>>,
}

/// Rules narrowed to one target schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaRules {
    /// Source column -> target column.
    pub manual_mappings: Option<RuleEntries>,
    /// Target column -> constant fill value.
    pub static_values: Option<RuleEntries>,
    /// Target column -> description.
    pub column_definitions: Option<RuleEntries>,
    /// Source column -> forbidden target column.
    pub exclusions: Option<RuleEntries>,
}

impl RequestRules {
    pub fn load(store: &dyn ObjectStore, id: &str) -> Self {
        let rules = Self {
            manual: load_optional(store, &keys::manual_rules(id)),
            statics: load_optional(store, &keys::static_rules(id)),
            definitions: load_optional(store, &keys::column_definitions(id)),
            exclusions: load_optional(store, &keys::exclusions(id)),
        };
        info!(
            "Rule documents for {id}: manual={} static={} definitions={} exclusions={}",
            rules.manual.is_some(),
            rules.statics.is_some(),
            rules.definitions.is_some(),
            rules.exclusions.is_some()
        );
        rules
    }

    pub fn for_schema(&self, schema: &SchemaSpec) -> SchemaRules {
        SchemaRules {
            manual_mappings: section(&self.manual, &schema.manual_mappings_section()),
            static_values: section(&self.statics, &schema.static_section()),
            column_definitions: section(&self.definitions, "column_definitions"),
            exclusions: section(&self.exclusions, &schema.exclusions_section()),
        }
    }
}

fn load_optional(store: &dyn ObjectStore, key: &str) -> Option<Map<String, Value>> {
    match fetch_document(store, key) {
        Ok(document) => Some(document),
        Err(err) => {
            warn!("{err}; proceeding without it");
            None
        }
    }
}

pub fn fetch_document(store: &dyn ObjectStore, key: &str) -> Result<Map<String, Value>> {
    let not_found = |reason: String| MapError::RuleNotFound {
        key: key.to_string(),
        reason,
    };
    if !store.exists(key).map_err(|err| not_found(err.to_string()))? {
        return Err(not_found("no such object".to_string()));
    }
    let bytes = store.get(key).map_err(|err| not_found(err.to_string()))?;
    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(not_found("document is not a JSON object".to_string())),
        Err(err) => Err(not_found(format!("invalid JSON: {err}"))),
    }
}

/// Reads `document[name]` as a string map. Scalar values are rendered as
/// text; nested values and nulls are skipped.
fn section(document: &Option<Map<String, Value>>, name: &str) -> Option<RuleEntries> {
    let Some(Value::Object(entries)) = document.as_ref()?.get(name) else {
        return None;
    };
    let mut out = RuleEntries::with_capacity(entries.len());
    for (key, value) in entries {
        match scalar_text(value) {
            Some(text) => out.push((key.clone(), text)),
            None => warn!("Ignoring non-scalar value for '{key}' in '{name}'"),
        }
    }
    Some(out)
}

/// Value of the last entry for `key`.
pub fn lookup<'a>(entries: &'a [(String, String)], key: &str) -> Option<&'a str> {
    entries
        .iter()
        .rev()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
