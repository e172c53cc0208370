//! Storage side of request intake and result retrieval: staging an upload
//! with its rule documents under a fresh request id, and looking up the
//! persisted mapping record and normalized table afterwards.

use std::path::Path;

use log::{info, warn};
use uuid::Uuid;

use crate::{
    error::{MapError, Result, StorageError},
    rules::ColumnMapping,
    schema::SchemaSpec,
    storage::{CONTENT_TYPE_CSV, CONTENT_TYPE_JSON, ObjectStore, keys},
};

#[derive(Debug, Clone, Default)]
pub struct RuleDocuments {
    pub manual: Option<Vec<u8>>,
    pub statics: Option<Vec<u8>>,
    pub definitions: Option<Vec<u8>>,
    pub exclusions: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedUpload {
    pub id: String,
    pub key: String,
}

pub fn stage_upload(
    store: &dyn ObjectStore,
    filename: &str,
    content: &[u8],
    rules: &RuleDocuments,
) -> Result<StagedUpload> {
    let name = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| MapError::InvalidUploadKey(filename.to_string()))?;
    let id = Uuid::new_v4().to_string();

    let documents = [
        ("rules", &rules.manual, keys::manual_rules(&id)),
        ("static rules", &rules.statics, keys::static_rules(&id)),
        ("column definitions", &rules.definitions, keys::column_definitions(&id)),
        ("exclusions", &rules.exclusions, keys::exclusions(&id)),
    ];
    for (label, body, _) in &documents {
        if let Some(body) = body {
            validate_document(label, body)?;
        }
    }
    // Rules go first so they are in place when the upload triggers processing.
    for (label, body, key) in &documents {
        if let Some(body) = body {
            store.put(key, body, CONTENT_TYPE_JSON)?;
            info!("Stored {label} at {key}");
        }
    }

    let key = keys::upload(&id, name);
    store.put(&key, content, CONTENT_TYPE_CSV)?;
    info!("Staged {} byte(s) at {key}", content.len());
    Ok(StagedUpload { id, key })
}

fn validate_document(label: &str, body: &[u8]) -> Result<()> {
    match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(_)) => Ok(()),
        Ok(_) => Err(MapError::InvalidRuleDocument {
            name: label.to_string(),
            reason: "top-level value must be an object".to_string(),
        }),
        Err(err) => Err(MapError::InvalidRuleDocument {
            name: label.to_string(),
            reason: err.to_string(),
        }),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedResult {
    pub download_key: String,
    pub mapping: ColumnMapping,
    pub table: Option<Vec<u8>>,
}

/// Looks up the artifacts produced for `filename` under request `id`.
///
/// A missing or unreadable mapping record yields an empty mapping; a missing
/// table yields `None`.
pub fn fetch_result(
    store: &dyn ObjectStore,
    id: &str,
    filename: &str,
    schema: &SchemaSpec,
) -> Result<FetchedResult> {
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);
    let download_key = keys::download(&format!("{id}_{stem}"), schema);

    let mapping_key = keys::mapping_record(id, schema);
    let mapping = match store.get(&mapping_key) {
        Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|err| {
            warn!("Mapping record {mapping_key} is unreadable: {err}");
            ColumnMapping::new()
        }),
        Err(err) => {
            warn!("Mapping record not found: {err}");
            ColumnMapping::new()
        }
    };

    let table = match store.get(&download_key) {
        Ok(bytes) => Some(bytes),
        Err(StorageError::NotFound { .. }) => None,
        Err(err) => return Err(err.into()),
    };
    Ok(FetchedResult {
        download_key,
        mapping,
        table,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{BIOSAMPLE, SRA};
    use crate::storage::MemoryStore;

    #[test]
    fn stage_upload_assigns_uuid_and_stores_rules() {
        let store = MemoryStore::new();
        let rules = RuleDocuments {
            manual: Some(br#"{"sra_manual_mappings": {"A": "sample_name"}}"#.to_vec()),
            statics: Some(br#"{"sra_static": {"platform": "ILLUMINA"}}"#.to_vec()),
            ..RuleDocuments::default()
        };
        let staged = stage_upload(&store, "/tmp/data/lab.csv", b"A\n1\n", &rules).unwrap();
        assert!(Uuid::parse_str(&staged.id).is_ok());
        assert_eq!(staged.key, format!("upload/{}_lab.csv", staged.id));
        assert!(store.exists(&keys::manual_rules(&staged.id)).unwrap());
        assert!(store.exists(&keys::static_rules(&staged.id)).unwrap());
        assert!(!store.exists(&keys::exclusions(&staged.id)).unwrap());
        assert_eq!(store.get(&staged.key).unwrap(), b"A\n1\n");
    }

    #[test]
    fn stage_upload_rejects_invalid_rule_documents_before_writing() {
        let store = MemoryStore::new();
        let rules = RuleDocuments {
            exclusions: Some(b"[\"not\", \"an object\"]".to_vec()),
            ..RuleDocuments::default()
        };
        let err = stage_upload(&store, "lab.csv", b"A\n", &rules).unwrap_err();
        assert!(matches!(err, MapError::InvalidRuleDocument { .. }));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn fetch_result_tolerates_missing_artifacts() {
        let store = MemoryStore::new();
        store
            .put("mappings/u1_sra.json", br#"{"A": "sample_name"}"#, CONTENT_TYPE_JSON)
            .unwrap();
        store
            .put("download/u1_lab_sra.csv", b"sample_name\n1\n", CONTENT_TYPE_CSV)
            .unwrap();

        let sra = fetch_result(&store, "u1", "lab.xlsx", &SRA).unwrap();
        assert_eq!(sra.download_key, "download/u1_lab_sra.csv");
        assert_eq!(sra.mapping["A"], "sample_name");
        assert_eq!(sra.table.as_deref(), Some(&b"sample_name\n1\n"[..]));

        let biosample = fetch_result(&store, "u1", "lab.xlsx", &BIOSAMPLE).unwrap();
        assert!(biosample.mapping.is_empty());
        assert!(biosample.table.is_none());
    }
}
