//! Writes the mapping record and normalized table for one schema.
//!
//! The two artifacts are written independently: a failure on one is logged
//! and does not prevent the attempt on the other.

use anyhow::{Context, Result};
use log::{error, info};
use serde::Serialize;

use crate::{
    data::Table,
    io_utils,
    rules::ColumnMapping,
    storage::{CONTENT_TYPE_CSV, CONTENT_TYPE_JSON, ObjectStore},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitTargets {
    pub mapping_key: String,
    pub table_key: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EmitReport {
    pub mapping_written: bool,
    pub table_written: bool,
}

pub fn render_mapping(mapping: &ColumnMapping) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(mapping).context("Serializing mapping record")
}

pub fn emit(
    store: &dyn ObjectStore,
    targets: &EmitTargets,
    mapping: &ColumnMapping,
    table: &Table,
) -> EmitReport {
    let mapping_written = write_artifact(store, &targets.mapping_key, CONTENT_TYPE_JSON, || {
        render_mapping(mapping)
    });
    let table_written = write_artifact(store, &targets.table_key, CONTENT_TYPE_CSV, || {
        io_utils::table_to_csv(table, io_utils::DEFAULT_CSV_DELIMITER)
    });
    EmitReport {
        mapping_written,
        table_written,
    }
}

fn write_artifact<F>(store: &dyn ObjectStore, key: &str, content_type: &str, render: F) -> bool
where
    F: FnOnce() -> Result<Vec<u8>>,
{
    let outcome = render().and_then(|bytes| {
        store
            .put(key, &bytes, content_type)
            .with_context(|| format!("Uploading {key}"))
            .map(|()| bytes.len())
    });
    match outcome {
        Ok(size) => {
            info!("✓ Wrote {key} ({size} bytes)");
            true
        }
        Err(err) => {
            error!("Failed to write {key}: {err:#}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use crate::storage::{MemoryStore, StorageResult};

    struct RejectingStore {
        inner: MemoryStore,
        reject_prefix: &'static str,
    }

    impl ObjectStore for RejectingStore {
        fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
            self.inner.get(key)
        }

        fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> StorageResult<()> {
            if key.starts_with(self.reject_prefix) {
                return Err(StorageError::Rejected {
                    key: key.to_string(),
                    reason: "quota exceeded".to_string(),
                });
            }
            self.inner.put(key, bytes, content_type)
        }

        fn exists(&self, key: &str) -> StorageResult<bool> {
            self.inner.exists(key)
        }

        fn list(&self) -> StorageResult<Vec<String>> {
            self.inner.list()
        }
    }

    fn targets() -> EmitTargets {
        EmitTargets {
            mapping_key: "mappings/u1_sra.json".to_string(),
            table_key: "download/u1_lab_sra.csv".to_string(),
        }
    }

    fn sample() -> (ColumnMapping, Table) {
        let mut mapping = ColumnMapping::new();
        mapping.insert("Sample".into(), "sample_name".into());
        let table = Table::from_rows(vec!["sample_name".into()], vec![vec![Some("S1".into())]]);
        (mapping, table)
    }

    #[test]
    fn emit_writes_indented_json_and_csv() {
        let store = MemoryStore::new();
        let (mapping, table) = sample();
        let report = emit(&store, &targets(), &mapping, &table);
        assert_eq!(
            report,
            EmitReport {
                mapping_written: true,
                table_written: true
            }
        );

        let record = store.object("mappings/u1_sra.json").unwrap();
        assert_eq!(record.content_type, CONTENT_TYPE_JSON);
        assert_eq!(
            String::from_utf8(record.bytes).unwrap(),
            "{\n  \"Sample\": \"sample_name\"\n}"
        );
        let csv = store.object("download/u1_lab_sra.csv").unwrap();
        assert_eq!(csv.content_type, CONTENT_TYPE_CSV);
        assert_eq!(String::from_utf8(csv.bytes).unwrap(), "sample_name\nS1\n");
    }

    #[test]
    fn failed_mapping_write_does_not_block_table_write() {
        let store = RejectingStore {
            inner: MemoryStore::new(),
            reject_prefix: "mappings/",
        };
        let (mapping, table) = sample();
        let report = emit(&store, &targets(), &mapping, &table);
        assert!(!report.mapping_written);
        assert!(report.table_written);
        assert_eq!(store.list().unwrap(), vec!["download/u1_lab_sra.csv".to_string()]);
    }

    #[test]
    fn failed_table_write_keeps_mapping_record() {
        let store = RejectingStore {
            inner: MemoryStore::new(),
            reject_prefix: "download/",
        };
        let (mapping, table) = sample();
        let report = emit(&store, &targets(), &mapping, &table);
        assert!(report.mapping_written);
        assert!(!report.table_written);
    }
}
