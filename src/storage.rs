//! Object store capability and the key layout used by one request.
//!
//! The pipeline only ever talks to an [`ObjectStore`]; [`FsStore`] backs the
//! CLI with a local directory and [`MemoryStore`] is the in-process fake.

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
    sync::Mutex,
};

use log::debug;

use crate::{error::StorageError, schema::SchemaSpec};

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_CSV: &str = "text/csv";

pub type StorageResult<T> = std::result::Result<T, StorageError>;

pub trait ObjectStore: Send + Sync {
    fn get(&self, key: &str) -> StorageResult<Vec<u8>>;
    fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> StorageResult<()>;
    fn exists(&self, key: &str) -> StorageResult<bool>;
    fn list(&self) -> StorageResult<Vec<String>>;
}

/// Key layout. Every key is scoped by the request id so concurrent requests
/// never collide; a repeated id overwrites earlier artifacts.
pub mod keys {
    use super::SchemaSpec;

    pub fn upload(id: &str, filename: &str) -> String {
        format!("upload/{id}_{filename}")
    }

    pub fn manual_rules(id: &str) -> String {
        format!("rules/{id}.json")
    }

    pub fn static_rules(id: &str) -> String {
        format!("rules/static_{id}.json")
    }

    pub fn column_definitions(id: &str) -> String {
        format!("rules/columndef_{id}.json")
    }

    pub fn exclusions(id: &str) -> String {
        format!("rules/exclusions_{id}.json")
    }

    pub fn mapping_record(id: &str, schema: &SchemaSpec) -> String {
        format!("mappings/{id}_{}.json", schema.slug)
    }

    pub fn download(basename: &str, schema: &SchemaSpec) -> String {
        format!("download/{basename}_{}.csv", schema.slug)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<String, StoredObject>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.lock().get(key).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, StoredObject>> {
        // A poisoned map is still structurally valid.
        self.objects
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ObjectStore for MemoryStore {
    fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        self.lock()
            .get(key)
            .map(|object| object.bytes.clone())
            .ok_or_else(|| StorageError::NotFound {
                key: key.to_string(),
            })
    }

    fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> StorageResult<()> {
        self.lock().insert(
            key.to_string(),
            StoredObject {
                bytes: bytes.to_vec(),
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.lock().contains_key(key))
    }

    fn list(&self) -> StorageResult<Vec<String>> {
        Ok(self.lock().keys().cloned().collect())
    }
}

/// Directory-backed store; keys map to relative paths under `root`.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> StorageResult<PathBuf> {
        let relative = Path::new(key);
        let escapes = relative.components().any(|c| {
            !matches!(c, std::path::Component::Normal(_))
        });
        if key.is_empty() || escapes {
            return Err(StorageError::Rejected {
                key: key.to_string(),
                reason: "key must be a relative path without '..'".to_string(),
            });
        }
        Ok(self.root.join(relative))
    }
}

impl ObjectStore for FsStore {
    fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        let path = self.path_for(key)?;
        fs::read(&path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => StorageError::NotFound {
                key: key.to_string(),
            },
            _ => StorageError::Io {
                key: key.to_string(),
                source,
            },
        })
    }

    fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> StorageResult<()> {
        let path = self.path_for(key)?;
        let io_err = |source| StorageError::Io {
            key: key.to_string(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(&path, bytes).map_err(io_err)?;
        debug!("Stored {} byte(s) at {:?} ({content_type})", bytes.len(), path);
        Ok(())
    }

    fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.path_for(key)?.is_file())
    }

    fn list(&self) -> StorageResult<Vec<String>> {
        let mut names = Vec::new();
        if self.root.is_dir() {
            collect_files(&self.root, &self.root, &mut names)?;
        }
        names.sort();
        Ok(names)
    }
}

fn collect_files(root: &Path, dir: &Path, names: &mut Vec<String>) -> StorageResult<()> {
    let io_err = |source| StorageError::Io {
        key: dir.display().to_string(),
        source,
    };
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_dir() {
            collect_files(root, &path, names)?;
        } else if let Ok(relative) = path.strip_prefix(root) {
            let key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            names.push(key);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{BIOSAMPLE, SRA};
    use tempfile::tempdir;

    #[test]
    fn keys_are_scoped_by_request_id() {
        assert_eq!(keys::upload("u1", "lab.csv"), "upload/u1_lab.csv");
        assert_eq!(keys::manual_rules("u1"), "rules/u1.json");
        assert_eq!(keys::static_rules("u1"), "rules/static_u1.json");
        assert_eq!(keys::column_definitions("u1"), "rules/columndef_u1.json");
        assert_eq!(keys::exclusions("u1"), "rules/exclusions_u1.json");
        assert_eq!(keys::mapping_record("u1", &SRA), "mappings/u1_sra.json");
        assert_eq!(
            keys::download("u1_lab", &BIOSAMPLE),
            "download/u1_lab_biosample.csv"
        );
    }

    #[test]
    fn memory_store_round_trips_objects() {
        let store = MemoryStore::new();
        assert!(!store.exists("a/b.json").unwrap());
        store.put("a/b.json", b"{}", CONTENT_TYPE_JSON).unwrap();
        assert!(store.exists("a/b.json").unwrap());
        assert_eq!(store.get("a/b.json").unwrap(), b"{}");
        assert_eq!(
            store.object("a/b.json").unwrap().content_type,
            CONTENT_TYPE_JSON
        );
        assert!(matches!(
            store.get("missing"),
            Err(StorageError::NotFound { .. })
        ));
    }

    #[test]
    fn fs_store_lists_nested_keys() {
        let dir = tempdir().expect("temp dir");
        let store = FsStore::new(dir.path());
        store.put("upload/u1_lab.csv", b"a\n1\n", CONTENT_TYPE_CSV).unwrap();
        store.put("rules/u1.json", b"{}", CONTENT_TYPE_JSON).unwrap();
        assert_eq!(
            store.list().unwrap(),
            vec!["rules/u1.json".to_string(), "upload/u1_lab.csv".to_string()]
        );
        assert_eq!(store.get("upload/u1_lab.csv").unwrap(), b"a\n1\n");
        assert!(matches!(
            store.get("upload/other.csv"),
            Err(StorageError::NotFound { .. })
        ));
    }

    #[test]
    fn fs_store_rejects_escaping_keys() {
        let dir = tempdir().expect("temp dir");
        let store = FsStore::new(dir.path());
        assert!(matches!(
            store.put("../outside.csv", b"", CONTENT_TYPE_CSV),
            Err(StorageError::Rejected { .. })
        ));
        assert!(matches!(
            store.get("/etc/passwd"),
            Err(StorageError::Rejected { .. })
        ));
    }
}
