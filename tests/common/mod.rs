#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ncbi_mapper::mapper::Mapper;
use ncbi_mapper::storage::{CONTENT_TYPE_CSV, CONTENT_TYPE_JSON, MemoryStore, ObjectStore};
use tempfile::{TempDir, tempdir};

pub const REQUEST_ID: &str = "7c9e6679-7425-40de-944b-e07fc1f90ae7";

pub const LAB_CSV: &str = "\
PatientID,CollectDate,Organism,Site
P1,2024-01-01,Acinetobacter baumannii,Urine
P2,2024-01-02,Escherichia coli,Blood
";

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }
}

/// Mapper that records every prompt and replies per target schema.
pub struct ScriptedMapper {
    sra_reply: String,
    biosample_reply: String,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedMapper {
    pub fn new(sra_reply: &str, biosample_reply: &str) -> Self {
        Self {
            sra_reply: sra_reply.to_string(),
            biosample_reply: biosample_reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompt log").clone()
    }
}

impl Mapper for ScriptedMapper {
    fn invoke(&self, prompt: &str) -> String {
        self.prompts
            .lock()
            .expect("prompt log")
            .push(prompt.to_string());
        if prompt.contains("NCBI SRA") {
            self.sra_reply.clone()
        } else {
            self.biosample_reply.clone()
        }
    }
}

pub fn upload_key(filename: &str) -> String {
    format!("upload/{REQUEST_ID}_{filename}")
}

pub fn store_with_upload(filename: &str, contents: &[u8]) -> MemoryStore {
    let store = MemoryStore::new();
    store
        .put(&upload_key(filename), contents, CONTENT_TYPE_CSV)
        .expect("stage upload");
    store
}

pub fn put_rule(store: &MemoryStore, key: &str, body: &str) {
    store
        .put(key, body.as_bytes(), CONTENT_TYPE_JSON)
        .expect("stage rule document");
}

pub fn read_text(store: &MemoryStore, key: &str) -> String {
    String::from_utf8(store.get(key).expect("object present")).expect("utf-8 object")
}

/// Parses stored CSV into (headers, rows).
pub fn read_csv(store: &MemoryStore, key: &str) -> (Vec<String>, Vec<Vec<String>>) {
    let bytes = store.get(key).expect("csv present");
    let mut reader = csv::Reader::from_reader(bytes.as_slice());
    let headers = reader
        .headers()
        .expect("headers")
        .iter()
        .map(String::from)
        .collect();
    let rows = reader
        .records()
        .map(|r| r.expect("record").iter().map(String::from).collect())
        .collect();
    (headers, rows)
}

pub fn column<'a>(headers: &[String], rows: &'a [Vec<String>], name: &str) -> Vec<&'a str> {
    let idx = headers
        .iter()
        .position(|h| h == name)
        .unwrap_or_else(|| panic!("column {name} missing from {headers:?}"));
    rows.iter().map(|r| r[idx].as_str()).collect()
}
