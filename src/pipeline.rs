//! Upload-triggered processing: one notification, one source table, two
//! target schemas.
//!
//! Loading the table is the last step that can fail the request. After that,
//! every degradation (missing rules, mapper errors, unparseable responses,
//! failed writes) is logged and the request still reports success.

use encoding_rs::Encoding;
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    data::Table,
    emit::{self, EmitReport, EmitTargets},
    error::{MapError, Result},
    loader::{self, SourceFormat},
    mapper::Mapper,
    prompt::{self, PromptRequest},
    resolve::resolve,
    response,
    rules::{ColumnMapping, RequestRules},
    schema::{self, SchemaSpec},
    storage::{ObjectStore, keys},
};

/// Object-created notification as delivered by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadNotification {
    #[serde(rename = "Records", default)]
    pub records: Vec<NotificationRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub s3: ObjectEvent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectEvent {
    pub bucket: BucketRef,
    pub object: ObjectRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketRef {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    pub key: String,
}

impl UploadNotification {
    pub fn new(store: &str, key: &str) -> Self {
        Self {
            records: vec![NotificationRecord {
                s3: ObjectEvent {
                    bucket: BucketRef {
                        name: store.to_string(),
                    },
                    object: ObjectRef {
                        key: key.to_string(),
                    },
                },
            }],
        }
    }

    /// Store name and key of the first record; later records are ignored.
    pub fn target(&self) -> Result<(&str, &str)> {
        self.records
            .first()
            .map(|r| (r.s3.bucket.name.as_str(), r.s3.object.key.as_str()))
            .ok_or(MapError::EmptyNotification)
    }
}

/// Parsed `upload/<id>_<name>` key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadKey {
    pub id: String,
    /// `<id>_<name>`, the object name without its prefix.
    pub filename: String,
    /// `filename` without its final extension; prefixes the download keys.
    pub basename: String,
}

impl UploadKey {
    pub fn parse(key: &str) -> Result<Self> {
        let invalid = || MapError::InvalidUploadKey(key.to_string());
        let filename = key.split('/').nth(1).filter(|f| !f.is_empty()).ok_or_else(invalid)?;
        let (id, _) = filename.split_once('_').ok_or_else(invalid)?;
        if id.is_empty() {
            return Err(invalid());
        }
        let basename = filename
            .rsplit_once('.')
            .map_or(filename, |(stem, _)| stem);
        Ok(Self {
            id: id.to_string(),
            filename: filename.to_string(),
            basename: basename.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaOutcome {
    pub schema: &'static str,
    pub mapping: ColumnMapping,
    pub columns: Vec<String>,
    pub rows: usize,
    pub mapping_key: String,
    pub table_key: String,
    #[serde(flatten)]
    pub report: EmitReport,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessSummary {
    pub request_id: String,
    pub source_key: String,
    pub source_rows: usize,
    pub source_columns: Vec<String>,
    pub outcomes: Vec<SchemaOutcome>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandlerResponse {
    pub status_code: u16,
    pub body: serde_json::Value,
}

impl HandlerResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

pub struct Pipeline<'a> {
    store: &'a dyn ObjectStore,
    mapper: &'a dyn Mapper,
    encoding: &'static Encoding,
    store_marker: Option<String>,
}

impl<'a> Pipeline<'a> {
    pub fn new(store: &'a dyn ObjectStore, mapper: &'a dyn Mapper) -> Self {
        Self {
            store,
            mapper,
            encoding: encoding_rs::UTF_8,
            store_marker: None,
        }
    }

    pub fn with_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_store_marker(mut self, marker: Option<String>) -> Self {
        self.store_marker = marker.filter(|m| !m.is_empty());
        self
    }

    pub fn handle(&self, notification: &UploadNotification) -> HandlerResponse {
        let outcome = notification
            .target()
            .and_then(|(store, key)| self.process(store, key));
        match outcome {
            Ok(summary) => HandlerResponse {
                status_code: 200,
                body: serde_json::to_value(&summary)
                    .unwrap_or_else(|err| json!({ "error": err.to_string() })),
            },
            Err(err) => {
                let status_code = match err {
                    MapError::UnexpectedStore { .. }
                    | MapError::InvalidUploadKey(_)
                    | MapError::EmptyNotification
                    | MapError::UnsupportedFormat { .. } => 400,
                    _ => 500,
                };
                error!("Rejecting upload: {err}");
                HandlerResponse {
                    status_code,
                    body: json!({ "error": err.to_string() }),
                }
            }
        }
    }

    pub fn process(&self, store_name: &str, key: &str) -> Result<ProcessSummary> {
        if let Some(marker) = &self.store_marker
            && !store_name.contains(marker.as_str())
        {
            return Err(MapError::UnexpectedStore {
                store: store_name.to_string(),
                marker: marker.clone(),
            });
        }
        let upload = UploadKey::parse(key)?;
        SourceFormat::from_filename(&upload.filename)?;
        info!("Processing {key} for request {}", upload.id);

        let bytes = self.store.get(key)?;
        let table = loader::load_table(&bytes, &upload.filename, self.encoding)?;
        info!(
            "Loaded {} row(s) across {} column(s) from {key}",
            table.row_count(),
            table.columns().len()
        );

        let rules = RequestRules::load(self.store, &upload.id);
        let outcomes = schema::ALL
            .into_iter()
            .map(|spec| self.run_schema(spec, &upload, &table, &rules))
            .collect();

        Ok(ProcessSummary {
            request_id: upload.id.clone(),
            source_key: key.to_string(),
            source_rows: table.row_count(),
            source_columns: table.column_names().into_iter().map(String::from).collect(),
            outcomes,
        })
    }

    fn run_schema(
        &self,
        spec: &'static SchemaSpec,
        upload: &UploadKey,
        table: &Table,
        rules: &RequestRules,
    ) -> SchemaOutcome {
        let rules = rules.for_schema(spec);
        let samples = prompt::column_samples(table, rules.manual_mappings.as_ref());
        let prompt = PromptRequest::new(spec, &samples)
            .with_definitions(rules.column_definitions.as_ref())
            .with_exclusions(rules.exclusions.as_ref())
            .render();
        debug!("{spec} prompt:\n{prompt}");

        let reply = self.mapper.invoke(&prompt);
        debug!("{spec} mapper reply:\n{reply}");
        let inferred = response::parse(&reply);

        let resolution = resolve(
            spec,
            table,
            &inferred,
            rules.manual_mappings.as_ref(),
            rules.static_values.as_ref(),
        );
        info!(
            "{spec}: final mapping {}",
            serde_json::to_string(&resolution.mapping).unwrap_or_default()
        );

        let targets = EmitTargets {
            mapping_key: keys::mapping_record(&upload.id, spec),
            table_key: keys::download(&upload.basename, spec),
        };
        let report = emit::emit(self.store, &targets, &resolution.mapping, &resolution.table);
        SchemaOutcome {
            schema: spec.slug,
            columns: resolution
                .table
                .column_names()
                .into_iter()
                .map(String::from)
                .collect(),
            rows: resolution.table.row_count(),
            mapping: resolution.mapping,
            mapping_key: targets.mapping_key,
            table_key: targets.table_key,
            report,
        }
    }
}
