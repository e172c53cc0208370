//! Error kinds raised by the mapping pipeline.
//!
//! Only [`MapError::UnsupportedFormat`], [`MapError::TableLoad`] and the
//! trigger validation errors stop a request. Every other kind is produced at a
//! component boundary and then downgraded (logged, replaced by an empty mapping
//! or an error payload) by the caller.

use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MapError>;

#[derive(Debug, Error)]
pub enum MapError {
    #[error("unsupported file type '{extension}' for '{filename}'")]
    UnsupportedFormat { filename: String, extension: String },

    #[error("failed to read {format} table: {message}")]
    TableLoad {
        format: &'static str,
        message: String,
    },

    #[error("rule document '{key}' unavailable: {reason}")]
    RuleNotFound { key: String, reason: String },

    #[error("can't invoke '{model}': {reason}")]
    MapperInvocation { model: String, reason: String },

    #[error("mapper response does not contain a JSON object")]
    ResponseParse,

    #[error("object key '{0}' is not an upload key")]
    InvalidUploadKey(String),

    #[error("notification carries no object records")]
    EmptyNotification,

    #[error("rule document '{name}' is not a JSON object: {reason}")]
    InvalidRuleDocument { name: String, reason: String },

    #[error("store '{store}' does not contain '{marker}'")]
    UnexpectedStore { store: String, marker: String },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object '{key}' not found")]
    NotFound { key: String },

    #[error("storage I/O failed for '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: io::Error,
    },

    #[error("write rejected for '{key}': {reason}")]
    Rejected { key: String, reason: String },
}
