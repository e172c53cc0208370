use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};

use crate::schema::{self, SchemaSpec};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Map lab CSV/Excel exports onto NCBI SRA and BioSample submission tables",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the target schemas and their required columns
    Schemas,
    /// Stage a file (and optional rule documents) under a new request id
    Upload(UploadArgs),
    /// Process an uploaded file into SRA and BioSample tables
    Process(ProcessArgs),
    /// Render the mapper prompt for a file without calling the mapper
    Prompt(PromptArgs),
    /// Show the mapping record and normalized table for a processed request
    Download(DownloadArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
#[value(rename_all = "kebab-case")]
pub enum TargetFormat {
    Sra,
    Biosample,
}

impl TargetFormat {
    pub fn spec(self) -> &'static SchemaSpec {
        match self {
            TargetFormat::Sra => &schema::SRA,
            TargetFormat::Biosample => &schema::BIOSAMPLE,
        }
    }
}

#[derive(Debug, Args)]
pub struct UploadArgs {
    /// Directory backing the object store
    #[arg(short = 's', long = "store")]
    pub store: PathBuf,
    /// CSV or Excel file to stage
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Manual mapping document (`<schema>_manual_mappings` sections)
    #[arg(long = "rules")]
    pub rules: Option<PathBuf>,
    /// Static fill document (`<schema>_static` sections)
    #[arg(long = "static-rules")]
    pub static_rules: Option<PathBuf>,
    /// Column definitions document (`column_definitions` section)
    #[arg(long = "column-definitions")]
    pub column_definitions: Option<PathBuf>,
    /// Forbidden mapping document (`<schema>_exclusions` sections)
    #[arg(long = "exclusions")]
    pub exclusions: Option<PathBuf>,
}

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("source").required(true).args(["key", "event"])))]
pub struct ProcessArgs {
    /// Directory backing the object store
    #[arg(short = 's', long = "store")]
    pub store: PathBuf,
    /// Object key of the upload, e.g. `upload/<id>_<file>.csv`
    #[arg(short = 'k', long = "key")]
    pub key: Option<String>,
    /// Object-created notification JSON to process instead of --key
    #[arg(long = "event")]
    pub event: Option<PathBuf>,
    /// Store name reported with --key (checked against `store_marker`)
    #[arg(long = "store-name", default_value = "local")]
    pub store_name: String,
    /// YAML settings file
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    /// Use the contents of this file as the mapper reply for every schema
    #[arg(long = "response-file")]
    pub response_file: Option<PathBuf>,
    /// Character encoding of delimited input (overrides the settings file)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct PromptArgs {
    /// CSV or Excel file to sample
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Target schema
    #[arg(long = "schema", value_enum)]
    pub schema: TargetFormat,
    /// Directory backing the object store (to read rule documents)
    #[arg(short = 's', long = "store", requires = "id")]
    pub store: Option<PathBuf>,
    /// Request id whose rule documents should shape the prompt
    #[arg(long = "id", requires = "store")]
    pub id: Option<String>,
    /// Character encoding of delimited input
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct DownloadArgs {
    /// Directory backing the object store
    #[arg(short = 's', long = "store")]
    pub store: PathBuf,
    /// Request id returned by `upload`
    #[arg(long = "id")]
    pub id: String,
    /// Original file name of the upload
    #[arg(long = "file-name")]
    pub file_name: String,
    /// Target schema
    #[arg(long = "schema", value_enum)]
    pub schema: TargetFormat,
    /// Write the normalized CSV to this path
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Number of rows to preview
    #[arg(long = "rows", default_value_t = 10)]
    pub rows: usize,
}
