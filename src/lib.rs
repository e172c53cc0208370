pub mod cli;
pub mod config;
pub mod data;
pub mod emit;
pub mod error;
pub mod io_utils;
pub mod loader;
pub mod mapper;
pub mod pipeline;
pub mod prompt;
pub mod resolve;
pub mod response;
pub mod rules;
pub mod schema;
pub mod storage;
pub mod table;
pub mod transfer;

use std::{env, fs, path::Path, sync::OnceLock};

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{LevelFilter, info};
use serde_json::json;

use crate::{
    cli::{Cli, Commands},
    config::Settings,
    mapper::{CannedMapper, HttpMapper, Mapper},
    pipeline::{Pipeline, UploadNotification},
    rules::RequestRules,
    storage::FsStore,
    transfer::RuleDocuments,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("ncbi_mapper", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Schemas => handle_schemas(),
        Commands::Upload(args) => handle_upload(&args),
        Commands::Process(args) => handle_process(&args),
        Commands::Prompt(args) => handle_prompt(&args),
        Commands::Download(args) => handle_download(&args),
    }
}

fn handle_schemas() -> Result<()> {
    let headers = vec!["schema".to_string(), "#".to_string(), "column".to_string()];
    let mut rows = Vec::new();
    for spec in schema::ALL {
        for (idx, column) in spec.required.iter().enumerate() {
            rows.push(vec![
                spec.slug.to_string(),
                (idx + 1).to_string(),
                column.to_string(),
            ]);
        }
    }
    print!("{}", table::render_grid(&headers, &rows));
    Ok(())
}

fn read_optional(path: Option<&Path>) -> Result<Option<Vec<u8>>> {
    path.map(|p| fs::read(p).with_context(|| format!("Reading {p:?}")))
        .transpose()
}

fn handle_upload(args: &cli::UploadArgs) -> Result<()> {
    let content =
        fs::read(&args.input).with_context(|| format!("Reading input file {:?}", args.input))?;
    let filename = args
        .input
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Input path {:?} has no file name", args.input))?;
    let documents = RuleDocuments {
        manual: read_optional(args.rules.as_deref())?,
        statics: read_optional(args.static_rules.as_deref())?,
        definitions: read_optional(args.column_definitions.as_deref())?,
        exclusions: read_optional(args.exclusions.as_deref())?,
    };
    let store = FsStore::new(&args.store);
    let staged = transfer::stage_upload(&store, filename, &content, &documents)
        .with_context(|| format!("Staging {:?}", args.input))?;
    let receipt = json!({
        "uuid": staged.id,
        "file_name": filename,
        "key": staged.key,
    });
    println!("{}", serde_json::to_string_pretty(&receipt)?);
    Ok(())
}

fn handle_process(args: &cli::ProcessArgs) -> Result<()> {
    let mut settings = Settings::resolve(args.config.as_deref())?;
    if let Some(label) = &args.input_encoding {
        settings.input_encoding = label.clone();
    }
    let encoding = io_utils::resolve_encoding(Some(settings.input_encoding.as_str()))?;

    let mapper: Box<dyn Mapper> = match &args.response_file {
        Some(path) => {
            let reply = fs::read_to_string(path)
                .with_context(|| format!("Reading mapper reply from {path:?}"))?;
            info!("Using canned mapper reply from {:?}", path);
            Box::new(CannedMapper::new(reply))
        }
        None => Box::new(HttpMapper::new(settings.mapper.clone())?),
    };

    let notification = match (&args.event, &args.key) {
        (Some(path), _) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("Reading notification {path:?}"))?;
            serde_json::from_str::<UploadNotification>(&raw)
                .with_context(|| format!("Parsing notification {path:?}"))?
        }
        (None, Some(key)) => UploadNotification::new(&args.store_name, key),
        (None, None) => bail!("Either --key or --event must be provided"),
    };

    let store = FsStore::new(&args.store);
    let pipeline = Pipeline::new(&store, mapper.as_ref())
        .with_encoding(encoding)
        .with_store_marker(settings.store_marker.clone());
    let response = pipeline.handle(&notification);
    println!("{}", serde_json::to_string_pretty(&response)?);
    if !response.is_success() {
        bail!(
            "Processing failed with status {}: {}",
            response.status_code,
            response.body["error"].as_str().unwrap_or("unknown error")
        );
    }
    Ok(())
}

fn handle_prompt(args: &cli::PromptArgs) -> Result<()> {
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let bytes =
        fs::read(&args.input).with_context(|| format!("Reading input file {:?}", args.input))?;
    let filename = args.input.to_string_lossy();
    let table = loader::load_table(&bytes, &filename, encoding)
        .with_context(|| format!("Loading table from {:?}", args.input))?;

    let spec = args.schema.spec();
    let rules = match (&args.store, &args.id) {
        (Some(store), Some(id)) => RequestRules::load(&FsStore::new(store), id).for_schema(spec),
        _ => Default::default(),
    };
    let samples = prompt::column_samples(&table, rules.manual_mappings.as_ref());
    let rendered = prompt::PromptRequest::new(spec, &samples)
        .with_definitions(rules.column_definitions.as_ref())
        .with_exclusions(rules.exclusions.as_ref())
        .render();
    println!("{rendered}");
    Ok(())
}

fn handle_download(args: &cli::DownloadArgs) -> Result<()> {
    let spec = args.schema.spec();
    let store = FsStore::new(&args.store);
    let fetched = transfer::fetch_result(&store, &args.id, &args.file_name, spec)
        .with_context(|| format!("Fetching {spec} result for {}", args.id))?;
    println!("{}", serde_json::to_string_pretty(&fetched.mapping)?);

    let Some(bytes) = fetched.table else {
        bail!("No normalized table at {}", fetched.download_key);
    };
    let table = loader::load_table(&bytes, &fetched.download_key, encoding_rs::UTF_8)
        .with_context(|| format!("Reading {}", fetched.download_key))?;
    print!("{}", table::render_table(&table, Some(args.rows)));
    if let Some(output) = &args.output {
        fs::write(output, &bytes).with_context(|| format!("Writing {output:?}"))?;
        info!("Wrote {} to {:?}", fetched.download_key, output);
    }
    Ok(())
}
