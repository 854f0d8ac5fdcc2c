//! Apidock - Main Entry Point
//!
//! Loads a collection document from JSON, exports it to one format and
//! writes the result next to the other exports in the output directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use apidock_domain::{Document, ExportOptions, OutputEncoding};
use apidock_infrastructure::{build_in_memory_manager, from_json, init_tracing, load_config};
use clap::Parser;
use tokio_util::sync::CancellationToken;

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "apidock", version, about)]
struct Args {
    /// Collection document to export, as JSON.
    #[arg(short, long)]
    document: PathBuf,

    /// Target format: postman, openapi, insomnia, swagger or apidog.
    #[arg(short, long)]
    format: String,

    /// Output encoding, json or yaml. Only `OpenAPI` honours yaml.
    #[arg(short, long, default_value = "json")]
    encoding: String,

    /// Environment whose variables are substituted.
    #[arg(long)]
    environment: Option<String>,

    /// Directory the export is written to.
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Pipeline configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let written = run(&args, &shutdown_token()).await?;
    tracing::info!(path = %written.display(), "export written");
    println!("{}", written.display());
    Ok(())
}

/// A token cancelled on Ctrl-C.
fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    let cancel = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });
    token
}

async fn run(args: &Args, cancel: &CancellationToken) -> Result<PathBuf> {
    let config = load_config(args.config.as_deref()).context("failed to load configuration")?;
    let document = read_document(&args.document).await?;

    let encoding: OutputEncoding = args.encoding.parse()?;
    let format = args.format.parse()?;
    let mut options = ExportOptions::new(format).with_encoding(encoding);
    options.environment_id.clone_from(&args.environment);

    let manager = build_in_memory_manager(&config);
    let result = manager
        .export(Arc::new(document), &args.format, Some(options), cancel)
        .await?;

    tokio::fs::create_dir_all(&args.output)
        .await
        .with_context(|| format!("failed to create {}", args.output.display()))?;
    let path = args.output.join(&result.filename);
    tokio::fs::write(&path, result.content.as_bytes())
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

async fn read_document(path: &Path) -> Result<Document> {
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let document =
        from_json(&json).with_context(|| format!("{} is not a valid document", path.display()))?;
    Ok(document)
}
