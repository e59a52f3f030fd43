//! Lambda bootstrap for docling-converter.
//!
//! A thin shim over the library crate: maps flags / environment variables
//! to `ServiceConfig`, probes the docling executable once per cold start,
//! and hands every invocation to `Handler`.
//!
//! `--invoke event.json` runs a single event locally and prints the response
//! instead of connecting to the Lambda runtime API.

use anyhow::{Context, Result};
use clap::Parser;
use docling_converter::{Converter, DoclingCli, Handler, RouteSet, ServiceConfig};
use lambda_runtime::{service_fn, LambdaEvent};
use serde_json::Value;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "bootstrap",
    version,
    about = "Serverless Docling document-to-Markdown converter"
)]
struct Cli {
    /// docling executable name or path.
    #[arg(long, env = "DOCLING_BIN", default_value = "docling")]
    docling_bin: PathBuf,

    /// Pre-downloaded docling model artifacts.
    #[arg(long, env = "DOCLING_ARTIFACTS_PATH")]
    artifacts_path: Option<PathBuf>,

    /// Writable model cache directory (only /tmp is writable on Lambda).
    #[arg(long, env = "DOCLING_CACHE_DIR", default_value = "/tmp/docling-cache")]
    cache_dir: PathBuf,

    /// Directory for temp uploads and export directories.
    #[arg(long, env = "DOCLING_SCRATCH_DIR")]
    scratch_dir: Option<PathBuf>,

    /// Route table: `full` (with /full zip export) or `basic`.
    #[arg(long, env = "DOCLING_ROUTES", default_value = "full")]
    routes: RouteSet,

    /// Filename assumed for inline documents sent without one.
    #[arg(long, env = "DOCLING_DEFAULT_FILENAME", default_value = "document.pdf")]
    default_filename: String,

    /// Handle one event read from this JSON file and print the response.
    #[arg(long)]
    invoke: Option<PathBuf>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOCLING_VERBOSE")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();

    // ── Build handler ────────────────────────────────────────────────────
    let config = build_config(&cli)?;
    let backend = DoclingCli::from_config(&config);

    // Probe once per cold start; a missing engine still serves health checks.
    let converter = match tokio::task::block_in_place(|| backend.probe()) {
        Ok(version) => {
            info!("docling available: {}", version);
            Converter::new(Arc::new(backend), config)
        }
        Err(e) => {
            warn!("docling unavailable, conversions will fail: {}", e);
            Converter::unavailable(config)
        }
    };
    let handler = Arc::new(Handler::new(converter));

    // ── Local one-shot mode ──────────────────────────────────────────────
    if let Some(ref path) = cli.invoke {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read event from {:?}", path))?;
        let event: Value = serde_json::from_str(&text).context("Event file is not valid JSON")?;
        let response = handler.handle(event).await;
        println!(
            "{}",
            serde_json::to_string_pretty(&response).context("Failed to serialise response")?
        );
        return Ok(());
    }

    // ── Lambda runtime loop ──────────────────────────────────────────────
    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| {
        let handler = Arc::clone(&handler);
        async move { Ok::<_, lambda_runtime::Error>(handler.handle(event.payload).await) }
    }))
    .await
    .map_err(|e| anyhow::anyhow!(e))
    .context("Lambda runtime exited")
}

/// Map CLI args to `ServiceConfig`.
fn build_config(cli: &Cli) -> Result<ServiceConfig> {
    let mut builder = ServiceConfig::builder()
        .docling_program(&cli.docling_bin)
        .cache_dir(&cli.cache_dir)
        .routes(cli.routes)
        .default_filename(&cli.default_filename);

    if let Some(ref dir) = cli.artifacts_path {
        builder = builder.artifacts_path(dir);
    }
    if let Some(ref dir) = cli.scratch_dir {
        builder = builder.scratch_dir(dir);
    }

    builder.build().context("Invalid configuration")
}
