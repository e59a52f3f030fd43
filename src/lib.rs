//! # docling-converter
//!
//! Serverless handlers that convert documents to Markdown with
//! [Docling](https://github.com/docling-project/docling).
//!
//! A request brings a document by URL or as base64; the response is either
//! JSON with the markdown, or a zip archive holding the markdown plus the
//! document's pictures as image files.
//!
//! ## Request Flow
//!
//! ```text
//! gateway event
//!  │
//!  ├─ 1. Route     OPTIONS / health check / (path, method) dispatch
//!  ├─ 2. Event     unwrap proxy envelope (base64, JSON body) or direct payload
//!  ├─ 3. Input     URL as-is, or inline base64 → scoped temp file
//!  ├─ 4. Convert   injected DocumentBackend (docling CLI in production)
//!  ├─ 5. Package   /full only: markdown + images → flat zip
//!  └─ 6. Respond   JSON or base64 zip envelope with CORS headers
//! ```
//!
//! ## Routes
//!
//! | Method | Path | Behaviour |
//! |--------|------|-----------|
//! | `OPTIONS` | any | CORS preflight |
//! | `GET` | `/` | health check |
//! | `POST` | `/` or empty | `{success, markdown, metadata}` |
//! | `POST` | `/full` | zip download |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docling_converter::{Converter, DoclingCli, Handler, ServiceConfig};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), docling_converter::ConvertError> {
//! let config = ServiceConfig::builder().cache_dir("/tmp/docling-cache").build()?;
//! let backend = Arc::new(DoclingCli::from_config(&config));
//! let handler = Handler::new(Converter::new(backend, config));
//!
//! let event = serde_json::json!({"source_url": "https://arxiv.org/pdf/2408.09869"});
//! let response = handler.handle(event).await;
//! println!("{}", response.status_code);
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `lambda` | on | Enables the `bootstrap` binary (lambda_runtime + clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod backend;
pub mod config;
pub mod convert;
pub mod error;
pub mod handler;
pub mod output;
pub mod pipeline;
pub mod response;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use backend::{
    ConvertedDocument, DoclingCli, DocumentBackend, DocumentSource, ImageRefMode, PipelineOptions,
};
pub use config::{RouteSet, ServiceConfig, ServiceConfigBuilder};
pub use convert::Converter;
pub use error::ConvertError;
pub use handler::Handler;
pub use output::{ConversionOutput, DocumentMetadata, ExportOutput};
pub use pipeline::input::ConversionArgs;
pub use response::ResponseEnvelope;
