//! The conversion invoker.
//!
//! [`Converter`] exposes the two operations the routes need:
//!
//! * [`Converter::convert_document`] — fast path, markdown only
//! * [`Converter::export_document`] — full path, zip with images
//!
//! Both validate, resolve the source, call the injected
//! [`DocumentBackend`], and release the inline temp file before doing
//! anything else. They are blocking; the async handler runs them via
//! [`tokio::task::spawn_blocking`].

use crate::backend::{ConvertedDocument, DocumentBackend, PipelineOptions};
use crate::config::ServiceConfig;
use crate::error::ConvertError;
use crate::output::{ConversionOutput, DocumentMetadata, ExportOutput};
use crate::pipeline::input::{resolve_input, ConversionArgs};
use crate::pipeline::package;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Runs conversions against an injected engine.
///
/// Cheap to clone: the backend is shared behind an `Arc`.
#[derive(Clone)]
pub struct Converter {
    backend: Option<Arc<dyn DocumentBackend>>,
    config: Arc<ServiceConfig>,
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter")
            .field("backend", &self.backend.as_ref().map(|_| "<dyn DocumentBackend>"))
            .field("config", &self.config)
            .finish()
    }
}

impl Converter {
    /// Converter backed by `backend`.
    pub fn new(backend: Arc<dyn DocumentBackend>, config: ServiceConfig) -> Self {
        Self {
            backend: Some(backend),
            config: Arc::new(config),
        }
    }

    /// Converter with no engine; every conversion fails with
    /// [`ConvertError::LibraryUnavailable`].
    pub fn unavailable(config: ServiceConfig) -> Self {
        Self {
            backend: None,
            config: Arc::new(config),
        }
    }

    /// The service configuration this converter was built with.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Convert a document to markdown without extracting images.
    pub fn convert_document(&self, args: &ConversionArgs) -> Result<ConversionOutput, ConvertError> {
        let doc = self.run(args, &PipelineOptions::markdown_only())?;
        let markdown = doc.export_to_markdown()?;

        let metadata = DocumentMetadata {
            num_pages: doc.page_count(),
            source: self.source_label(args),
        };
        info!(
            "Converted {} → {} bytes of markdown",
            metadata.source,
            markdown.len()
        );

        Ok(ConversionOutput {
            success: true,
            markdown,
            metadata,
        })
    }

    /// Convert a document and package markdown plus images as a zip.
    pub fn export_document(&self, args: &ConversionArgs) -> Result<ExportOutput, ConvertError> {
        let doc = self.run(args, &PipelineOptions::with_pictures())?;
        let base_name = args.base_name(&self.config.default_filename);

        let archive =
            package::package_document(doc.as_ref(), &base_name, self.config.scratch_dir.as_deref())?;

        Ok(ExportOutput {
            archive: archive.bytes,
            filename: format!("{base_name}.zip"),
            image_count: archive.image_count,
        })
    }

    /// Validate, resolve the source, and convert.
    ///
    /// The inline temp file (if any) is dropped before this returns,
    /// whether or not the engine succeeded.
    fn run(
        &self,
        args: &ConversionArgs,
        options: &PipelineOptions,
    ) -> Result<Box<dyn ConvertedDocument>, ConvertError> {
        let backend = self.backend.as_deref().ok_or(ConvertError::LibraryUnavailable)?;
        if !args.has_source() {
            return Err(ConvertError::MissingSource);
        }

        let resolved = resolve_input(
            args,
            &self.config.default_filename,
            self.config.scratch_dir.as_deref(),
        )?;
        let result = backend.convert(resolved.source(), options);
        drop(resolved);
        result
    }

    fn source_label(&self, args: &ConversionArgs) -> String {
        match args.source_url {
            Some(ref url) => url.clone(),
            None => args.filename_or(&self.config.default_filename).to_string(),
        }
    }
}
