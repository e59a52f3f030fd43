//! The conversion engine seam.
//!
//! Parsing, layout analysis and markdown export are done by Docling, which
//! this crate treats as a black box. The handlers only ever talk to it
//! through two traits:
//!
//! * [`DocumentBackend`] — turn a source (URL or local file) into a
//!   converted document, given [`PipelineOptions`].
//! * [`ConvertedDocument`] — the result: markdown export, page count, and
//!   "save as markdown with referenced images" into a directory.
//!
//! [`crate::convert::Converter`] receives an `Arc<dyn DocumentBackend>` at
//! construction, so tests inject a fake and production injects
//! [`DoclingCli`]. Both traits are synchronous: conversion is blocking work
//! and the caller moves it onto `spawn_blocking`.

mod docling;

pub use docling::DoclingCli;

use crate::error::ConvertError;
use std::fmt;
use std::path::Path;

/// Where the engine should read the document from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentSource<'a> {
    /// Remote document; fetching it is the engine's job.
    Url(&'a str),
    /// Local file, usually the temp file holding an inline upload.
    Path(&'a Path),
}

impl fmt::Display for DocumentSource<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentSource::Url(url) => f.write_str(url),
            DocumentSource::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Pipeline toggles forwarded to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineOptions {
    /// Run OCR on scanned pages.
    pub do_ocr: bool,
    /// Render embedded pictures to image files so they can be exported.
    pub generate_picture_images: bool,
}

impl PipelineOptions {
    /// Fast path: text only, no OCR, no picture rendering.
    pub fn markdown_only() -> Self {
        Self {
            do_ocr: false,
            generate_picture_images: false,
        }
    }

    /// Export path: no OCR, but pictures rendered for the zip archive.
    pub fn with_pictures() -> Self {
        Self {
            do_ocr: false,
            generate_picture_images: true,
        }
    }
}

/// How images appear in saved markdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageRefMode {
    /// Images become an `<!-- image -->` comment.
    Placeholder,
    /// Images are written as files next to the markdown and linked by path.
    Referenced,
}

/// A document the engine has converted.
pub trait ConvertedDocument: Send {
    /// The whole document as markdown.
    fn export_to_markdown(&self) -> Result<String, ConvertError>;

    /// Number of pages, when the engine knows it.
    fn page_count(&self) -> Option<usize>;

    /// Write the markdown to `path`. In [`ImageRefMode::Referenced`] mode the
    /// images are written alongside it (possibly in a subdirectory) and the
    /// markdown links to them by their full path.
    fn save_as_markdown(&self, path: &Path, image_mode: ImageRefMode) -> Result<(), ConvertError>;
}

/// A document conversion engine.
pub trait DocumentBackend: Send + Sync {
    /// Convert `source` with the given pipeline options.
    ///
    /// The returned document must not borrow `source`: an inline upload's
    /// temp file is deleted as soon as this call returns.
    fn convert(
        &self,
        source: DocumentSource<'_>,
        options: &PipelineOptions,
    ) -> Result<Box<dyn ConvertedDocument>, ConvertError>;
}
