//! Result types returned by [`crate::convert::Converter`].

use serde::{Deserialize, Serialize};

/// Body of a successful `POST /` conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// Always `true`; failures are reported through [`crate::ConvertError`].
    pub success: bool,
    /// Full document as markdown.
    pub markdown: String,
    pub metadata: DocumentMetadata,
}

/// Minimal metadata reported alongside the markdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Page count, `null` when the engine does not report one.
    pub num_pages: Option<usize>,
    /// The URL or the filename the document came from.
    pub source: String,
}

/// A packaged `POST /full` export.
#[derive(Debug, Clone)]
pub struct ExportOutput {
    /// Zip archive bytes.
    pub archive: Vec<u8>,
    /// Suggested download name, `<base_name>.zip`.
    pub filename: String,
    /// Number of images included next to the markdown.
    pub image_count: usize,
}
