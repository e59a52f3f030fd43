//! Input resolution: conversion arguments → something the engine can open.
//!
//! ## Why write inline uploads to a temp file?
//!
//! The engine takes a URL or a file path, never a byte buffer. An inline
//! base64 `document` is therefore written to a [`NamedTempFile`] whose suffix
//! matches the original filename (`.pdf`, `.docx`, ...) so format detection by
//! extension keeps working. The file is deleted when [`ResolvedInput`] is
//! dropped, on success, error, and panic alike.

use crate::backend::DocumentSource;
use crate::error::ConvertError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempDir};
use tracing::debug;
use url::Url;

/// Recognised keys of a conversion request body.
///
/// Only non-empty strings count; anything else is treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionArgs {
    /// Base64-encoded document bytes.
    pub document: Option<String>,
    /// Original filename of the inline document.
    pub filename: Option<String>,
    /// Remote document URL. Wins over `document` when both are given.
    pub source_url: Option<String>,
}

impl ConversionArgs {
    /// Read the recognised keys from a normalised payload.
    ///
    /// A payload that is not a JSON object yields empty arguments.
    pub fn from_payload(payload: &Value) -> Self {
        let field = |key: &str| {
            payload
                .get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Self {
            document: field("document"),
            filename: field("filename"),
            source_url: field("source_url"),
        }
    }

    /// True when at least one source is present.
    pub fn has_source(&self) -> bool {
        self.source_url.is_some() || self.document.is_some()
    }

    /// The filename, or `default` when none was sent.
    pub fn filename_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.filename.as_deref().unwrap_or(default)
    }

    /// Name used for the exported archive and the markdown inside it.
    ///
    /// The stem of the URL's last path segment, or of the filename; falls
    /// back to `document` when there is no stem.
    pub fn base_name(&self, default_filename: &str) -> String {
        let stem = match self.source_url {
            Some(ref url) => url_stem(url),
            None => Path::new(self.filename_or(default_filename))
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned()),
        };
        stem.filter(|s| !s.is_empty())
            .unwrap_or_else(|| "document".to_string())
    }
}

/// Stem of the last path segment of `url`; query and fragment are ignored.
fn url_stem(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let last = parsed.path_segments()?.next_back()?;
    Path::new(last)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
}

/// Temp file suffix for an uploaded filename: `.pdf` for `report.pdf`,
/// empty when there is no extension.
pub fn source_suffix(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}

/// The resolved input: a URL the engine fetches itself, or a temp file.
#[derive(Debug)]
pub enum ResolvedInput {
    /// Input was a `source_url`.
    Remote(String),
    /// Input was inline base64, written to a temp file.
    /// The `NamedTempFile` is kept alive so the file exists until this value
    /// is dropped.
    Inline { path: PathBuf, _file: NamedTempFile },
}

impl ResolvedInput {
    /// The source to hand to the engine.
    pub fn source(&self) -> DocumentSource<'_> {
        match self {
            ResolvedInput::Remote(url) => DocumentSource::Url(url),
            ResolvedInput::Inline { path, .. } => DocumentSource::Path(path),
        }
    }
}

/// Resolve conversion arguments to a URL or a temp file.
pub fn resolve_input(
    args: &ConversionArgs,
    default_filename: &str,
    scratch: Option<&Path>,
) -> Result<ResolvedInput, ConvertError> {
    if let Some(ref url) = args.source_url {
        return Ok(ResolvedInput::Remote(url.clone()));
    }

    let encoded = args.document.as_deref().ok_or(ConvertError::MissingSource)?;
    let bytes = decode_document(encoded)?;

    let suffix = source_suffix(args.filename_or(default_filename));
    let mut builder = tempfile::Builder::new();
    builder.prefix("docling-src-").suffix(&suffix);
    let mut file = match scratch {
        Some(dir) => builder.tempfile_in(dir),
        None => builder.tempfile(),
    }
    .map_err(|e| ConvertError::io("Failed to create temp file", e))?;

    file.write_all(&bytes)
        .and_then(|()| file.flush())
        .map_err(|e| ConvertError::io("Failed to write temp file", e))?;

    let path = file.path().to_path_buf();
    debug!("Wrote {} bytes to {}", bytes.len(), path.display());

    Ok(ResolvedInput::Inline { path, _file: file })
}

/// Decode an inline document, ignoring line breaks and other whitespace.
fn decode_document(encoded: &str) -> Result<Vec<u8>, ConvertError> {
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    Ok(STANDARD.decode(compact)?)
}

/// Create a temp directory under `dir`, or the system temp dir.
pub(crate) fn scratch_dir(dir: Option<&Path>, prefix: &str) -> Result<TempDir, ConvertError> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(prefix);
    match dir {
        Some(dir) => builder.tempdir_in(dir),
        None => builder.tempdir(),
    }
    .map_err(|e| ConvertError::io("Failed to create temp directory", e))
}
