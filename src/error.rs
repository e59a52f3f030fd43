//! Error types for the docling-converter handlers.
//!
//! Every failure a request can hit is a variant of [`ConvertError`]. Two
//! groups exist:
//!
//! * **Request errors**: [`ConvertError::LibraryUnavailable`],
//!   [`ConvertError::MissingSource`] and [`ConvertError::UnknownEndpoint`].
//!   These are detected explicitly and carry their own status code.
//!
//! * **Conversion failures**: everything else (bad base64, file I/O, the
//!   Docling engine failing, zip errors). They all surface as HTTP 500 with
//!   the underlying message and a kind name in `error_type`.
//!
//! The [`crate::handler::Handler`] is the only place errors are turned into
//! responses.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the conversion pipeline.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Request errors ────────────────────────────────────────────────────
    /// No conversion engine was injected at startup.
    #[error("Docling library not available")]
    LibraryUnavailable,

    /// The payload carried neither `source_url` nor `document`.
    #[error("Either 'source_url' or 'document' (base64) must be provided")]
    MissingSource,

    /// No route matched the request line.
    #[error("Unknown endpoint: {method} {path}")]
    UnknownEndpoint { method: String, path: String },

    // ── Input errors ──────────────────────────────────────────────────────
    /// The gateway flagged the body as base64 but it could not be decoded.
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    /// The inline `document` field is not valid base64.
    #[error("Invalid base64 document: {0}")]
    InvalidDocument(#[from] base64::DecodeError),

    // ── Conversion errors ─────────────────────────────────────────────────
    /// Temp file or directory I/O failed.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// The Docling engine failed to convert or export the document.
    #[error("Conversion failed: {message}")]
    Backend { message: String },

    /// The engine reported success but an expected output file is missing.
    #[error("Expected output not found: '{path}'")]
    MissingOutput { path: PathBuf },

    /// Building the zip archive failed.
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (serialisation, panicked blocking task).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConvertError {
    /// Wrap an I/O error with a short description of what was being done.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// HTTP status code the gateway should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingSource => 400,
            Self::UnknownEndpoint { .. } => 404,
            _ => 500,
        }
    }

    /// Stable kind name reported as `error_type` in error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::LibraryUnavailable => "LibraryUnavailable",
            Self::MissingSource => "MissingSource",
            Self::UnknownEndpoint { .. } => "UnknownEndpoint",
            Self::InvalidBody(_) => "InvalidBody",
            Self::InvalidDocument(_) => "InvalidDocument",
            Self::Io { .. } => "IoError",
            Self::Backend { .. } => "BackendError",
            Self::MissingOutput { .. } => "MissingOutput",
            Self::Archive(_) => "ArchiveError",
            Self::InvalidConfig(_) => "InvalidConfig",
            Self::Internal(_) => "InternalError",
        }
    }

    /// True for failures raised while decoding, converting, or packaging.
    pub fn is_conversion_failure(&self) -> bool {
        !matches!(
            self,
            Self::LibraryUnavailable | Self::MissingSource | Self::UnknownEndpoint { .. }
        )
    }
}

impl From<serde_json::Error> for ConvertError {
    fn from(e: serde_json::Error) -> Self {
        Self::Internal(format!("JSON serialisation failed: {e}"))
    }
}

impl From<tokio::task::JoinError> for ConvertError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Internal(format!("Conversion task panicked: {e}"))
    }
}
