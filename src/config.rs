//! Service configuration.
//!
//! Everything the handler needs to know at startup lives in
//! [`ServiceConfig`], built via [`ServiceConfigBuilder`]. The bootstrap
//! binary maps CLI flags and environment variables onto the builder; tests
//! use the defaults and override a field or two.
//!
//! The Docling model cache location is part of this config rather than a
//! process-wide environment variable: it is handed to
//! [`crate::backend::DoclingCli`], which scopes it to the child process.

use crate::error::ConvertError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Configuration for the conversion service.
///
/// # Example
/// ```rust
/// use docling_converter::{RouteSet, ServiceConfig};
///
/// let config = ServiceConfig::builder()
///     .routes(RouteSet::Basic)
///     .cache_dir("/tmp/docling-cache")
///     .build()
///     .unwrap();
/// assert_eq!(config.default_filename, "document.pdf");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Name reported by the health check. Default: `docling-converter`.
    pub service_name: String,

    /// Filename assumed when an inline document arrives without one.
    /// Default: `document.pdf`.
    ///
    /// Its extension becomes the temp file suffix, which is how the engine
    /// sniffs the input format.
    pub default_filename: String,

    /// Which route table the handler serves. Default: [`RouteSet::Full`].
    pub routes: RouteSet,

    /// Directory for temp source files and export directories.
    /// `None` uses the system temp dir (`/tmp` on Lambda).
    pub scratch_dir: Option<PathBuf>,

    /// Docling executable name or path. Default: `docling`.
    pub docling_program: PathBuf,

    /// Pre-downloaded model artifacts, passed as `--artifacts-path`.
    pub artifacts_path: Option<PathBuf>,

    /// Writable cache directory for model downloads.
    pub cache_dir: Option<PathBuf>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            service_name: "docling-converter".to_string(),
            default_filename: "document.pdf".to_string(),
            routes: RouteSet::default(),
            scratch_dir: None,
            docling_program: PathBuf::from("docling"),
            artifacts_path: None,
            cache_dir: None,
        }
    }
}

impl ServiceConfig {
    /// Create a new builder for `ServiceConfig`.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ServiceConfig`].
#[derive(Debug)]
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.config.service_name = name.into();
        self
    }

    pub fn default_filename(mut self, name: impl Into<String>) -> Self {
        self.config.default_filename = name.into();
        self
    }

    pub fn routes(mut self, routes: RouteSet) -> Self {
        self.config.routes = routes;
        self
    }

    pub fn scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.scratch_dir = Some(dir.into());
        self
    }

    pub fn docling_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.config.docling_program = program.into();
        self
    }

    pub fn artifacts_path(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.artifacts_path = Some(dir.into());
        self
    }

    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.cache_dir = Some(dir.into());
        self
    }

    /// Build the configuration, validating constraints.
    ///
    /// A relative scratch dir is made absolute against the current
    /// directory; exported image links are only rewritten for absolute paths.
    pub fn build(mut self) -> Result<ServiceConfig, ConvertError> {
        let scratch = self.config.scratch_dir.take();
        if let Some(dir) = scratch.filter(|d| !d.as_os_str().is_empty()) {
            let dir = std::path::absolute(&dir)
                .map_err(|e| ConvertError::io("Failed to resolve scratch dir", e))?;
            self.config.scratch_dir = Some(dir);
        }

        let c = &self.config;
        if c.default_filename.trim().is_empty() {
            return Err(ConvertError::InvalidConfig(
                "default filename must not be empty".into(),
            ));
        }
        if c.service_name.trim().is_empty() {
            return Err(ConvertError::InvalidConfig(
                "service name must not be empty".into(),
            ));
        }
        if c.docling_program.as_os_str().is_empty() {
            return Err(ConvertError::InvalidConfig(
                "docling program must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Route table served by [`crate::handler::Handler`].
///
/// | Set | `POST /` | `POST /full` | other requests |
/// |-----|----------|--------------|----------------|
/// | `Full` | JSON markdown | zip export | 404 |
/// | `Basic` | JSON markdown | JSON markdown | JSON markdown |
///
/// `OPTIONS` and `GET /` are answered identically by both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteSet {
    /// Markdown-only handler: every request is a conversion.
    Basic,
    /// Markdown plus zip export on `/full`.
    #[default]
    Full,
}

impl FromStr for RouteSet {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "full" => Ok(Self::Full),
            other => Err(ConvertError::InvalidConfig(format!(
                "unknown route set '{other}' (expected 'basic' or 'full')"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ServiceConfig::builder().build().unwrap();
        assert_eq!(c.service_name, "docling-converter");
        assert_eq!(c.default_filename, "document.pdf");
        assert_eq!(c.routes, RouteSet::Full);
        assert_eq!(c.docling_program, PathBuf::from("docling"));
        assert!(c.cache_dir.is_none());
    }

    #[test]
    fn empty_default_filename_rejected() {
        let err = ServiceConfig::builder()
            .default_filename("  ")
            .build()
            .unwrap_err();
        assert!(matches!(err, ConvertError::InvalidConfig(_)));
    }

    #[test]
    fn relative_scratch_dir_is_made_absolute() {
        let c = ServiceConfig::builder()
            .scratch_dir("scratch/exports")
            .build()
            .unwrap();
        let dir = c.scratch_dir.unwrap();
        assert!(dir.is_absolute(), "got: {}", dir.display());
        assert!(dir.ends_with("scratch/exports"));
        assert_eq!(dir, std::env::current_dir().unwrap().join("scratch/exports"));
    }

    #[test]
    fn absolute_scratch_dir_is_kept() {
        let c = ServiceConfig::builder().scratch_dir("/tmp/work").build().unwrap();
        assert_eq!(c.scratch_dir, Some(PathBuf::from("/tmp/work")));
    }

    #[test]
    fn empty_scratch_dir_means_system_temp() {
        let c = ServiceConfig::builder().scratch_dir("").build().unwrap();
        assert!(c.scratch_dir.is_none());
    }

    #[test]
    fn route_set_parsing() {
        assert_eq!("basic".parse::<RouteSet>().unwrap(), RouteSet::Basic);
        assert_eq!(" FULL ".parse::<RouteSet>().unwrap(), RouteSet::Full);
        assert!("everything".parse::<RouteSet>().is_err());
    }
}
