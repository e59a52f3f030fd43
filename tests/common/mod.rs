//! Shared test helpers: a scriptable in-process conversion engine.

#![allow(dead_code)]

use docling_converter::{
    ConvertError, ConvertedDocument, Converter, DocumentBackend, DocumentSource, Handler,
    ImageRefMode, PipelineOptions, RouteSet, ServiceConfig,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

/// What the engine was asked to do on one call.
#[derive(Debug, Clone)]
pub struct Call {
    pub source: String,
    pub options: PipelineOptions,
    /// Temp file path for inline uploads.
    pub path: Option<PathBuf>,
    /// Whether that temp file existed during the call.
    pub existed: bool,
}

/// How the fake engine behaves.
#[derive(Debug, Clone, Default)]
pub enum Behaviour {
    #[default]
    Succeed,
    Fail(String),
    Panic,
}

/// Engine double: returns fixed markdown and, when pictures are requested,
/// writes `images` the way docling does (under `<stem>_artifacts/pictures/`,
/// linked by absolute path).
#[derive(Debug, Default)]
pub struct FakeBackend {
    pub markdown: String,
    pub pages: Option<usize>,
    pub images: Vec<&'static str>,
    pub behaviour: Behaviour,
    pub calls: Mutex<Vec<Call>>,
}

impl FakeBackend {
    pub fn new(markdown: &str) -> Self {
        Self {
            markdown: markdown.to_string(),
            pages: Some(1),
            ..Default::default()
        }
    }

    pub fn with_images(mut self, images: Vec<&'static str>) -> Self {
        self.images = images;
        self
    }

    pub fn with_pages(mut self, pages: Option<usize>) -> Self {
        self.pages = pages;
        self
    }

    pub fn with_behaviour(mut self, behaviour: Behaviour) -> Self {
        self.behaviour = behaviour;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

impl DocumentBackend for FakeBackend {
    fn convert(
        &self,
        source: DocumentSource<'_>,
        options: &PipelineOptions,
    ) -> Result<Box<dyn ConvertedDocument>, ConvertError> {
        let (path, existed) = match source {
            DocumentSource::Path(p) => (Some(p.to_path_buf()), p.exists()),
            DocumentSource::Url(_) => (None, false),
        };
        self.calls.lock().unwrap().push(Call {
            source: source.to_string(),
            options: *options,
            path,
            existed,
        });

        match self.behaviour {
            Behaviour::Succeed => {}
            Behaviour::Fail(ref message) => {
                return Err(ConvertError::Backend {
                    message: message.clone(),
                })
            }
            Behaviour::Panic => panic!("engine crashed"),
        }

        Ok(Box::new(FakeDocument {
            markdown: self.markdown.clone(),
            pages: self.pages,
            images: if options.generate_picture_images {
                self.images.clone()
            } else {
                Vec::new()
            },
        }))
    }
}

struct FakeDocument {
    markdown: String,
    pages: Option<usize>,
    images: Vec<&'static str>,
}

impl ConvertedDocument for FakeDocument {
    fn export_to_markdown(&self) -> Result<String, ConvertError> {
        Ok(self.markdown.clone())
    }

    fn page_count(&self) -> Option<usize> {
        self.pages
    }

    fn save_as_markdown(&self, path: &Path, _mode: ImageRefMode) -> Result<(), ConvertError> {
        let stem = path.file_stem().unwrap().to_string_lossy().into_owned();
        let pictures = path.with_file_name(format!("{stem}_artifacts")).join("pictures");
        let mut md = self.markdown.clone();
        for (i, name) in self.images.iter().enumerate() {
            let image = pictures.join(name);
            fs::create_dir_all(image.parent().unwrap()).map_err(|e| ConvertError::io("mkdir", e))?;
            fs::write(&image, format!("image-{i}")).map_err(|e| ConvertError::io("write", e))?;
            md.push_str(&format!("\n![Figure {i}]({})\n", image.display()));
        }
        fs::write(path, md).map_err(|e| ConvertError::io("write", e))
    }
}

/// Route library logs to the test harness; safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .with_test_writer()
        .try_init();
}

/// A handler over `backend` whose temp files all land in the returned dir.
pub fn handler_with(backend: Arc<FakeBackend>, routes: RouteSet) -> (Handler, TempDir) {
    init_tracing();
    let scratch = TempDir::new().unwrap();
    let config = ServiceConfig::builder()
        .scratch_dir(scratch.path())
        .routes(routes)
        .build()
        .unwrap();
    let backend: Arc<dyn DocumentBackend> = backend;
    (Handler::new(Converter::new(backend, config)), scratch)
}

/// Number of entries left in a scratch dir.
pub fn leftovers(dir: &TempDir) -> usize {
    fs::read_dir(dir.path()).unwrap().count()
}
