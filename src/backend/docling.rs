//! [`DocumentBackend`] that shells out to the `docling` command-line tool.
//!
//! ## Why a subprocess?
//!
//! Docling is a Python package. Its CLI exposes exactly the knobs the
//! handlers need (`--no-ocr`, `--image-export-mode referenced`, multiple
//! `--to` formats), so driving it as a child process keeps the engine fully
//! out of this crate. Each conversion gets its own [`TempDir`] as the
//! `--output` directory; it lives inside the returned document and is removed
//! when the document is dropped.
//!
//! The model cache directory is set on the child's environment only
//! (`HF_HOME`, `XDG_CACHE_HOME`). The host process environment is never
//! touched.

use super::{ConvertedDocument, DocumentBackend, DocumentSource, ImageRefMode, PipelineOptions};
use crate::config::ServiceConfig;
use crate::error::ConvertError;
use crate::pipeline::input::scratch_dir;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;
use tracing::{debug, info};

/// Runs `docling <source> --to md --to json --output <tmp> ...` per request.
#[derive(Debug, Clone)]
pub struct DoclingCli {
    program: PathBuf,
    artifacts_path: Option<PathBuf>,
    cache_dir: Option<PathBuf>,
    scratch_dir: Option<PathBuf>,
}

impl DoclingCli {
    /// Build the backend from the service configuration.
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            program: config.docling_program.clone(),
            artifacts_path: config.artifacts_path.clone(),
            cache_dir: config.cache_dir.clone(),
            scratch_dir: config.scratch_dir.clone(),
        }
    }

    /// Check that the executable runs; returns its version string.
    pub fn probe(&self) -> Result<String, ConvertError> {
        let output = self
            .base_command()
            .arg("--version")
            .output()
            .map_err(|e| ConvertError::io(format!("Failed to run '{}'", self.program.display()), e))?;

        if !output.status.success() {
            return Err(ConvertError::Backend {
                message: failure_message(&output),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn base_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        if let Some(ref dir) = self.cache_dir {
            cmd.env("HF_HOME", dir).env("XDG_CACHE_HOME", dir);
        }
        cmd
    }

    fn convert_command(
        &self,
        source: DocumentSource<'_>,
        options: &PipelineOptions,
        output_dir: &Path,
    ) -> Command {
        let mut cmd = self.base_command();
        match source {
            DocumentSource::Url(url) => cmd.arg(url),
            DocumentSource::Path(path) => cmd.arg(path),
        };
        cmd.args(["--to", "md", "--to", "json"])
            .arg("--output")
            .arg(output_dir)
            .arg("--image-export-mode")
            .arg(if options.generate_picture_images {
                "referenced"
            } else {
                "placeholder"
            })
            .arg(if options.do_ocr { "--ocr" } else { "--no-ocr" })
            .arg("--abort-on-error");
        if let Some(ref artifacts) = self.artifacts_path {
            cmd.arg("--artifacts-path").arg(artifacts);
        }
        cmd
    }
}

impl DocumentBackend for DoclingCli {
    fn convert(
        &self,
        source: DocumentSource<'_>,
        options: &PipelineOptions,
    ) -> Result<Box<dyn ConvertedDocument>, ConvertError> {
        let workdir = scratch_dir(self.scratch_dir.as_deref(), "docling-out-")?;
        let mut cmd = self.convert_command(source, options, workdir.path());
        debug!("Running {:?}", cmd);

        let output = cmd
            .output()
            .map_err(|e| ConvertError::io(format!("Failed to run '{}'", self.program.display()), e))?;
        if !output.status.success() {
            return Err(ConvertError::Backend {
                message: failure_message(&output),
            });
        }

        let doc = CliDocument::load(workdir)?;
        info!(
            "docling converted {} ({} pages)",
            source,
            doc.num_pages.map_or_else(|| "?".to_string(), |n| n.to_string())
        );
        Ok(Box::new(doc))
    }
}

/// Output of one `docling` run, read back from its output directory.
struct CliDocument {
    workdir: TempDir,
    stem: String,
    markdown: String,
    num_pages: Option<usize>,
}

impl CliDocument {
    fn load(workdir: TempDir) -> Result<Self, ConvertError> {
        let markdown_path = find_markdown(workdir.path())?;
        let stem = markdown_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let markdown = fs::read_to_string(&markdown_path)
            .map_err(|e| ConvertError::io("Failed to read docling markdown", e))?;
        let num_pages = read_page_count(&workdir.path().join(format!("{stem}.json")));

        Ok(Self {
            workdir,
            stem,
            markdown,
            num_pages,
        })
    }

    fn artifacts_dir(&self) -> PathBuf {
        self.workdir.path().join(format!("{}_artifacts", self.stem))
    }
}

impl ConvertedDocument for CliDocument {
    fn export_to_markdown(&self) -> Result<String, ConvertError> {
        Ok(self.markdown.clone())
    }

    fn page_count(&self) -> Option<usize> {
        self.num_pages
    }

    fn save_as_markdown(&self, path: &Path, image_mode: ImageRefMode) -> Result<(), ConvertError> {
        let source_artifacts = self.artifacts_dir();
        let text = if image_mode == ImageRefMode::Referenced && source_artifacts.is_dir() {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "document".to_string());
            let target_artifacts = path.with_file_name(format!("{stem}_artifacts"));
            copy_dir(&source_artifacts, &target_artifacts)?;
            // docling links images by absolute path under its --output dir
            self.markdown.replace(
                &source_artifacts.display().to_string(),
                &target_artifacts.display().to_string(),
            )
        } else {
            self.markdown.clone()
        };

        fs::write(path, text).map_err(|e| ConvertError::io("Failed to write markdown", e))
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────

fn find_markdown(dir: &Path) -> Result<PathBuf, ConvertError> {
    let entries = fs::read_dir(dir).map_err(|e| ConvertError::io("Failed to list docling output", e))?;
    let mut candidates: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "md"))
        .collect();
    candidates.sort();
    candidates
        .into_iter()
        .next()
        .ok_or_else(|| ConvertError::MissingOutput {
            path: dir.join("*.md"),
        })
}

/// Page count from docling's JSON export (`pages` is keyed by page number).
fn read_page_count(json_path: &Path) -> Option<usize> {
    let text = fs::read_to_string(json_path).ok()?;
    let doc: serde_json::Value = serde_json::from_str(&text).ok()?;
    doc.get("pages")?.as_object().map(|pages| pages.len())
}

fn copy_dir(from: &Path, to: &Path) -> Result<(), ConvertError> {
    fs::create_dir_all(to).map_err(|e| ConvertError::io("Failed to create artifacts dir", e))?;
    let entries = fs::read_dir(from).map_err(|e| ConvertError::io("Failed to list artifacts", e))?;
    for entry in entries {
        let entry = entry.map_err(|e| ConvertError::io("Failed to list artifacts", e))?;
        let path = entry.path();
        let target = to.join(entry.file_name());
        if path.is_dir() {
            copy_dir(&path, &target)?;
        } else {
            fs::copy(&path, &target).map_err(|e| ConvertError::io("Failed to copy artifact", e))?;
        }
    }
    Ok(())
}

fn failure_message(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("docling exited with {}", output.status))
}
