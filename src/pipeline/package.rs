//! Archive packaging: converted document → zip of markdown + images.
//!
//! The engine can only save "markdown with referenced images" to a
//! directory, and the links it writes are absolute paths into that
//! directory. Those paths mean nothing to the client, so this stage:
//!
//! 1. saves the document into a scoped [`TempDir`] as `<base_name>.md`
//! 2. collects every image file below it (`png jpg jpeg gif bmp`,
//!    case-insensitive)
//! 3. replaces each image's full path in the markdown with its bare filename
//!    (plain substring replace, no markdown parsing); images sharing a bare
//!    name get a numbered suffix (`fig.png`, `fig_1.png`)
//! 4. zips the markdown and the images into one flat, in-memory archive
//!
//! Unzipping the result into any directory gives a markdown file whose image
//! links all resolve. The temp dir is removed on every exit path.

use crate::backend::{ConvertedDocument, ImageRefMode};
use crate::error::ConvertError;
use crate::pipeline::input::scratch_dir;
use std::collections::HashSet;
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// File extensions (lowercase, no dot) collected as images.
pub const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "bmp"];

/// A finished archive.
#[derive(Debug, Clone)]
pub struct PackagedArchive {
    /// Complete zip file.
    pub bytes: Vec<u8>,
    /// Number of image files written to the archive.
    pub image_count: usize,
}

/// An exported image and its flat name inside the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivedImage {
    /// Where the engine wrote the image.
    pub path: PathBuf,
    /// Entry name at the archive root.
    pub name: String,
}

/// Render `doc` with referenced images and pack it into a zip archive.
///
/// The archive holds `<base_name>.md` plus every image at its root.
pub fn package_document(
    doc: &dyn ConvertedDocument,
    base_name: &str,
    scratch: Option<&Path>,
) -> Result<PackagedArchive, ConvertError> {
    let workdir = scratch_dir(scratch, "docling-export-")?;
    let markdown_name = format!("{base_name}.md");
    let markdown_path = workdir.path().join(&markdown_name);

    doc.save_as_markdown(&markdown_path, ImageRefMode::Referenced)?;
    debug!("Saved markdown to {}", markdown_path.display());

    let images = archive_names(&markdown_name, collect_images(workdir.path())?);
    let markdown = fs::read_to_string(&markdown_path)
        .map_err(|e| ConvertError::io("Failed to read exported markdown", e))?;
    let markdown = rewrite_image_links(&markdown, &images);

    let bytes = build_archive(&markdown_name, &markdown, &images)?;
    info!(
        "Packaged {} with {} images ({} bytes)",
        markdown_name,
        images.len(),
        bytes.len()
    );

    Ok(PackagedArchive {
        bytes,
        image_count: images.len(),
    })
}

/// True when `path` has one of [`IMAGE_EXTENSIONS`], ignoring case.
pub fn is_image(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// Every image file below `dir`, recursively, in sorted path order.
fn collect_images(dir: &Path) -> Result<Vec<PathBuf>, ConvertError> {
    let mut images = Vec::new();
    walk(dir, &mut images)?;
    images.sort();
    Ok(images)
}

fn walk(dir: &Path, images: &mut Vec<PathBuf>) -> Result<(), ConvertError> {
    let entries = fs::read_dir(dir).map_err(|e| ConvertError::io("Failed to list export dir", e))?;
    for entry in entries {
        let path = entry
            .map_err(|e| ConvertError::io("Failed to list export dir", e))?
            .path();
        if path.is_dir() {
            walk(&path, images)?;
        } else if is_image(&path) {
            images.push(path);
        }
    }
    Ok(())
}

fn bare_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Give every image a distinct entry name: its bare filename, or
/// `<stem>_<n>.<ext>` when an earlier image already took that name.
fn archive_names(markdown_name: &str, images: Vec<PathBuf>) -> Vec<ArchivedImage> {
    let mut taken: HashSet<String> = HashSet::from([markdown_name.to_string()]);
    images
        .into_iter()
        .map(|path| {
            let name = unique_name(&path, &mut taken);
            ArchivedImage { path, name }
        })
        .collect()
}

fn unique_name(path: &Path, taken: &mut HashSet<String>) -> String {
    let name = bare_name(path);
    if taken.insert(name.clone()) {
        return name;
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let renamed = (1..)
        .map(|n| format!("{stem}_{n}{ext}"))
        .find(|candidate| taken.insert(candidate.clone()))
        .unwrap_or(name);
    debug!("Image name collision: {} archived as {}", path.display(), renamed);
    renamed
}

/// Replace each image's full path with its archive entry name.
///
/// Longer paths go first so a path that happens to prefix another one never
/// clobbers it.
pub fn rewrite_image_links(markdown: &str, images: &[ArchivedImage]) -> String {
    let mut ordered: Vec<&ArchivedImage> = images.iter().collect();
    ordered.sort_by_key(|image| std::cmp::Reverse(image.path.as_os_str().len()));
    ordered.into_iter().fold(markdown.to_string(), |text, image| {
        text.replace(&image.path.display().to_string(), &image.name)
    })
}

fn build_archive(
    markdown_name: &str,
    markdown: &str,
    images: &[ArchivedImage],
) -> Result<Vec<u8>, ConvertError> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    zip.start_file(markdown_name, options)?;
    zip.write_all(markdown.as_bytes())
        .map_err(|e| ConvertError::io("Failed to write archive entry", e))?;

    for image in images {
        let data =
            fs::read(&image.path).map_err(|e| ConvertError::io("Failed to read image", e))?;
        zip.start_file(image.name.as_str(), options)?;
        zip.write_all(&data)
            .map_err(|e| ConvertError::io("Failed to write archive entry", e))?;
    }

    Ok(zip.finish()?.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use zip::ZipArchive;

    /// Writes markdown and images the way the engine does: images in a
    /// `<stem>_artifacts` subdir, linked by absolute path.
    struct FakeDoc {
        images: Vec<&'static str>,
    }

    impl ConvertedDocument for FakeDoc {
        fn export_to_markdown(&self) -> Result<String, ConvertError> {
            Ok("# Title\n".to_string())
        }

        fn page_count(&self) -> Option<usize> {
            Some(1)
        }

        fn save_as_markdown(&self, path: &Path, mode: ImageRefMode) -> Result<(), ConvertError> {
            assert_eq!(mode, ImageRefMode::Referenced);
            let stem = path.file_stem().unwrap().to_string_lossy().into_owned();
            let artifacts = path.with_file_name(format!("{stem}_artifacts"));
            let mut md = String::from("# Title\n");
            for name in &self.images {
                let image = artifacts.join(name);
                fs::create_dir_all(image.parent().unwrap()).unwrap();
                fs::write(&image, name.as_bytes()).unwrap();
                md.push_str(&format!("\n![Image]({})\n", image.display()));
            }
            fs::write(path, md).unwrap();
            Ok(())
        }
    }

    fn entries(bytes: &[u8]) -> Vec<String> {
        let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
        names.sort();
        names
    }

    fn read_entry(bytes: &[u8], name: &str) -> String {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut text = String::new();
        archive.by_name(name).unwrap().read_to_string(&mut text).unwrap();
        text
    }

    #[test]
    fn zero_images_gives_markdown_only() {
        let out = package_document(&FakeDoc { images: vec![] }, "x", None).unwrap();
        assert_eq!(out.image_count, 0);
        assert_eq!(entries(&out.bytes), vec!["x.md"]);
        assert_eq!(read_entry(&out.bytes, "x.md"), "# Title\n");
    }

    #[test]
    fn images_are_flattened_and_links_rewritten() {
        let scratch = tempfile::TempDir::new().unwrap();
        let doc = FakeDoc {
            images: vec!["image_000000.png", "image_000001.JPG"],
        };
        let out = package_document(&doc, "paper", Some(scratch.path())).unwrap();

        assert_eq!(out.image_count, 2);
        assert_eq!(
            entries(&out.bytes),
            vec!["image_000000.png", "image_000001.JPG", "paper.md"]
        );
        let md = read_entry(&out.bytes, "paper.md");
        assert!(md.contains("![Image](image_000000.png)"), "got: {md}");
        assert!(md.contains("![Image](image_000001.JPG)"), "got: {md}");
        assert!(!md.contains(&scratch.path().display().to_string()));
    }

    #[test]
    fn colliding_names_get_distinct_entries() {
        let doc = FakeDoc {
            images: vec!["a/fig.png", "b/fig.png"],
        };
        let out = package_document(&doc, "x", None).unwrap();

        assert_eq!(out.image_count, 2);
        assert_eq!(entries(&out.bytes), vec!["fig.png", "fig_1.png", "x.md"]);
        assert_eq!(
            read_entry(&out.bytes, "x.md"),
            "# Title\n\n![Image](fig.png)\n\n![Image](fig_1.png)\n"
        );
        assert_eq!(read_entry(&out.bytes, "fig.png"), "a/fig.png");
        assert_eq!(read_entry(&out.bytes, "fig_1.png"), "b/fig.png");
    }

    #[test]
    fn numbered_name_skips_taken_names() {
        let images = vec![
            PathBuf::from("/t/a/fig.png"),
            PathBuf::from("/t/b/fig.png"),
            PathBuf::from("/t/c/fig_1.png"),
        ];
        let names: Vec<String> = archive_names("x.md", images)
            .into_iter()
            .map(|image| image.name)
            .collect();
        assert_eq!(names, vec!["fig.png", "fig_1.png", "fig_1_1.png"]);
    }

    #[test]
    fn export_dir_is_removed() {
        let scratch = tempfile::TempDir::new().unwrap();
        let doc = FakeDoc {
            images: vec!["a.png"],
        };
        package_document(&doc, "x", Some(scratch.path())).unwrap();
        assert_eq!(fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[test]
    fn export_dir_is_removed_on_failure() {
        struct Failing;
        impl ConvertedDocument for Failing {
            fn export_to_markdown(&self) -> Result<String, ConvertError> {
                unreachable!()
            }
            fn page_count(&self) -> Option<usize> {
                None
            }
            fn save_as_markdown(&self, path: &Path, _: ImageRefMode) -> Result<(), ConvertError> {
                fs::write(path.with_file_name("partial.png"), b"x").unwrap();
                Err(ConvertError::Backend {
                    message: "export crashed".into(),
                })
            }
        }

        let scratch = tempfile::TempDir::new().unwrap();
        let err = package_document(&Failing, "x", Some(scratch.path())).unwrap_err();
        assert_eq!(err.kind(), "BackendError");
        assert_eq!(fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[test]
    fn image_extension_check() {
        assert!(is_image(Path::new("/t/a.PNG")));
        assert!(is_image(Path::new("/t/a.jpeg")));
        assert!(is_image(Path::new("b.bmp")));
        assert!(!is_image(Path::new("/t/a.md")));
        assert!(!is_image(Path::new("/t/a.webp")));
        assert!(!is_image(Path::new("/t/png")));
    }

    #[test]
    fn rewrite_is_plain_substring_replace() {
        let images = vec![ArchivedImage {
            path: PathBuf::from("/tmp/e/x_artifacts/img.png"),
            name: "img.png".to_string(),
        }];
        let md = "![a](/tmp/e/x_artifacts/img.png) and again /tmp/e/x_artifacts/img.png";
        assert_eq!(
            rewrite_image_links(md, &images),
            "![a](img.png) and again img.png"
        );
    }
}
