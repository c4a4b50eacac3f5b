//! Local filesystem document source.
//!
//! Walks a directory for PDF, text, and markdown files and turns each into a
//! `Document`. PDF text extraction shells out to `pdftotext` (poppler), which
//! keeps this crate free of PDF parsing while matching what the tool produces
//! at query time.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use walkdir::WalkDir;

use crate::error::SourceError;
use crate::models::{ChunkingConfig, Document};
use crate::utils::read_file_content;

const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "txt", "md"];

/// One file that could not be loaded.
#[derive(Debug)]
pub struct SourceFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Everything a directory walk produced.
#[derive(Debug, Default)]
pub struct DiscoveredDocuments {
    pub documents: Vec<Document>,
    pub failed: Vec<SourceFailure>,
}

/// Loads documents from a local directory tree.
pub struct LocalSource {
    root: PathBuf,
    max_file_size: u64,
    exclude_patterns: Vec<glob::Pattern>,
}

impl LocalSource {
    pub fn new(root: impl Into<PathBuf>, config: &ChunkingConfig) -> Result<Self, SourceError> {
        let exclude_patterns = config
            .exclude_patterns
            .iter()
            .map(|p| glob::Pattern::new(p))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| SourceError::Walk(format!("invalid exclude pattern: {}", e)))?;

        Ok(Self {
            root: root.into(),
            max_file_size: config.max_file_size,
            exclude_patterns,
        })
    }

    /// Walk the root and load every supported file.
    ///
    /// A file that fails to read or extract is recorded and skipped; only a
    /// broken walk itself is fatal. `source_id` is the path relative to the
    /// root, so moving the corpus directory does not change document
    /// identities.
    pub async fn discover(&self) -> Result<DiscoveredDocuments, SourceError> {
        let mut result = DiscoveredDocuments::default();

        let mut paths = Vec::new();
        for entry in WalkDir::new(&self.root).follow_links(false) {
            let entry = entry.map_err(|e| SourceError::Walk(e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.into_path();
            if self.is_supported(&path) && !self.is_excluded(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        for path in paths {
            match self.load_document(&path).await {
                Ok(Some(document)) => result.documents.push(document),
                Ok(None) => {}
                Err(e) => result.failed.push(SourceFailure {
                    path,
                    reason: e.to_string(),
                }),
            }
        }

        Ok(result)
    }

    fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let lowered = ext.to_lowercase();
                SUPPORTED_EXTENSIONS.contains(&lowered.as_str())
            })
            .unwrap_or(false)
    }

    fn is_excluded(&self, path: &Path) -> bool {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        self.exclude_patterns
            .iter()
            .any(|pattern| pattern.matches_path(relative))
    }

    fn source_id(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned()
    }

    async fn load_document(&self, path: &Path) -> Result<Option<Document>, SourceError> {
        let is_pdf = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

        let content = if is_pdf {
            extract_pdf_text(path).await?
        } else {
            read_file_content(path, self.max_file_size).map_err(|e| SourceError::Read {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?
        };

        if content.trim().is_empty() {
            return Ok(None);
        }

        Ok(Some(Document::new(self.source_id(path), content)))
    }
}

/// Extract plain text from a PDF via `pdftotext -layout -enc UTF-8 <file> -`.
async fn extract_pdf_text(path: &Path) -> Result<String, SourceError> {
    let output = Command::new("pdftotext")
        .arg("-layout")
        .arg("-enc")
        .arg("UTF-8")
        .arg(path)
        .arg("-")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SourceError::ToolMissing(e.to_string())
            } else {
                SourceError::Extract {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                }
            }
        })?;

    if !output.status.success() {
        return Err(SourceError::Extract {
            path: path.to_path_buf(),
            reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
