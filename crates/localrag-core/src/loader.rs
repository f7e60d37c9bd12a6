//! Directory loader producing normalized [`Document`]s.
//!
//! Format handlers run in [`DocFormat::ALL`] order, each isolated from the
//! others' failures. When nothing at all is recognized, every regular file in
//! the directory root is read as raw text instead.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::types::{DocFormat, Document};

#[derive(Debug, Error)]
enum ReadError {
    /// The handler cannot run at all, e.g. its extractor is not installed.
    #[error("{0}")]
    Unavailable(String),
    #[error("{0}")]
    File(String),
}

#[derive(Debug, Clone)]
pub struct DocumentLoader {
    pdftotext: PathBuf,
}

impl Default for DocumentLoader {
    fn default() -> Self {
        Self { pdftotext: PathBuf::from("pdftotext") }
    }
}

impl DocumentLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific `pdftotext` executable.
    pub fn with_pdf_extractor(mut self, program: impl Into<PathBuf>) -> Self {
        self.pdftotext = program.into();
        self
    }

    /// Load every recognized document under `dir`.
    ///
    /// Only a missing directory is an error; unreadable files and unavailable
    /// handlers are logged and skipped.
    pub fn load(&self, dir: &Path) -> Result<Vec<Document>> {
        if !dir.is_dir() {
            return Err(Error::NotFound(format!("data directory {}", dir.display())));
        }
        let files = list_files(dir);
        let mut documents = Vec::new();
        for format in DocFormat::ALL {
            let matching: Vec<&PathBuf> = files
                .iter()
                .filter(|p| p.extension().and_then(|e| e.to_str()).is_some_and(|e| format.matches_extension(e)))
                .collect();
            if matching.is_empty() {
                continue;
            }
            match self.read_all(format, dir, &matching) {
                Ok(mut found) => {
                    info!(?format, files = matching.len(), loaded = found.len(), "loaded documents");
                    documents.append(&mut found);
                }
                Err(e) => warn!(?format, error = %e, "format handler failed; continuing with the others"),
            }
        }
        if documents.is_empty() {
            documents = self.load_raw_fallback(dir);
        }
        Ok(documents)
    }

    fn read_all(
        &self,
        format: DocFormat,
        root: &Path,
        files: &[&PathBuf],
    ) -> std::result::Result<Vec<Document>, ReadError> {
        let mut out = Vec::with_capacity(files.len());
        for path in files {
            match self.read_one(format, path) {
                Ok(text) => out.push(Document { text, source: source_id(root, path), format }),
                Err(ReadError::File(msg)) => warn!(path = %path.display(), error = %msg, "skipping unreadable file"),
                Err(e) => return Err(e),
            }
        }
        Ok(out)
    }

    fn read_one(&self, format: DocFormat, path: &Path) -> std::result::Result<String, ReadError> {
        match format {
            DocFormat::Pdf => self.extract_pdf(path),
            DocFormat::Text | DocFormat::Markdown | DocFormat::Csv => {
                read_lossy(path).map_err(|e| ReadError::File(e.to_string()))
            }
        }
    }

    fn extract_pdf(&self, path: &Path) -> std::result::Result<String, ReadError> {
        let output = Command::new(&self.pdftotext)
            .arg("-layout")
            .arg("-enc")
            .arg("UTF-8")
            .arg(path)
            .arg("-")
            .output();
        match output {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(ReadError::Unavailable(format!(
                "PDF extractor '{}' not found (install poppler-utils)",
                self.pdftotext.display()
            ))),
            Err(e) => Err(ReadError::File(e.to_string())),
            Ok(out) if !out.status.success() => Err(ReadError::File(format!(
                "pdftotext exited with {}: {}",
                out.status,
                String::from_utf8_lossy(&out.stderr).trim()
            ))),
            Ok(out) => Ok(String::from_utf8_lossy(&out.stdout).into_owned()),
        }
    }

    fn load_raw_fallback(&self, dir: &Path) -> Vec<Document> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "cannot list data directory for fallback");
                return Vec::new();
            }
        };
        let mut paths: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .collect();
        paths.sort();
        if !paths.is_empty() {
            info!(files = paths.len(), "no recognized documents; reading directory root as raw text");
        }
        let mut documents = Vec::new();
        for path in paths {
            match read_lossy(&path) {
                Ok(text) => documents.push(Document { text, source: source_id(dir, &path), format: DocFormat::Text }),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable file"),
            }
        }
        documents
    }
}

fn read_lossy(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn source_id(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn list_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(err) => {
                debug!(error = %err, "skipping unreadable directory entry");
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().to_path_buf())
        .collect();
    files.sort();
    files
}
