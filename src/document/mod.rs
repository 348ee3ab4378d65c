
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::{RagError, Result};

/// File extensions the loader understands
const SUPPORTED_EXTENSIONS: [&str; 3] = ["pdf", "md", "txt"];

/// Load a document source into plain text.
///
/// A file is extracted according to its extension: PDFs go through
/// `pdf-extract`, anything else is read as UTF-8 text. A directory loads
/// every supported file in sorted file-name order, joined by blank lines.
#[inline]
pub fn load_document(path: &Path) -> Result<String> {
    if path.is_dir() {
        load_directory(path)
    } else {
        load_file(path)
    }
}

fn load_file(path: &Path) -> Result<String> {
    debug!("Loading document from {}", path.display());

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let text = if extension.as_deref() == Some("pdf") {
        let bytes = fs::read(path)
            .map_err(|e| RagError::Load(format!("Failed to read {}: {}", path.display(), e)))?;
        pdf_extract::extract_text_from_mem(&bytes).map_err(|e| {
            RagError::Load(format!(
                "Failed to extract PDF text from {}: {}",
                path.display(),
                e
            ))
        })?
    } else {
        fs::read_to_string(path)
            .map_err(|e| RagError::Load(format!("Failed to read {}: {}", path.display(), e)))?
    };

    info!("Loaded {} ({} bytes of text)", path.display(), text.len());
    Ok(text)
}

fn load_directory(dir: &Path) -> Result<String> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| RagError::Load(format!("Failed to read directory {}: {}", dir.display(), e)))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && has_supported_extension(p))
        .collect();

    if files.is_empty() {
        return Err(RagError::Load(format!(
            "No supported documents found in {}",
            dir.display()
        )));
    }

    // Deterministic document order
    files.sort();

    let mut parts = Vec::with_capacity(files.len());
    for file in &files {
        parts.push(load_file(file)?);
    }

    info!("Loaded {} documents from {}", parts.len(), dir.display());
    Ok(parts.join("\n\n"))
}

fn has_supported_extension(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()).is_some_and(|e| {
        let lowered = e.to_ascii_lowercase();
        SUPPORTED_EXTENSIONS.contains(&lowered.as_str())
    })
}
