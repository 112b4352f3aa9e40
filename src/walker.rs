use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// A PDF file found in the source directory.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    /// File name, used as the `source` of every chunk taken from it.
    pub name: String,
    /// Full path to the file.
    pub path: PathBuf,
}

/// List the PDF files directly inside `dir`, sorted by file name.
///
/// The extension match is case-insensitive. Subdirectories are not
/// descended into. A missing directory is reported as
/// [`Error::NotFound`].
pub fn discover_pdfs(dir: &Path) -> Result<Vec<DiscoveredFile>> {
    if !dir.is_dir() {
        return Err(Error::NotFound {
            kind: "document directory",
            name: dir.display().to_string(),
        });
    }

    let mut results = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().to_string();
        if is_pdf(&name) {
            results.push(DiscoveredFile {
                name,
                path: entry.path(),
            });
        }
    }

    results.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(results)
}

fn is_pdf(name: &str) -> bool {
    name.to_lowercase().ends_with(".pdf")
}
