//! Reading source documents from files, directories and stdin.
//!
//! Bytes are decoded as UTF-8 with lossy substitution, so a stray invalid
//! byte never fails a conversion. A leading byte-order mark is removed.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::reader::InputFormat;
use crate::{PrismError, Result};

const BOM: char = '\u{feff}';

/// Reads a source document from a local file.
///
/// Callers should validate and sanitize the path when accepting user input.
///
/// # Errors
///
/// Returns [`PrismError::FileNotFound`] when the path does not exist and
/// [`PrismError::Io`] when it cannot be read.
pub fn read_file(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(PrismError::FileNotFound(path.to_path_buf()));
    }

    let bytes = fs::read(path)?;
    Ok(decode(&bytes))
}

/// Reads a source document from standard input until EOF.
pub fn read_stdin() -> Result<String> {
    let mut bytes = Vec::new();
    io::stdin().read_to_end(&mut bytes)?;
    Ok(decode(&bytes))
}

/// Decodes bytes as UTF-8, replacing invalid sequences and dropping a BOM.
pub fn decode(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    match text.strip_prefix(BOM) {
        Some(rest) => rest.to_string(),
        None => text.into_owned(),
    }
}

/// Every file under `dir` (recursively) with a supported extension, sorted
/// by path. Symbolic links are not followed, and entries that cannot be read
/// are skipped with a warning.
///
/// # Errors
///
/// Returns [`PrismError::FileNotFound`] when `dir` does not exist.
pub fn collect_input_files(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();

    if !dir.exists() {
        return Err(PrismError::FileNotFound(dir.to_path_buf()));
    }

    let files = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable directory entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && InputFormat::is_supported(entry.path()))
        .map(DirEntry::into_path)
        .collect();

    Ok(files)
}
