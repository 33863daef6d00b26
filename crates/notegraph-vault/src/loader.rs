//! Reading single files from disk.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use notegraph_core::{FileMeta, FrontMatter, NotegraphError, Result};
use notegraph_index::split_note;
use sha2::{Digest, Sha256};

/// A note read from disk with its front matter split off.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedNote {
    pub body: String,
    pub front_matter: FrontMatter,
    pub meta: FileMeta,
}

/// Read a note as UTF-8 and split its front matter.
///
/// # Errors
///
/// Returns [`NotegraphError::Load`] if the file cannot be read or is not
/// valid UTF-8.
pub fn load_note(root: &Path, rel_path: &Path) -> Result<LoadedNote> {
    let (text, meta) = read_text(root, rel_path)?;
    let (front_matter, body) = split_note(rel_path, &text);
    Ok(LoadedNote {
        body: body.to_string(),
        front_matter,
        meta,
    })
}

/// Read a file as UTF-8 along with its metadata and content hash.
///
/// # Errors
///
/// Returns [`NotegraphError::Load`] if the file cannot be read or is not
/// valid UTF-8.
pub fn read_text(root: &Path, rel_path: &Path) -> Result<(String, FileMeta)> {
    let path = root.join(rel_path);
    let bytes = fs::read(&path).map_err(|e| load_error(rel_path, e))?;
    let mut meta = file_meta(root, rel_path)?;
    meta.content_hash = Some(content_hash(&bytes));
    let text = String::from_utf8(bytes).map_err(|e| load_error(rel_path, e))?;
    Ok((text, meta))
}

/// Size and modification time of a file, without reading it.
///
/// # Errors
///
/// Returns [`NotegraphError::Load`] if the file cannot be inspected.
pub fn file_meta(root: &Path, rel_path: &Path) -> Result<FileMeta> {
    let metadata = fs::metadata(root.join(rel_path)).map_err(|e| load_error(rel_path, e))?;
    Ok(FileMeta {
        rel_path: rel_path.to_path_buf(),
        size: metadata.len(),
        modified: metadata.modified().ok().map(DateTime::<Utc>::from),
        content_hash: None,
    })
}

/// Hex-encoded SHA-256 of `bytes`.
#[must_use]
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

fn load_error(rel_path: &Path, err: impl std::fmt::Display) -> NotegraphError {
    NotegraphError::Load {
        path: rel_path.display().to_string(),
        reason: err.to_string(),
    }
}
