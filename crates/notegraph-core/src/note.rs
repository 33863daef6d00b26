//! Identities and per-file metadata for vault entries.

use std::borrow::Borrow;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical key of a note, attachment, or tag in the vault graph.
///
/// For a note whose basename is unique this is the basename without
/// extension (`"Sussudio"`). Duplicated basenames are disambiguated by the
/// vault-relative path without extension (`"archive/Sussudio"`). Media and
/// canvas files keep their extension (`"Egg.jpg"`). Tag pseudo-nodes are
/// prefixed with `#`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(String);

impl NoteId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identity of the tag pseudo-node for `tag` (written without `#`).
    pub fn for_tag(tag: &str) -> Self {
        Self(format!("#{tag}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Final path segment of the identity.
    #[must_use]
    pub fn basename(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for NoteId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for NoteId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NoteId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NoteId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// What a file on disk is, decided by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Note,
    Media,
    Canvas,
}

impl FileKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Note => "note",
            Self::Media => "media",
            Self::Canvas => "canvas",
        }
    }
}

/// Kind of a node in the vault graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Note,
    Media,
    Canvas,
    Tag,
}

impl NodeKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Note => "note",
            Self::Media => "media",
            Self::Canvas => "canvas",
            Self::Tag => "tag",
        }
    }
}

impl From<FileKind> for NodeKind {
    fn from(kind: FileKind) -> Self {
        match kind {
            FileKind::Note => Self::Note,
            FileKind::Media => Self::Media,
            FileKind::Canvas => Self::Canvas,
        }
    }
}

/// Filesystem facts recorded when a file is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
    /// Path relative to the vault root, `/`-separated.
    pub rel_path: PathBuf,

    pub size: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,

    /// SHA-256 of the raw bytes, hex encoded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
}

impl FileMeta {
    pub fn new(rel_path: impl Into<PathBuf>) -> Self {
        Self {
            rel_path: rel_path.into(),
            size: 0,
            modified: None,
            content_hash: None,
        }
    }
}

/// A file that was enumerated but could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadFailure {
    pub rel_path: PathBuf,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn basename_is_last_segment() {
        assert_eq!(NoteId::new("archive/2021/Sussudio").basename(), "Sussudio");
        assert_eq!(NoteId::new("Sussudio").basename(), "Sussudio");
    }

    #[test]
    fn tag_ids_are_prefixed() {
        assert_eq!(NoteId::for_tag("y2000/party-over").as_str(), "#y2000/party-over");
    }

    #[test]
    fn note_ids_look_up_by_str() {
        let mut map = BTreeMap::new();
        map.insert(NoteId::new("Isolated note"), 1);
        assert_eq!(map.get("Isolated note"), Some(&1));
    }

    #[test]
    fn note_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&NoteId::new("Brevissima")).unwrap();
        assert_eq!(json, "\"Brevissima\"");
    }
}
