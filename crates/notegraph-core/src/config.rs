//! Vault configuration.
//!
//! Read from `.notegraph.toml` at the vault root when present. Every key is
//! optional; missing keys take the defaults below.
//!
//! ```toml
//! include_subdirs = ["journal", "projects/active"]
//! include_root = true
//! case_policy = "insensitive-fallback"
//! attachments = true
//! tag_nodes = false
//! show_nested_tags = true
//!
//! [gather]
//! remove_code = true
//! keep_headings = true
//! keep_paragraphs = true
//! ```

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{NotegraphError, Result};
use crate::note::FileKind;

/// File name looked up at the vault root.
pub const CONFIG_FILE_NAME: &str = ".notegraph.toml";

pub const DEFAULT_NOTE_EXTENSION: &str = "md";
pub const DEFAULT_CANVAS_EXTENSION: &str = "canvas";

/// Image, audio, video, and PDF extensions treated as media.
pub const DEFAULT_MEDIA_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "svg", // images
    "mp3", "webm", "wav", "m4a", "ogg", "3gp", "flac", // audio
    "mp4", "ogv", "mov", "mkv", // video
    "pdf",
];

/// How note names are matched against link targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CasePolicy {
    /// Exact, case-sensitive matching only.
    #[default]
    Sensitive,
    /// Exact match first, then a case-insensitive basename match.
    InsensitiveFallback,
}

/// Plaintext rendering switches used by the gather phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GatherConfig {
    pub remove_code: bool,
    pub keep_headings: bool,
    pub keep_paragraphs: bool,
}

impl Default for GatherConfig {
    fn default() -> Self {
        Self {
            remove_code: true,
            keep_headings: true,
            keep_paragraphs: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VaultConfig {
    pub note_extension: String,
    pub canvas_extension: String,
    pub media_extensions: BTreeSet<String>,

    /// Directories (relative to the root) whose files are loaded. Empty
    /// means every directory.
    pub include_subdirs: Vec<String>,

    /// Whether files directly under the root are loaded when
    /// `include_subdirs` is non-empty.
    pub include_root: bool,

    pub case_policy: CasePolicy,

    /// Add media and canvas files to the graph as nodes.
    pub attachments: bool,

    /// Add one pseudo-node per tag with note-to-tag edges.
    pub tag_nodes: bool,

    /// Report nested tags in full (`a/b`) rather than by top level (`a`).
    pub show_nested_tags: bool,

    pub gather: GatherConfig,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            note_extension: DEFAULT_NOTE_EXTENSION.to_string(),
            canvas_extension: DEFAULT_CANVAS_EXTENSION.to_string(),
            media_extensions: DEFAULT_MEDIA_EXTENSIONS
                .iter()
                .map(|ext| (*ext).to_string())
                .collect(),
            include_subdirs: Vec::new(),
            include_root: true,
            case_policy: CasePolicy::default(),
            attachments: false,
            tag_nodes: false,
            show_nested_tags: true,
            gather: GatherConfig::default(),
        }
    }
}

impl VaultConfig {
    /// Parse configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`NotegraphError::Config`] for malformed TOML or unknown keys.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let mut config: Self =
            toml::from_str(text).map_err(|e| NotegraphError::Config(e.to_string()))?;
        config.normalize();
        Ok(config)
    }

    /// Read configuration from an explicit file.
    ///
    /// # Errors
    ///
    /// Returns [`NotegraphError::Io`] if the file cannot be read and
    /// [`NotegraphError::Config`] if it does not parse.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Read `<vault_root>/.notegraph.toml`, falling back to defaults when it
    /// does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default(vault_root: &Path) -> Result<Self> {
        let path = vault_root.join(CONFIG_FILE_NAME);
        if path.is_file() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Classify a path by extension. Returns `None` for files the vault
    /// does not track.
    #[must_use]
    pub fn classify(&self, path: &Path) -> Option<FileKind> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        if ext == self.note_extension {
            Some(FileKind::Note)
        } else if ext == self.canvas_extension {
            Some(FileKind::Canvas)
        } else if self.media_extensions.contains(&ext) {
            Some(FileKind::Media)
        } else {
            None
        }
    }

    fn normalize(&mut self) {
        let strip = |ext: &str| ext.trim_start_matches('.').to_ascii_lowercase();
        self.note_extension = strip(&self.note_extension);
        self.canvas_extension = strip(&self.canvas_extension);
        self.media_extensions = self.media_extensions.iter().map(|e| strip(e)).collect();
        for dir in &mut self.include_subdirs {
            *dir = dir.replace('\\', "/").trim_matches('/').to_string();
        }
    }
}
