//! Immutable tables of the files enumerated for one run.
//!
//! A [`FileTable`] maps basenames and relative paths to entries for one
//! file category and fixes every entry's canonical [`NoteId`]. Candidates
//! sharing a basename are ordered by (path depth, path); the first owns the
//! bare basename, the rest are keyed by their path.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use notegraph_core::{FileKind, NoteId, VaultConfig};
use serde::Serialize;

/// One enumerated file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub id: NoteId,
    pub kind: FileKind,
    /// Path relative to the vault root as enumerated.
    pub rel_path: PathBuf,
    /// `/`-separated relative path; without extension for notes.
    pub key_path: String,
    /// Last segment of `key_path`.
    pub basename: String,
    #[serde(skip)]
    depth: usize,
}

#[derive(Debug, Clone, Default)]
pub struct FileTable {
    entries: Vec<FileEntry>,
    by_name: BTreeMap<String, Vec<usize>>,
    by_folded_name: BTreeMap<String, Vec<usize>>,
    by_path: BTreeMap<String, usize>,
    by_id: BTreeMap<NoteId, usize>,
    by_rel: BTreeMap<PathBuf, usize>,
}

impl FileTable {
    /// Build the table for `kind` from vault-relative paths.
    ///
    /// `note_extension` is stripped from note names. Two paths that
    /// normalize to the same key keep only the first.
    pub fn new(
        kind: FileKind,
        note_extension: &str,
        paths: impl IntoIterator<Item = PathBuf>,
    ) -> Self {
        let mut entries: Vec<FileEntry> = paths
            .into_iter()
            .map(|rel_path| {
                let normalized = normalize_rel_path(&rel_path);
                let key_path = match kind {
                    FileKind::Note => strip_extension(&normalized, note_extension).to_string(),
                    FileKind::Media | FileKind::Canvas => normalized,
                };
                let basename = key_path.rsplit('/').next().unwrap_or(&key_path).to_string();
                let depth = key_path.matches('/').count();
                FileEntry {
                    id: NoteId::new(basename.as_str()),
                    kind,
                    rel_path,
                    key_path,
                    basename,
                    depth,
                }
            })
            .collect();
        entries.sort_by(|a, b| (a.depth, &a.key_path).cmp(&(b.depth, &b.key_path)));
        entries.dedup_by(|later, first| later.key_path == first.key_path);

        let mut table = Self::default();
        for (i, entry) in entries.iter().enumerate() {
            table.by_name.entry(entry.basename.clone()).or_default().push(i);
            table
                .by_folded_name
                .entry(entry.basename.to_lowercase())
                .or_default()
                .push(i);
            table.by_path.insert(entry.key_path.clone(), i);
            table.by_rel.insert(entry.rel_path.clone(), i);
        }
        for candidates in table.by_name.values() {
            for &i in candidates.iter().skip(1) {
                entries[i].id = NoteId::new(entries[i].key_path.as_str());
            }
        }
        for (i, entry) in entries.iter().enumerate() {
            table.by_id.insert(entry.id.clone(), i);
        }
        table.entries = entries;
        table
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in (depth, path) order.
    pub fn entries(&self) -> impl Iterator<Item = &FileEntry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&FileEntry> {
        self.by_id.get(id).map(|&i| &self.entries[i])
    }

    /// Entry enumerated at exactly `rel_path`.
    #[must_use]
    pub fn by_rel_path(&self, rel_path: &Path) -> Option<&FileEntry> {
        self.by_rel.get(rel_path).map(|&i| &self.entries[i])
    }

    /// Every file with this basename, best candidate first.
    pub fn candidates(&self, basename: &str) -> impl Iterator<Item = &FileEntry> {
        self.indexed(self.by_name.get(basename))
    }

    /// Like [`candidates`](Self::candidates) ignoring case.
    pub fn folded_candidates(&self, basename: &str) -> impl Iterator<Item = &FileEntry> {
        self.indexed(self.by_folded_name.get(&basename.to_lowercase()))
    }

    /// Entry whose key path is exactly `key`.
    #[must_use]
    pub fn exact_path(&self, key: &str) -> Option<&FileEntry> {
        self.by_path.get(key).map(|&i| &self.entries[i])
    }

    /// Entries whose key path ends with `/key`, best candidate first.
    pub fn path_suffix_matches<'t>(
        &'t self,
        key: &'t str,
        fold_case: bool,
    ) -> impl Iterator<Item = &'t FileEntry> + 't {
        let suffix = format!("/{key}");
        let suffix = if fold_case { suffix.to_lowercase() } else { suffix };
        self.entries.iter().filter(move |entry| {
            if fold_case {
                entry.key_path.to_lowercase().ends_with(&suffix)
                    || entry.key_path.eq_ignore_ascii_case(key)
            } else {
                entry.key_path.ends_with(&suffix)
            }
        })
    }

    fn indexed<'t>(&'t self, indices: Option<&'t Vec<usize>>) -> impl Iterator<Item = &'t FileEntry> {
        indices
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(|&i| &self.entries[i])
    }
}

/// All enumerated files of a run, split by category.
#[derive(Debug, Clone, Default)]
pub struct VaultFiles {
    config: VaultConfig,
    notes: FileTable,
    media: FileTable,
    canvas: FileTable,
}

impl VaultFiles {
    /// Classify `paths` by extension and build one table per category.
    /// Paths of untracked types are ignored.
    pub fn from_paths(paths: impl IntoIterator<Item = PathBuf>, config: &VaultConfig) -> Self {
        let mut notes = Vec::new();
        let mut media = Vec::new();
        let mut canvas = Vec::new();
        for path in paths {
            match config.classify(&path) {
                Some(FileKind::Note) => notes.push(path),
                Some(FileKind::Media) => media.push(path),
                Some(FileKind::Canvas) => canvas.push(path),
                None => {}
            }
        }
        let ext = config.note_extension.as_str();
        Self {
            config: config.clone(),
            notes: FileTable::new(FileKind::Note, ext, notes),
            media: FileTable::new(FileKind::Media, ext, media),
            canvas: FileTable::new(FileKind::Canvas, ext, canvas),
        }
    }

    #[must_use]
    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    #[must_use]
    pub fn table(&self, kind: FileKind) -> &FileTable {
        match kind {
            FileKind::Note => &self.notes,
            FileKind::Media => &self.media,
            FileKind::Canvas => &self.canvas,
        }
    }

    #[must_use]
    pub fn notes(&self) -> &FileTable {
        &self.notes
    }

    #[must_use]
    pub fn media(&self) -> &FileTable {
        &self.media
    }

    #[must_use]
    pub fn canvas(&self) -> &FileTable {
        &self.canvas
    }

    /// Entry for a path exactly as enumerated, in any category.
    #[must_use]
    pub fn by_rel_path(&self, rel_path: &Path) -> Option<&FileEntry> {
        let kind = self.config.classify(rel_path)?;
        self.table(kind).by_rel_path(rel_path)
    }

    /// Category a link target points at, judged by its extension.
    #[must_use]
    pub fn classify_target(&self, target: &str) -> FileKind {
        match self.config.classify(Path::new(target)) {
            Some(FileKind::Media) => FileKind::Media,
            Some(FileKind::Canvas) => FileKind::Canvas,
            _ => FileKind::Note,
        }
    }
}

/// `/`-separated form of a relative path.
pub(crate) fn normalize_rel_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "/")
        .trim_start_matches("./")
        .trim_start_matches('/')
        .to_string()
}

/// Strip `.ext` (any case) from the end of `path`.
pub(crate) fn strip_extension<'p>(path: &'p str, ext: &str) -> &'p str {
    let Some(dot) = path.len().checked_sub(ext.len() + 1) else {
        return path;
    };
    if !path.is_char_boundary(dot) {
        return path;
    }
    let (stem, suffix) = path.split_at(dot);
    if suffix.starts_with('.') && suffix[1..].eq_ignore_ascii_case(ext) && !stem.is_empty() {
        stem
    } else {
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note_table(paths: &[&str]) -> FileTable {
        FileTable::new(FileKind::Note, "md", paths.iter().map(PathBuf::from))
    }

    #[test]
    fn shortest_path_owns_the_basename() {
        let table = note_table(&["folder/B.md", "B.md", "a/b/B.md", "A.md"]);
        assert_eq!(table.get("B").unwrap().rel_path, PathBuf::from("B.md"));
        assert_eq!(table.get("folder/B").unwrap().rel_path, PathBuf::from("folder/B.md"));
        assert_eq!(table.get("a/b/B").unwrap().rel_path, PathBuf::from("a/b/B.md"));
        assert_eq!(table.get("A").unwrap().key_path, "A");

        let order: Vec<_> = table.candidates("B").map(|e| e.id.as_str()).collect();
        assert_eq!(order, vec!["B", "folder/B", "a/b/B"]);
    }

    #[test]
    fn equal_depth_duplicates_order_by_path() {
        let table = note_table(&["zeta/Note.md", "alpha/Note.md"]);
        assert_eq!(table.get("Note").unwrap().key_path, "alpha/Note");
        assert!(table.get("zeta/Note").is_some());
    }

    #[test]
    fn media_names_keep_extension() {
        let table = FileTable::new(FileKind::Media, "md", [PathBuf::from("img/Egg.jpg")]);
        let entry = table.get("Egg.jpg").unwrap();
        assert_eq!(entry.key_path, "img/Egg.jpg");
        assert_eq!(entry.basename, "Egg.jpg");
    }

    #[test]
    fn path_suffix_matching() {
        let table = note_table(&["x/folder/B.md", "folder/B.md", "B.md"]);
        let matches: Vec<_> = table
            .path_suffix_matches("folder/B", false)
            .map(|e| e.key_path.as_str())
            .collect();
        assert_eq!(matches, vec!["x/folder/B"]);
        assert_eq!(table.path_suffix_matches("FOLDER/b", true).count(), 2);
    }

    #[test]
    fn vault_files_classify_and_look_up() {
        let files = VaultFiles::from_paths(
            ["A.md", "img/Egg.jpg", "Board.canvas", "script.py"].map(PathBuf::from),
            &VaultConfig::default(),
        );
        assert_eq!(files.notes().len(), 1);
        assert_eq!(files.media().len(), 1);
        assert_eq!(files.canvas().len(), 1);
        assert_eq!(files.by_rel_path(Path::new("img/Egg.jpg")).unwrap().id.as_str(), "Egg.jpg");
        assert_eq!(files.classify_target("Egg.PNG"), FileKind::Media);
        assert_eq!(files.classify_target("Board.canvas"), FileKind::Canvas);
        assert_eq!(files.classify_target("Sussudio"), FileKind::Note);
    }

    #[test]
    fn strip_extension_is_case_insensitive() {
        assert_eq!(strip_extension("a/B.md", "md"), "a/B");
        assert_eq!(strip_extension("B.MD", "md"), "B");
        assert_eq!(strip_extension(".md", "md"), ".md");
        assert_eq!(strip_extension("Bmd", "md"), "Bmd");
        assert_eq!(strip_extension("é", "md"), "é");
    }
}
