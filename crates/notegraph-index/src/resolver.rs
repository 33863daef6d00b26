//! Identity resolution: link target text to canonical identity.
//!
//! Lookup order for a target without `/`: exact basename, then (with
//! [`CasePolicy::InsensitiveFallback`]) case-folded basename. A target with
//! `/` is a path: exact relative path, then the shortest path ending in it.
//! Paths never fall back to a bare basename match. Anything unmatched gets
//! a nonexistent identity keyed by the normalized target.

use std::path::{Path, PathBuf};

use notegraph_core::{CasePolicy, FileKind, NoteId};
use serde::Serialize;

use crate::files::{strip_extension, FileEntry, FileTable, VaultFiles};

/// Outcome of resolving one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub id: NoteId,
    pub kind: FileKind,
    /// Set when the target is a file on disk.
    pub rel_path: Option<PathBuf>,
    /// More than one file matched; the first by (depth, path) won.
    pub ambiguous: bool,
    /// Matched only after case folding.
    pub case_folded: bool,
}

impl Resolution {
    #[must_use]
    pub fn exists(&self) -> bool {
        self.rel_path.is_some()
    }

    fn found(entry: &FileEntry, ambiguous: bool, case_folded: bool) -> Self {
        Self {
            id: entry.id.clone(),
            kind: entry.kind,
            rel_path: Some(entry.rel_path.clone()),
            ambiguous,
            case_folded,
        }
    }

    fn missing(key: String, kind: FileKind) -> Self {
        Self {
            id: NoteId::new(key),
            kind,
            rel_path: None,
            ambiguous: false,
            case_folded: false,
        }
    }
}

/// Resolves targets against the file tables of one run.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    files: &'a VaultFiles,
    policy: CasePolicy,
}

impl<'a> Resolver<'a> {
    #[must_use]
    pub fn new(files: &'a VaultFiles, policy: CasePolicy) -> Self {
        Self { files, policy }
    }

    /// Resolve a raw target that may still carry `|alias` and `#anchor`.
    #[must_use]
    pub fn resolve(&self, raw_target: &str) -> Option<Resolution> {
        let target = raw_target.split('|').next().unwrap_or(raw_target);
        let target = target.split('#').next().unwrap_or(target);
        self.resolve_target(target)
    }

    /// Resolve a target relative to the note at `source`.
    ///
    /// Targets starting with `./` or `../` are joined to the source note's
    /// directory first; anything else resolves from the vault root.
    #[must_use]
    pub fn resolve_from(&self, source: &Path, target: &str) -> Option<Resolution> {
        let trimmed = target.trim();
        if !(trimmed.starts_with("./") || trimmed.starts_with("../")) {
            return self.resolve_target(trimmed);
        }
        let mut segments: Vec<String> = source
            .parent()
            .map(|dir| {
                dir.components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        for segment in trimmed.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                other => segments.push(other.to_string()),
            }
        }
        self.resolve_target(&segments.join("/"))
    }

    /// Resolve a target that has already had alias and anchor removed.
    ///
    /// Returns `None` for an empty target.
    #[must_use]
    pub fn resolve_target(&self, target: &str) -> Option<Resolution> {
        let normalized = normalize_target(target)?;
        let kind = self.files.classify_target(&normalized);
        let table = self.files.table(kind);
        let key = match kind {
            FileKind::Note => {
                strip_extension(&normalized, &self.files.config().note_extension).to_string()
            }
            FileKind::Media | FileKind::Canvas => normalized,
        };
        let fold = self.policy == CasePolicy::InsensitiveFallback;

        let found = if key.contains('/') {
            resolve_path(table, &key, false).or_else(|| {
                fold.then(|| resolve_path(table, &key, true))
                    .flatten()
                    .map(|r| Resolution { case_folded: true, ..r })
            })
        } else {
            first_of(table.candidates(&key), false).or_else(|| {
                fold.then(|| first_of(table.folded_candidates(&key), true))
                    .flatten()
            })
        };
        Some(found.unwrap_or_else(|| Resolution::missing(key, kind)))
    }
}

fn resolve_path(table: &FileTable, key: &str, fold_case: bool) -> Option<Resolution> {
    if !fold_case {
        if let Some(entry) = table.exact_path(key) {
            return Some(Resolution::found(entry, false, false));
        }
    }
    first_of(table.path_suffix_matches(key, fold_case), false)
}

fn first_of<'t>(
    mut candidates: impl Iterator<Item = &'t FileEntry>,
    case_folded: bool,
) -> Option<Resolution> {
    let first = candidates.next()?;
    let ambiguous = candidates.next().is_some();
    Some(Resolution::found(first, ambiguous, case_folded))
}

/// Normalize separators and strip leading `./` and `/`.
fn normalize_target(target: &str) -> Option<String> {
    let mut normalized = target.trim().replace('\\', "/");
    while normalized.contains("//") {
        normalized = normalized.replace("//", "/");
    }
    let mut rest = normalized.as_str();
    loop {
        let stripped = rest.trim_start_matches("./").trim_start_matches('/');
        if stripped.len() == rest.len() {
            break;
        }
        rest = stripped;
    }
    let rest = rest.trim_end_matches('/');
    (!rest.is_empty()).then(|| rest.to_string())
}
