//! Per-file metadata tables for notes, media and canvas files.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use notegraph_core::{FileKind, NodeKind};
use notegraph_index::{Connected, VaultFiles};
use serde::Serialize;
use serde_json::json;

use crate::formatter::QueryResult;

/// One note (loaded or only linked to).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteMetadata {
    pub note: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rel_path: Option<PathBuf>,
    pub exists: bool,
    pub n_backlinks: usize,
    pub n_wikilinks: usize,
    pub n_tags: usize,
    pub n_embedded_files: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
}

/// One media or canvas file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileMetadata {
    pub file: String,
    pub kind: FileKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rel_path: Option<PathBuf>,
    pub exists: bool,
    pub n_backlinks: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
}

/// Metadata for every note node of the graph, in identity order.
///
/// `rel_path` comes from the note's file metadata, or from the enumerated
/// file table when the note was loaded without any.
#[must_use]
pub fn note_metadata(connected: &Connected, files: &VaultFiles) -> Vec<NoteMetadata> {
    let index = connected.index();
    let count = |list: notegraph_core::Result<&[String]>| list.map_or(0, <[String]>::len);
    connected
        .graph()
        .nodes()
        .filter(|node| node.kind == NodeKind::Note)
        .map(|node| {
            let id = node.id.as_str();
            NoteMetadata {
                note: id.to_string(),
                rel_path: node
                    .meta
                    .as_ref()
                    .map(|m| m.rel_path.clone())
                    .or_else(|| files.notes().get(id).map(|entry| entry.rel_path.clone())),
                exists: node.exists,
                n_backlinks: index.backlinks(id).map_or(0, <[_]>::len),
                n_wikilinks: count(index.wikilinks(id)),
                n_tags: count(index.tags(id)),
                n_embedded_files: count(index.embedded_files(id)),
                modified: node.meta.as_ref().and_then(|m| m.modified),
            }
        })
        .collect()
}

/// Metadata for media or canvas files, on disk or linked.
///
/// Files that are graph nodes report their on-disk metadata.
#[must_use]
pub fn file_metadata(connected: &Connected, kind: FileKind) -> Vec<FileMetadata> {
    connected
        .index()
        .attachments()
        .files(kind)
        .map(|(id, info)| {
            let meta = connected.graph().node(id.as_str()).and_then(|n| n.meta.as_ref());
            FileMetadata {
                file: id.to_string(),
                kind: info.kind,
                rel_path: info.rel_path.clone(),
                exists: info.exists(),
                n_backlinks: info.backlinks,
                modified: meta.and_then(|m| m.modified),
            }
        })
        .collect()
}

/// Notes, media and canvas files in one table.
#[must_use]
pub fn all_file_metadata(connected: &Connected, files: &VaultFiles) -> Vec<FileMetadata> {
    let notes = note_metadata(connected, files).into_iter().map(|note| FileMetadata {
        file: note.note,
        kind: FileKind::Note,
        rel_path: note.rel_path,
        exists: note.exists,
        n_backlinks: note.n_backlinks,
        modified: note.modified,
    });
    notes
        .chain(file_metadata(connected, FileKind::Media))
        .chain(file_metadata(connected, FileKind::Canvas))
        .collect()
}

impl From<&[NoteMetadata]> for QueryResult {
    fn from(rows: &[NoteMetadata]) -> Self {
        let mut result = QueryResult::new([
            "note",
            "rel_path",
            "exists",
            "n_backlinks",
            "n_wikilinks",
            "n_tags",
            "n_embedded_files",
            "modified",
        ]);
        for row in rows {
            result.push([
                json!(row.note),
                json!(row.rel_path.as_ref().map(|p| p.display().to_string())),
                json!(row.exists),
                json!(row.n_backlinks),
                json!(row.n_wikilinks),
                json!(row.n_tags),
                json!(row.n_embedded_files),
                json!(row.modified.map(|t| t.to_rfc3339())),
            ]);
        }
        result
    }
}

impl From<&[FileMetadata]> for QueryResult {
    fn from(rows: &[FileMetadata]) -> Self {
        let mut result =
            QueryResult::new(["file", "kind", "rel_path", "exists", "n_backlinks", "modified"]);
        for row in rows {
            result.push([
                json!(row.file),
                json!(row.kind.as_str()),
                json!(row.rel_path.as_ref().map(|p| p.display().to_string())),
                json!(row.exists),
                json!(row.n_backlinks),
                json!(row.modified.map(|t| t.to_rfc3339())),
            ]);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notegraph_core::{FileMeta, FrontMatter, VaultConfig};
    use notegraph_index::{connect, ConnectOptions, VaultFiles, VaultInput};

    fn input() -> VaultInput {
        let config = VaultConfig::default();
        let files = VaultFiles::from_paths(
            ["A.md", "sub/B.md", "Egg.jpg", "Unused.png", "Board.canvas"].map(PathBuf::from),
            &config,
        );
        let mut input = VaultInput::new(files);
        let mut meta = FileMeta::new("A.md");
        meta.modified = Some(DateTime::<Utc>::from(std::time::UNIX_EPOCH));
        input
            .add_note("A.md", "[[B]] [[B]] [[C]] ![[Egg.jpg]] #tag", FrontMatter::new(), Some(meta))
            .unwrap();
        input.add_note("sub/B.md", "", FrontMatter::new(), None).unwrap();
        input
    }

    fn connected(input: &VaultInput) -> Connected {
        connect(input, &ConnectOptions::default())
    }

    #[test]
    fn note_rows_cover_linked_and_missing_notes() {
        let input = input();
        let rows = note_metadata(&connected(&input), input.files());
        let names: Vec<&str> = rows.iter().map(|r| r.note.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);

        let a = &rows[0];
        assert_eq!(a.n_wikilinks, 3);
        assert_eq!(a.n_embedded_files, 1);
        assert_eq!(a.n_tags, 1);
        assert_eq!(a.rel_path, Some(PathBuf::from("A.md")));
        assert!(a.modified.is_some());

        assert_eq!(rows[1].n_backlinks, 2);
        assert!(!rows[2].exists);
        assert_eq!(rows[2].rel_path, None);
        assert_eq!(rows[2].n_wikilinks, 0);
    }

    #[test]
    fn rel_path_falls_back_to_file_table() {
        let input = input();
        let rows = note_metadata(&connected(&input), input.files());
        assert_eq!(rows[1].note, "B");
        assert_eq!(rows[1].rel_path, Some(PathBuf::from("sub/B.md")));
        assert_eq!(rows[1].modified, None);

        let all = all_file_metadata(&connected(&input), input.files());
        assert_eq!(all[1].rel_path, Some(PathBuf::from("sub/B.md")));
    }

    #[test]
    fn media_and_canvas_rows() {
        let input = input();
        let connected = connected(&input);
        let media = file_metadata(&connected, FileKind::Media);
        assert_eq!(media.len(), 2);
        assert_eq!(media[0].file, "Egg.jpg");
        assert_eq!(media[0].n_backlinks, 1);
        assert_eq!(media[1].n_backlinks, 0);

        let canvas = file_metadata(&connected, FileKind::Canvas);
        assert_eq!(canvas.len(), 1);
        assert!(canvas[0].exists);

        assert_eq!(all_file_metadata(&connected, input.files()).len(), 6);
    }

    #[test]
    fn rows_convert_to_results() {
        let input = input();
        let rows = note_metadata(&connected(&input), input.files());
        let result = QueryResult::from(rows.as_slice());
        assert_eq!(result.total, 3);
        assert_eq!(result.columns[3], "n_backlinks");
        assert_eq!(result.rows[0].fields["modified"], "1970-01-01T00:00:00+00:00");
        assert_eq!(result.rows[2].fields["rel_path"], serde_json::Value::Null);
    }
}
