//! # notegraph-query
//!
//! Read-side views over a connected vault:
//! - per-file metadata tables for notes, media and canvas files
//! - graph export as DOT, Mermaid or JSON, whole or around one note
//! - result formatting as JSON, table or Markdown

pub mod formatter;
pub mod graph;
pub mod metadata;

pub use formatter::{format_results, OutputFormat, QueryResult, ResultRow};
pub use graph::{GraphEdge, GraphExport, GraphNode};
pub use metadata::{all_file_metadata, file_metadata, note_metadata, FileMetadata, NoteMetadata};
