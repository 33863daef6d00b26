//! # notegraph-index
//!
//! Turns loaded notes into a link graph and lookup indices.
//!
//! - [`files`]: immutable per-category tables of enumerated files
//! - [`resolver`]: link target to canonical [`NoteId`](notegraph_core::NoteId)
//! - [`graph`]: the petgraph-backed [`VaultGraph`]
//! - [`indices`]: backlinks, per-kind link lists, tags, math, front matter
//! - [`pipeline`]: the two-phase [`connect`] / [`gather`] build

pub mod files;
pub mod graph;
pub mod indices;
pub mod pipeline;
pub mod resolver;

pub use files::{FileEntry, FileTable, VaultFiles};
pub use graph::{EdgeAttrs, EdgeEnd, EdgeKind, EdgeView, GraphBuilder, NodeAttrs, VaultGraph};
pub use indices::{
    AttachmentIndex, AttachmentInfo, IndexAssembler, IndexOptions, NoteRecord, VaultIndex,
};
pub use pipeline::{
    connect, gather, split_note, BuildStats, ConnectOptions, Connected, Gathered, NoteSource,
    VaultInput,
};
pub use resolver::{Resolution, Resolver};
