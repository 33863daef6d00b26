//! # notegraph-core
//!
//! Core types shared by every notegraph crate:
//! - [`NoteId`], [`FileKind`], [`NodeKind`], [`FileMeta`]: vault entry identities
//! - [`RawReference`], [`ReferenceKind`], [`Anchor`]: unresolved references
//! - [`VaultConfig`]: TOML-backed vault configuration
//! - Error hierarchy ([`NotegraphError`])
//! - Front matter parsing ([`frontmatter`])

pub mod config;
pub mod error;
pub mod frontmatter;
pub mod note;
pub mod reference;

pub use config::{CasePolicy, GatherConfig, VaultConfig};
pub use error::{NotegraphError, Result};
pub use frontmatter::FrontMatter;
pub use note::{FileKind, FileMeta, LoadFailure, NodeKind, NoteId};
pub use reference::{Anchor, RawReference, ReferenceKind};
