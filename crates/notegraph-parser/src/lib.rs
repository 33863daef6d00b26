//! # notegraph-parser
//!
//! Reference extraction and plaintext rendering for markdown notes.
//!
//! [`extract`] yields wikilinks, embeds, markdown links, tags and math
//! spans in order of appearance. Code and math regions are located first
//! and masked, so nothing inside them is read as a link, a tag or markdown
//! emphasis.

pub mod plaintext;
pub mod regions;
pub mod scanner;
pub mod tags;
pub mod wikilink;

pub use plaintext::{readable_text, source_text, GatherOptions};
pub use scanner::{extract, References};
pub use tags::{normalize_tag, tag_ancestors, top_level};
pub use wikilink::{is_external_target, split_wikilink_inner, WikiTarget};
