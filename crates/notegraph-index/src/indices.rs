//! Lookup indices derived from the finished graph and the per-note
//! reference lists.
//!
//! Every index is available whole (`*_index()`) and per note. Per-note
//! accessors return an empty value for a known note with nothing of that
//! kind and [`NotegraphError::NotFound`] for an identity the run never saw.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use notegraph_core::frontmatter::frontmatter_tags;
use notegraph_core::{
    FileKind, FrontMatter, NodeKind, NoteId, NotegraphError, RawReference, ReferenceKind, Result,
};
use notegraph_parser::{normalize_tag, tag_ancestors, top_level};
use serde::Serialize;

use crate::files::VaultFiles;
use crate::graph::VaultGraph;
use crate::resolver::Resolution;

static EMPTY_FRONT_MATTER: FrontMatter = FrontMatter::new();
static EMPTY_TAGS: BTreeSet<String> = BTreeSet::new();

/// Everything the assembler needs to know about one loaded note.
#[derive(Debug, Clone)]
pub struct NoteRecord {
    pub id: NoteId,
    pub references: Vec<RawReference>,
    pub front_matter: FrontMatter,
}

impl NoteRecord {
    /// Tags in order: body tags first, then front-matter tags.
    pub fn all_tags(&self) -> Vec<String> {
        let body = self
            .references
            .iter()
            .filter(|r| r.kind == ReferenceKind::Tag)
            .map(|r| r.target.clone());
        let declared = frontmatter_tags(&self.front_matter)
            .into_iter()
            .filter_map(|tag| normalize_tag(&tag));
        body.chain(declared).collect()
    }

    fn targets(&self, kind: ReferenceKind) -> Vec<String> {
        self.references
            .iter()
            .filter(|r| r.kind == kind)
            .map(|r| r.target.clone())
            .collect()
    }
}

/// A media or canvas file seen on disk or as a link target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachmentInfo {
    pub kind: FileKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rel_path: Option<PathBuf>,
    /// Link and embed occurrences resolving to this file.
    pub backlinks: usize,
}

impl AttachmentInfo {
    #[must_use]
    pub fn exists(&self) -> bool {
        self.rel_path.is_some()
    }
}

/// Media and canvas files with their backlink counts, independent of
/// whether attachments are graph nodes.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AttachmentIndex {
    files: BTreeMap<NoteId, AttachmentInfo>,
}

impl AttachmentIndex {
    /// Start with every enumerated media and canvas file at zero backlinks.
    #[must_use]
    pub fn from_files(files: &VaultFiles) -> Self {
        let entries = files.media().entries().chain(files.canvas().entries());
        let files = entries
            .map(|entry| {
                let info = AttachmentInfo {
                    kind: entry.kind,
                    rel_path: Some(entry.rel_path.clone()),
                    backlinks: 0,
                };
                (entry.id.clone(), info)
            })
            .collect();
        Self { files }
    }

    /// Count one resolved reference. Note targets are ignored.
    pub fn record(&mut self, resolution: &Resolution) {
        if resolution.kind == FileKind::Note {
            return;
        }
        let info = self
            .files
            .entry(resolution.id.clone())
            .or_insert_with(|| AttachmentInfo {
                kind: resolution.kind,
                rel_path: resolution.rel_path.clone(),
                backlinks: 0,
            });
        info.backlinks += 1;
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&AttachmentInfo> {
        self.files.get(id)
    }

    /// All files of `kind`, in identity order.
    pub fn files(&self, kind: FileKind) -> impl Iterator<Item = (&NoteId, &AttachmentInfo)> {
        self.files.iter().filter(move |(_, info)| info.kind == kind)
    }

    #[must_use]
    pub fn existing(&self, kind: FileKind) -> Vec<&NoteId> {
        self.select(kind, AttachmentInfo::exists)
    }

    /// Linked or embedded but not on disk.
    #[must_use]
    pub fn nonexistent(&self, kind: FileKind) -> Vec<&NoteId> {
        self.select(kind, |info| !info.exists())
    }

    /// On disk but never linked or embedded.
    #[must_use]
    pub fn isolated(&self, kind: FileKind) -> Vec<&NoteId> {
        self.select(kind, |info| info.exists() && info.backlinks == 0)
    }

    fn select(&self, kind: FileKind, keep: impl Fn(&AttachmentInfo) -> bool) -> Vec<&NoteId> {
        self.files(kind)
            .filter(|(_, info)| keep(info))
            .map(|(id, _)| id)
            .collect()
    }
}

/// Tag display switch for [`IndexAssembler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexOptions {
    pub show_nested_tags: bool,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            show_nested_tags: true,
        }
    }
}

/// Builds a [`VaultIndex`] from a finished graph and per-note records.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexAssembler {
    options: IndexOptions,
}

impl IndexAssembler {
    #[must_use]
    pub fn new(options: IndexOptions) -> Self {
        Self { options }
    }

    #[must_use]
    pub fn assemble(
        &self,
        graph: &VaultGraph,
        records: &[NoteRecord],
        attachments: AttachmentIndex,
    ) -> VaultIndex {
        let mut index = VaultIndex {
            attachments,
            ..VaultIndex::default()
        };

        for node in graph.nodes().filter(|node| node.kind != NodeKind::Tag) {
            index.known.insert(node.id.clone());
            let mut sources: Vec<NoteId> = graph
                .in_edges(node.id.as_str())
                .into_iter()
                .filter(|edge| edge.attrs.kind.is_navigable())
                .flat_map(|edge| std::iter::repeat(edge.source.clone()).take(edge.attrs.count))
                .collect();
            sources.sort();
            index.backlinks.insert(node.id.clone(), sources);
        }
        index.known.extend(index.attachments.files.keys().cloned());

        for record in records {
            let id = record.id.clone();
            index.known.insert(id.clone());
            index.backlinks.entry(id.clone()).or_default();

            let wikilinks = record.targets(ReferenceKind::Wikilink);
            index.unique_wikilinks.insert(id.clone(), unique(&wikilinks));
            index.wikilinks.insert(id.clone(), wikilinks);

            index
                .embedded_files
                .insert(id.clone(), record.targets(ReferenceKind::Embed));

            let md_links: Vec<String> = record
                .references
                .iter()
                .filter(|r| r.kind == ReferenceKind::MarkdownLink)
                .map(|r| r.raw.clone())
                .collect();
            index.unique_md_links.insert(id.clone(), unique(&md_links));
            index.md_links.insert(id.clone(), md_links);

            let tags = record.all_tags();
            let rollup: BTreeSet<String> = tags.iter().flat_map(|t| tag_ancestors(t)).collect();
            let shown: Vec<String> = if self.options.show_nested_tags {
                tags
            } else {
                tags.iter().map(|t| top_level(t).to_string()).collect()
            };
            index.tags.insert(id.clone(), shown);
            index.tag_rollup.insert(id.clone(), rollup);

            index.math.insert(id.clone(), record.targets(ReferenceKind::Math));
            index.front_matter.insert(id, record.front_matter.clone());
        }

        index
    }
}

/// Read-only lookup indices for one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct VaultIndex {
    #[serde(skip)]
    known: BTreeSet<NoteId>,
    backlinks: BTreeMap<NoteId, Vec<NoteId>>,
    wikilinks: BTreeMap<NoteId, Vec<String>>,
    unique_wikilinks: BTreeMap<NoteId, Vec<String>>,
    embedded_files: BTreeMap<NoteId, Vec<String>>,
    md_links: BTreeMap<NoteId, Vec<String>>,
    unique_md_links: BTreeMap<NoteId, Vec<String>>,
    tags: BTreeMap<NoteId, Vec<String>>,
    tag_rollup: BTreeMap<NoteId, BTreeSet<String>>,
    math: BTreeMap<NoteId, Vec<String>>,
    front_matter: BTreeMap<NoteId, FrontMatter>,
    attachments: AttachmentIndex,
}

impl VaultIndex {
    /// Whether `id` is a loaded note, a graph node or an attachment.
    #[must_use]
    pub fn is_known(&self, id: &str) -> bool {
        self.known.contains(id)
    }

    /// # Errors
    ///
    /// Returns [`NotegraphError::NotFound`] if `id` was never seen.
    pub fn ensure_known(&self, id: &str) -> Result<()> {
        if self.is_known(id) {
            Ok(())
        } else {
            Err(NotegraphError::NotFound(id.to_string()))
        }
    }

    /// Notes linking to `id`, one entry per link occurrence, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`NotegraphError::NotFound`] if `id` was never seen.
    pub fn backlinks(&self, id: &str) -> Result<&[NoteId]> {
        self.list(&self.backlinks, id)
    }

    /// # Errors
    ///
    /// Returns [`NotegraphError::NotFound`] if `id` was never seen.
    pub fn wikilinks(&self, id: &str) -> Result<&[String]> {
        self.list(&self.wikilinks, id)
    }

    /// # Errors
    ///
    /// Returns [`NotegraphError::NotFound`] if `id` was never seen.
    pub fn unique_wikilinks(&self, id: &str) -> Result<&[String]> {
        self.list(&self.unique_wikilinks, id)
    }

    /// # Errors
    ///
    /// Returns [`NotegraphError::NotFound`] if `id` was never seen.
    pub fn embedded_files(&self, id: &str) -> Result<&[String]> {
        self.list(&self.embedded_files, id)
    }

    /// Markdown link destinations as written.
    ///
    /// # Errors
    ///
    /// Returns [`NotegraphError::NotFound`] if `id` was never seen.
    pub fn md_links(&self, id: &str) -> Result<&[String]> {
        self.list(&self.md_links, id)
    }

    /// # Errors
    ///
    /// Returns [`NotegraphError::NotFound`] if `id` was never seen.
    pub fn unique_md_links(&self, id: &str) -> Result<&[String]> {
        self.list(&self.unique_md_links, id)
    }

    /// # Errors
    ///
    /// Returns [`NotegraphError::NotFound`] if `id` was never seen.
    pub fn tags(&self, id: &str) -> Result<&[String]> {
        self.list(&self.tags, id)
    }

    /// Every tag of the note plus all of its ancestors.
    ///
    /// # Errors
    ///
    /// Returns [`NotegraphError::NotFound`] if `id` was never seen.
    pub fn tag_rollup(&self, id: &str) -> Result<&BTreeSet<String>> {
        self.ensure_known(id)?;
        Ok(self.tag_rollup.get(id).unwrap_or(&EMPTY_TAGS))
    }

    /// # Errors
    ///
    /// Returns [`NotegraphError::NotFound`] if `id` was never seen.
    pub fn math(&self, id: &str) -> Result<&[String]> {
        self.list(&self.math, id)
    }

    /// # Errors
    ///
    /// Returns [`NotegraphError::NotFound`] if `id` was never seen.
    pub fn front_matter(&self, id: &str) -> Result<&FrontMatter> {
        self.ensure_known(id)?;
        Ok(self.front_matter.get(id).unwrap_or(&EMPTY_FRONT_MATTER))
    }

    /// Backlink occurrences of `id` grouped by linking note.
    ///
    /// # Errors
    ///
    /// Returns [`NotegraphError::NotFound`] if `id` was never seen.
    pub fn backlink_counts(&self, id: &str) -> Result<BTreeMap<&NoteId, usize>> {
        Ok(counts(self.backlinks(id)?))
    }

    /// Wikilink occurrences from `id` grouped by target.
    ///
    /// # Errors
    ///
    /// Returns [`NotegraphError::NotFound`] if `id` was never seen.
    pub fn wikilink_counts(&self, id: &str) -> Result<BTreeMap<&String, usize>> {
        Ok(counts(self.wikilinks(id)?))
    }

    /// Notes carrying `tag` or any tag nested under it.
    #[must_use]
    pub fn notes_with_tag(&self, tag: &str) -> Vec<&NoteId> {
        let tag = tag.trim_start_matches('#');
        self.tag_rollup
            .iter()
            .filter(|(_, tags)| tags.contains(tag))
            .map(|(id, _)| id)
            .collect()
    }

    #[must_use]
    pub fn backlinks_index(&self) -> &BTreeMap<NoteId, Vec<NoteId>> {
        &self.backlinks
    }

    #[must_use]
    pub fn wikilinks_index(&self) -> &BTreeMap<NoteId, Vec<String>> {
        &self.wikilinks
    }

    #[must_use]
    pub fn unique_wikilinks_index(&self) -> &BTreeMap<NoteId, Vec<String>> {
        &self.unique_wikilinks
    }

    #[must_use]
    pub fn embedded_files_index(&self) -> &BTreeMap<NoteId, Vec<String>> {
        &self.embedded_files
    }

    #[must_use]
    pub fn md_links_index(&self) -> &BTreeMap<NoteId, Vec<String>> {
        &self.md_links
    }

    #[must_use]
    pub fn unique_md_links_index(&self) -> &BTreeMap<NoteId, Vec<String>> {
        &self.unique_md_links
    }

    #[must_use]
    pub fn tags_index(&self) -> &BTreeMap<NoteId, Vec<String>> {
        &self.tags
    }

    #[must_use]
    pub fn tag_rollup_index(&self) -> &BTreeMap<NoteId, BTreeSet<String>> {
        &self.tag_rollup
    }

    #[must_use]
    pub fn math_index(&self) -> &BTreeMap<NoteId, Vec<String>> {
        &self.math
    }

    #[must_use]
    pub fn front_matter_index(&self) -> &BTreeMap<NoteId, FrontMatter> {
        &self.front_matter
    }

    #[must_use]
    pub fn attachments(&self) -> &AttachmentIndex {
        &self.attachments
    }

    fn list<'a, T>(&self, map: &'a BTreeMap<NoteId, Vec<T>>, id: &str) -> Result<&'a [T]> {
        self.ensure_known(id)?;
        Ok(map.get(id).map_or(&[][..], Vec::as_slice))
    }
}

fn unique(items: &[String]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    items
        .iter()
        .filter(|item| seen.insert(item.as_str()))
        .cloned()
        .collect()
}

fn counts<T: Ord>(items: &[T]) -> BTreeMap<&T, usize> {
    let mut counts = BTreeMap::new();
    for item in items {
        *counts.entry(item).or_insert(0) += 1;
    }
    counts
}
