//! Two-phase vault build.
//!
//! [`connect`] resolves references into a [`VaultGraph`] and a
//! [`VaultIndex`]. [`gather`] takes that result and adds plaintext
//! renderings of every note. Both run over an explicit [`VaultInput`] and
//! return owned snapshots; nothing is shared or mutated between runs.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use notegraph_core::frontmatter::{parse_frontmatter, split_frontmatter};
use notegraph_core::{
    CasePolicy, FileKind, FileMeta, FrontMatter, LoadFailure, NoteId, NotegraphError,
    RawReference, Result, VaultConfig,
};
use notegraph_parser::{extract, readable_text, source_text, GatherOptions};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::files::VaultFiles;
use crate::graph::{EdgeEnd, EdgeKind, GraphBuilder, VaultGraph};
use crate::indices::{AttachmentIndex, IndexAssembler, IndexOptions, NoteRecord, VaultIndex};
use crate::resolver::Resolver;

/// One loaded note: body text with front matter already split off.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteSource {
    pub rel_path: PathBuf,
    pub body: String,
    pub front_matter: FrontMatter,
    pub meta: Option<FileMeta>,
}

/// Everything [`connect`] reads: the file tables, loaded notes, attachment
/// metadata and the files that failed to load.
#[derive(Debug, Clone, Default)]
pub struct VaultInput {
    files: VaultFiles,
    notes: BTreeMap<NoteId, NoteSource>,
    file_meta: BTreeMap<NoteId, FileMeta>,
    failures: Vec<LoadFailure>,
}

impl VaultInput {
    #[must_use]
    pub fn new(files: VaultFiles) -> Self {
        Self {
            files,
            ..Self::default()
        }
    }

    /// Build an input from in-memory `(relative path, raw text)` pairs.
    ///
    /// Front matter is split off each text the same way the vault loader
    /// does it.
    ///
    /// # Errors
    ///
    /// Returns an error if a path is not classified as a note.
    pub fn from_texts<P, S>(
        notes: impl IntoIterator<Item = (P, S)>,
        config: &VaultConfig,
    ) -> Result<Self>
    where
        P: Into<PathBuf>,
        S: AsRef<str>,
    {
        let notes: Vec<(PathBuf, S)> = notes.into_iter().map(|(p, s)| (p.into(), s)).collect();
        let files = VaultFiles::from_paths(notes.iter().map(|(p, _)| p.clone()), config);
        let mut input = Self::new(files);
        for (rel_path, text) in &notes {
            let (front_matter, body) = split_note(rel_path, text.as_ref());
            input.add_note(rel_path, body, front_matter, None)?;
        }
        Ok(input)
    }

    /// Register the loaded content of an enumerated note.
    ///
    /// # Errors
    ///
    /// Returns [`NotegraphError::NotFound`] if `rel_path` was not
    /// enumerated as a note.
    pub fn add_note(
        &mut self,
        rel_path: impl AsRef<Path>,
        body: impl Into<String>,
        front_matter: FrontMatter,
        meta: Option<FileMeta>,
    ) -> Result<NoteId> {
        let rel_path = rel_path.as_ref();
        let entry = self
            .files
            .notes()
            .by_rel_path(rel_path)
            .ok_or_else(|| NotegraphError::NotFound(rel_path.display().to_string()))?;
        let id = entry.id.clone();
        self.notes.insert(
            id.clone(),
            NoteSource {
                rel_path: entry.rel_path.clone(),
                body: body.into(),
                front_matter,
                meta,
            },
        );
        Ok(id)
    }

    /// Attach file metadata to an enumerated media or canvas file.
    ///
    /// # Errors
    ///
    /// Returns [`NotegraphError::NotFound`] if the path was not enumerated.
    pub fn add_file_meta(&mut self, meta: FileMeta) -> Result<NoteId> {
        let entry = self
            .files
            .by_rel_path(&meta.rel_path)
            .ok_or_else(|| NotegraphError::NotFound(meta.rel_path.display().to_string()))?;
        let id = entry.id.clone();
        self.file_meta.insert(id.clone(), meta);
        Ok(id)
    }

    /// Record a file that was enumerated but could not be loaded.
    pub fn record_failure(&mut self, failure: LoadFailure) {
        self.failures.push(failure);
    }

    #[must_use]
    pub fn files(&self) -> &VaultFiles {
        &self.files
    }

    /// Loaded notes in identity order.
    pub fn notes(&self) -> impl Iterator<Item = (&NoteId, &NoteSource)> {
        self.notes.iter()
    }

    #[must_use]
    pub fn note(&self, id: &str) -> Option<&NoteSource> {
        self.notes.get(id)
    }

    #[must_use]
    pub fn note_count(&self) -> usize {
        self.notes.len()
    }

    #[must_use]
    pub fn file_meta(&self, id: &str) -> Option<&FileMeta> {
        self.file_meta.get(id)
    }

    #[must_use]
    pub fn failures(&self) -> &[LoadFailure] {
        &self.failures
    }
}

/// Split raw note text into front matter and body.
///
/// Malformed front matter is logged and replaced by an empty map; the
/// text after the closing delimiter is still used as the body.
pub fn split_note<'t>(rel_path: &Path, text: &'t str) -> (FrontMatter, &'t str) {
    match parse_frontmatter(text) {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!(path = %rel_path.display(), error = %err, "ignoring malformed front matter");
            (FrontMatter::new(), split_frontmatter(text).1)
        }
    }
}

/// Switches for [`connect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConnectOptions {
    pub case_policy: CasePolicy,
    /// Media and canvas files become graph nodes.
    pub attachments: bool,
    /// Tags become `#tag` pseudo-nodes with `Tag` edges.
    pub tag_nodes: bool,
    /// Tags index keeps nested tags; otherwise top-level only.
    pub show_nested_tags: bool,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self::from(&VaultConfig::default())
    }
}

impl From<&VaultConfig> for ConnectOptions {
    fn from(config: &VaultConfig) -> Self {
        Self {
            case_policy: config.case_policy,
            attachments: config.attachments,
            tag_nodes: config.tag_nodes,
            show_nested_tags: config.show_nested_tags,
        }
    }
}

/// Diagnostic counters for one [`connect`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BuildStats {
    pub notes: usize,
    pub nodes: usize,
    pub edges: usize,
    /// Every extracted reference, math included.
    pub references: usize,
    /// Edges added towards files that are not on disk.
    pub broken_references: usize,
    pub ambiguous_resolutions: usize,
    pub case_folded_resolutions: usize,
    pub load_failures: usize,
}

/// Phase one output.
#[derive(Debug, Clone)]
pub struct Connected {
    graph: VaultGraph,
    index: VaultIndex,
    stats: BuildStats,
    failures: Vec<LoadFailure>,
}

impl Connected {
    #[must_use]
    pub fn graph(&self) -> &VaultGraph {
        &self.graph
    }

    #[must_use]
    pub fn index(&self) -> &VaultIndex {
        &self.index
    }

    #[must_use]
    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }

    /// Files excluded from the build because they could not be loaded.
    #[must_use]
    pub fn failures(&self) -> &[LoadFailure] {
        &self.failures
    }
}

/// Resolve every note's references and build the graph and indices.
#[must_use]
pub fn connect(input: &VaultInput, options: &ConnectOptions) -> Connected {
    let files = input.files();
    let resolver = Resolver::new(files, options.case_policy);
    let mut builder = GraphBuilder::new();
    let mut attachments = AttachmentIndex::from_files(files);
    let mut stats = BuildStats::default();

    for failure in input.failures() {
        warn!(path = %failure.rel_path.display(), reason = %failure.reason, "note excluded from build");
    }

    for (id, note) in input.notes() {
        builder.add_note(id.clone(), note.meta.clone());
    }
    if options.attachments {
        for entry in files.media().entries().chain(files.canvas().entries()) {
            let meta = input.file_meta(entry.id.as_str()).cloned();
            builder.add_file(entry.id.clone(), entry.kind.into(), meta);
        }
    }

    let mut records = Vec::with_capacity(input.note_count());
    for (id, note) in input.notes() {
        let references: Vec<RawReference> = extract(&note.body).collect();
        debug!(note = %id, references = references.len(), "extracted references");
        stats.references += references.len();

        for reference in &references {
            let Some(kind) = EdgeKind::from_reference(reference.kind) else {
                continue;
            };
            if kind == EdgeKind::Tag || reference.external {
                continue;
            }
            let Some(resolution) = resolver.resolve_from(&note.rel_path, &reference.target) else {
                continue;
            };
            if resolution.ambiguous {
                stats.ambiguous_resolutions += 1;
                warn!(
                    note = %id,
                    target = %reference.target,
                    resolved = %resolution.id,
                    "ambiguous link target"
                );
            }
            if resolution.case_folded {
                stats.case_folded_resolutions += 1;
            }
            attachments.record(&resolution);
            if resolution.kind != FileKind::Note && !options.attachments {
                continue;
            }
            if !resolution.exists() {
                stats.broken_references += 1;
            }
            builder.add_edge(id, &EdgeEnd::from(&resolution), kind, reference.anchor.as_ref());
        }

        let record = NoteRecord {
            id: id.clone(),
            references,
            front_matter: note.front_matter.clone(),
        };
        if options.tag_nodes {
            for tag in record.all_tags() {
                builder.add_edge(id, &EdgeEnd::tag(&tag), EdgeKind::Tag, None);
            }
        }
        records.push(record);
    }

    let graph = builder.finish();
    let index = IndexAssembler::new(IndexOptions {
        show_nested_tags: options.show_nested_tags,
    })
    .assemble(&graph, &records, attachments);

    stats.notes = records.len();
    stats.nodes = graph.node_count();
    stats.edges = graph.edge_count();
    stats.load_failures = input.failures().len();
    info!(
        notes = stats.notes,
        nodes = stats.nodes,
        edges = stats.edges,
        broken = stats.broken_references,
        ambiguous = stats.ambiguous_resolutions,
        failures = stats.load_failures,
        "vault connected"
    );

    Connected {
        graph,
        index,
        stats,
        failures: input.failures().to_vec(),
    }
}

/// Phase two output: the phase one state plus plaintext renderings.
#[derive(Debug, Clone)]
pub struct Gathered {
    connected: Connected,
    source_text: BTreeMap<NoteId, String>,
    readable_text: BTreeMap<NoteId, String>,
}

impl Gathered {
    #[must_use]
    pub fn connected(&self) -> &Connected {
        &self.connected
    }

    #[must_use]
    pub fn into_connected(self) -> Connected {
        self.connected
    }

    /// Body with math and code removed and link syntax kept.
    ///
    /// # Errors
    ///
    /// Returns [`NotegraphError::NotFound`] if `id` was never seen.
    pub fn source_text(&self, id: &str) -> Result<&str> {
        self.text(&self.source_text, id)
    }

    /// Body reduced to display text.
    ///
    /// # Errors
    ///
    /// Returns [`NotegraphError::NotFound`] if `id` was never seen.
    pub fn readable_text(&self, id: &str) -> Result<&str> {
        self.text(&self.readable_text, id)
    }

    #[must_use]
    pub fn source_text_index(&self) -> &BTreeMap<NoteId, String> {
        &self.source_text
    }

    #[must_use]
    pub fn readable_text_index(&self) -> &BTreeMap<NoteId, String> {
        &self.readable_text
    }

    fn text<'a>(&self, map: &'a BTreeMap<NoteId, String>, id: &str) -> Result<&'a str> {
        self.connected.index.ensure_known(id)?;
        Ok(map.get(id).map_or("", String::as_str))
    }
}

/// Render every loaded note as source and readable plaintext.
#[must_use]
pub fn gather(connected: Connected, input: &VaultInput, options: &GatherOptions) -> Gathered {
    let mut source = BTreeMap::new();
    let mut readable = BTreeMap::new();
    for (id, note) in input.notes() {
        source.insert(id.clone(), source_text(&note.body, options));
        readable.insert(id.clone(), readable_text(&note.body, options));
    }
    debug!(notes = source.len(), "gathered plaintext");
    Gathered {
        connected,
        source_text: source,
        readable_text: readable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notegraph_core::NodeKind;

    fn input(notes: &[(&str, &str)]) -> VaultInput {
        VaultInput::from_texts(notes.iter().copied(), &VaultConfig::default()).unwrap()
    }

    #[test]
    fn links_become_edges_and_backlinks() {
        let input = input(&[("A.md", "See [[B]] and [[B#Intro|b]]."), ("B.md", "")]);
        let connected = connect(&input, &ConnectOptions::default());
        let out = connected.graph().out_edges("A");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].target.as_str(), "B");
        assert_eq!(out[0].attrs.count, 2);
        assert_eq!(connected.index().backlinks("B").unwrap().len(), 2);
        assert_eq!(connected.stats().references, 2);
    }

    #[test]
    fn relative_markdown_links_resolve_from_source() {
        let input = input(&[
            ("projects/Plan.md", "[detail](./notes/Detail%20Page.md) [web](https://x.org)"),
            ("projects/notes/Detail Page.md", ""),
        ]);
        let connected = connect(&input, &ConnectOptions::default());
        let out = connected.graph().out_edges("Plan");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].target.as_str(), "Detail Page");
        assert_eq!(out[0].attrs.kind, EdgeKind::MarkdownLink);
        assert_eq!(
            connected.index().md_links("Plan").unwrap(),
            ["./notes/Detail%20Page.md", "https://x.org"]
        );
    }

    #[test]
    fn attachments_stay_out_of_the_graph_by_default() {
        let config = VaultConfig::default();
        let files = VaultFiles::from_paths(
            ["A.md", "Egg.jpg", "Unused.png"].map(PathBuf::from),
            &config,
        );
        let mut input = VaultInput::new(files);
        input.add_note("A.md", "![[Egg.jpg]] ![[Gone.png]]", FrontMatter::new(), None).unwrap();

        let connected = connect(&input, &ConnectOptions::default());
        assert!(!connected.graph().contains("Egg.jpg"));
        assert!(connected.graph().node("A").unwrap().isolated);
        assert_eq!(connected.index().embedded_files("A").unwrap(), ["Egg.jpg", "Gone.png"]);
        let attachments = connected.index().attachments();
        assert_eq!(attachments.get("Egg.jpg").unwrap().backlinks, 1);
        assert_eq!(attachments.isolated(FileKind::Media), vec![&NoteId::new("Unused.png")]);

        let options = ConnectOptions {
            attachments: true,
            ..ConnectOptions::default()
        };
        let connected = connect(&input, &options);
        let graph = connected.graph();
        assert_eq!(graph.node("Egg.jpg").unwrap().kind, NodeKind::Media);
        assert!(graph.node("Unused.png").unwrap().isolated);
        assert_eq!(graph.nonexistent(NodeKind::Media), vec![&NoteId::new("Gone.png")]);
        assert_eq!(connected.index().backlinks("Egg.jpg").unwrap(), [NoteId::new("A")]);
    }

    #[test]
    fn tag_nodes_are_opt_in() {
        let input = input(&[("A.md", "---\ntags: extra\n---\n#music/pop")]);
        let plain = connect(&input, &ConnectOptions::default());
        assert_eq!(plain.graph().node_count(), 1);
        assert!(plain.graph().node("A").unwrap().isolated);

        let options = ConnectOptions {
            tag_nodes: true,
            ..ConnectOptions::default()
        };
        let tagged = connect(&input, &options);
        assert!(tagged.graph().contains("#music/pop"));
        assert!(tagged.graph().contains("#extra"));
        assert!(!tagged.graph().node("A").unwrap().isolated);
        assert!(tagged.index().backlinks("A").unwrap().is_empty());
    }

    #[test]
    fn case_folding_is_counted() {
        let input = input(&[("A.md", "[[isolated note]]"), ("Isolated Note.md", "")]);
        let options = ConnectOptions {
            case_policy: CasePolicy::InsensitiveFallback,
            ..ConnectOptions::default()
        };
        let connected = connect(&input, &options);
        assert_eq!(connected.stats().case_folded_resolutions, 1);
        assert!(connected.graph().node("Isolated Note").unwrap().exists);
    }

    #[test]
    fn load_failures_are_carried_through() {
        let config = VaultConfig::default();
        let files = VaultFiles::from_paths(["A.md", "Bad.md"].map(PathBuf::from), &config);
        let mut input = VaultInput::new(files);
        input.add_note("A.md", "[[Bad]]", FrontMatter::new(), None).unwrap();
        input.record_failure(LoadFailure {
            rel_path: PathBuf::from("Bad.md"),
            reason: "invalid UTF-8".into(),
        });

        let connected = connect(&input, &ConnectOptions::default());
        assert_eq!(connected.stats().notes, 1);
        assert_eq!(connected.stats().load_failures, 1);
        assert_eq!(connected.failures()[0].rel_path, PathBuf::from("Bad.md"));
        let bad = connected.graph().node("Bad").unwrap();
        assert!(bad.exists);
        assert!(bad.meta.is_none());
    }

    #[test]
    fn unknown_paths_are_rejected() {
        let mut input = input(&[("A.md", "")]);
        let err = input
            .add_note("Elsewhere.md", "", FrontMatter::new(), None)
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn malformed_front_matter_falls_back_to_empty() {
        let (front_matter, body) = split_note(Path::new("A.md"), "---\n: [\n---\nbody");
        assert!(front_matter.is_empty());
        assert_eq!(body, "body");
    }

    #[test]
    fn gather_renders_loaded_notes() {
        let input = input(&[("A.md", "# Title\n\nSee [[B|the b note]] and $x_1$.\n"), ("B.md", "")]);
        let gathered = gather(
            connect(&input, &ConnectOptions::default()),
            &input,
            &GatherOptions::default(),
        );
        let readable = gathered.readable_text("A").unwrap();
        assert!(readable.contains("the b note"));
        assert!(!readable.contains("x_1"));
        assert!(gathered.source_text("A").unwrap().contains("[[B|the b note]]"));
        assert_eq!(gathered.readable_text("B").unwrap(), "");
        assert!(gathered.readable_text("Ghost").unwrap_err().is_not_found());
        assert_eq!(gathered.connected().stats().notes, 2);
    }

    #[test]
    fn snapshots_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Connected>();
        assert_send_sync::<Gathered>();
        assert_send_sync::<VaultInput>();
    }
}
