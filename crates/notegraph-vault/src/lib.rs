//! # notegraph-vault
//!
//! File system side of notegraph: finds note, media and canvas files under
//! a vault root, loads them, and feeds them to the
//! [`connect`](notegraph_index::connect) / [`gather`](notegraph_index::gather)
//! pipeline.
//!
//! Files that cannot be read or decoded are excluded and recorded as
//! [`LoadFailure`]s; they never abort the run.

pub mod canvas;
pub mod discover;
pub mod loader;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use notegraph_core::{FileKind, LoadFailure, NoteId, NotegraphError, Result, VaultConfig};
use notegraph_index::{connect, gather, ConnectOptions, Connected, Gathered, VaultFiles, VaultInput};
use notegraph_parser::GatherOptions;
use tracing::{info, warn};

pub use canvas::{CanvasDocument, CanvasEdge, CanvasNode, CanvasNodeKind};
pub use discover::discover;
pub use loader::{content_hash, file_meta, load_note, read_text, LoadedNote};

/// A vault loaded into memory for one analysis run.
#[derive(Debug, Clone)]
pub struct Vault {
    root: PathBuf,
    config: VaultConfig,
    input: VaultInput,
    canvases: BTreeMap<NoteId, CanvasDocument>,
}

impl Vault {
    /// Open the vault at `root` using `<root>/.notegraph.toml` if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the root cannot
    /// be read.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let config = VaultConfig::load_or_default(&root)?;
        Self::open_with(root, config)
    }

    /// Enumerate and load every tracked file under `root`.
    ///
    /// # Errors
    ///
    /// Returns [`NotegraphError::Io`] if the root cannot be read. Failures
    /// on individual files are recorded, not returned.
    pub fn open_with(root: impl Into<PathBuf>, config: VaultConfig) -> Result<Self> {
        let root = root.into();
        let paths = discover(&root, &config)?;
        let files = VaultFiles::from_paths(paths, &config);

        let entries: Vec<(FileKind, PathBuf)> = [FileKind::Note, FileKind::Media, FileKind::Canvas]
            .into_iter()
            .flat_map(|kind| files.table(kind).entries())
            .map(|entry| (entry.kind, entry.rel_path.clone()))
            .collect();

        let mut input = VaultInput::new(files);
        let mut canvases = BTreeMap::new();
        for (kind, rel_path) in entries {
            let loaded = match kind {
                FileKind::Note => load_into(&root, &rel_path, &mut input),
                FileKind::Media => {
                    file_meta(&root, &rel_path).and_then(|meta| input.add_file_meta(meta).map(drop))
                }
                FileKind::Canvas => load_canvas(&root, &rel_path, &mut input).map(|(id, doc)| {
                    canvases.insert(id, doc);
                }),
            };
            if let Err(err) = loaded {
                warn!(path = %rel_path.display(), error = %err, "failed to load vault file");
                input.record_failure(LoadFailure {
                    rel_path,
                    reason: failure_reason(err),
                });
            }
        }

        info!(
            root = %root.display(),
            notes = input.note_count(),
            canvases = canvases.len(),
            failures = input.failures().len(),
            "vault loaded"
        );
        Ok(Self {
            root,
            config,
            input,
            canvases,
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    #[must_use]
    pub fn input(&self) -> &VaultInput {
        &self.input
    }

    #[must_use]
    pub fn failures(&self) -> &[LoadFailure] {
        self.input.failures()
    }

    /// Phase one with the options from the vault configuration.
    #[must_use]
    pub fn connect(&self) -> Connected {
        self.connect_with(&ConnectOptions::from(&self.config))
    }

    #[must_use]
    pub fn connect_with(&self, options: &ConnectOptions) -> Connected {
        connect(&self.input, options)
    }

    /// Phase two with the `[gather]` options from the vault configuration.
    #[must_use]
    pub fn gather(&self, connected: Connected) -> Gathered {
        gather(connected, &self.input, &GatherOptions::from(&self.config.gather))
    }

    /// Parsed canvas files in identity order.
    #[must_use]
    pub fn canvases(&self) -> &BTreeMap<NoteId, CanvasDocument> {
        &self.canvases
    }

    /// # Errors
    ///
    /// Returns [`NotegraphError::NotFound`] if no canvas with this identity
    /// was loaded.
    pub fn canvas(&self, id: &str) -> Result<&CanvasDocument> {
        self.canvases
            .get(id)
            .ok_or_else(|| NotegraphError::NotFound(id.to_string()))
    }
}

fn load_into(root: &Path, rel_path: &Path, input: &mut VaultInput) -> Result<()> {
    let note = load_note(root, rel_path)?;
    input.add_note(rel_path, note.body, note.front_matter, Some(note.meta))?;
    Ok(())
}

fn load_canvas(
    root: &Path,
    rel_path: &Path,
    input: &mut VaultInput,
) -> Result<(NoteId, CanvasDocument)> {
    let (text, meta) = read_text(root, rel_path)?;
    let document = CanvasDocument::parse(&text)?;
    let id = input.add_file_meta(meta)?;
    Ok((id, document))
}

fn failure_reason(err: NotegraphError) -> String {
    match err {
        NotegraphError::Load { reason, .. } => reason,
        other => other.to_string(),
    }
}
