//! notegraph CLI: link graph and indices for a markdown note vault.
//!
//! Commands: stats, notes, files, backlinks, links, tags, tagged, math,
//! front-matter, text, graph, broken, isolated, completions

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use notegraph_core::{CasePolicy, FileKind, NodeKind, VaultConfig};
use notegraph_index::Connected;
use notegraph_query::{
    all_file_metadata, file_metadata, format_results, note_metadata, GraphExport, OutputFormat,
    QueryResult,
};
use notegraph_vault::Vault;
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "notegraph")]
#[command(version)]
#[command(about = "Link graph and indices for markdown note vaults")]
struct Cli {
    /// Vault root directory
    #[arg(long, global = true, default_value = ".")]
    vault: PathBuf,

    /// Configuration file (defaults to <vault>/.notegraph.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Add media and canvas files to the graph
    #[arg(long, global = true)]
    attachments: bool,

    /// Add a node per tag with note-to-tag edges
    #[arg(long, global = true)]
    tag_nodes: bool,

    /// Fall back to case-insensitive name matching
    #[arg(long, global = true)]
    ignore_case: bool,

    /// Output format
    #[arg(long, global = true, value_enum)]
    format: Option<Format>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Table,
    Markdown,
    Json,
    Dot,
    Mermaid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum KindArg {
    Note,
    Media,
    Canvas,
}

#[derive(Subcommand)]
enum Commands {
    /// Build counters and load failures
    Stats,
    /// Metadata for every note, including linked but missing ones
    Notes,
    /// Metadata for notes, media and canvas files
    Files {
        #[arg(long, value_enum)]
        kind: Option<KindArg>,
    },
    /// Notes linking to a note
    Backlinks {
        note: String,
        /// One row per linking note with its link count
        #[arg(long)]
        counts: bool,
    },
    /// Outgoing wikilinks, embeds and markdown links of a note
    Links {
        note: String,
        /// Drop repeated targets
        #[arg(long)]
        unique: bool,
    },
    /// Tags of a note
    Tags {
        note: String,
        /// Include every ancestor of nested tags
        #[arg(long)]
        rollup: bool,
    },
    /// Notes carrying a tag or one of its descendants
    Tagged { tag: String },
    /// Math expressions of a note
    Math { note: String },
    /// Front matter of a note
    FrontMatter { note: String },
    /// Plaintext of a note
    Text {
        note: String,
        /// Replace links by their display text and drop markup
        #[arg(long)]
        readable: bool,
    },
    /// Export the graph, whole or around one note
    Graph {
        #[arg(long)]
        center: Option<String>,
        #[arg(long, default_value_t = 1)]
        depth: u32,
    },
    /// Link targets that do not exist on disk
    Broken,
    /// Nodes with no incoming or outgoing links
    Isolated,
    /// Print shell completions
    Completions { shell: Shell },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        })
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn run(cli: Cli) -> Result<()> {
    if let Commands::Completions { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "notegraph", &mut io::stdout());
        return Ok(());
    }

    let config = load_config(&cli)?;
    let vault = Vault::open_with(cli.vault.clone(), config)
        .with_context(|| format!("failed to open vault {}", cli.vault.display()))?;
    let connected = vault.connect();
    let files = vault.input().files();
    let index = connected.index();
    let format = cli.format;

    match cli.command {
        Commands::Stats => cmd_stats(&connected, format),
        Commands::Notes => emit(QueryResult::from(note_metadata(&connected, files).as_slice()), format),
        Commands::Files { kind } => {
            let rows = match kind {
                None => all_file_metadata(&connected, files),
                Some(KindArg::Note) => all_file_metadata(&connected, files)
                    .into_iter()
                    .filter(|row| row.kind == FileKind::Note)
                    .collect(),
                Some(KindArg::Media) => file_metadata(&connected, FileKind::Media),
                Some(KindArg::Canvas) => file_metadata(&connected, FileKind::Canvas),
            };
            emit(QueryResult::from(rows.as_slice()), format)
        }
        Commands::Backlinks { note, counts } => {
            let result = if counts {
                let mut result = QueryResult::new(["note", "count"]);
                let counts = index.backlink_counts(&note).with_context(|| missing(&note))?;
                for (source, count) in counts {
                    result.push([json!(source), json!(count)]);
                }
                result
            } else {
                let sources = index.backlinks(&note).with_context(|| missing(&note))?;
                QueryResult::list("note", sources.iter().map(|id| id.as_str()))
            };
            emit(result, format)
        }
        Commands::Links { note, unique } => {
            let (wikilinks, md_links) = if unique {
                (index.unique_wikilinks(&note), index.unique_md_links(&note))
            } else {
                (index.wikilinks(&note), index.md_links(&note))
            };
            let mut result = QueryResult::new(["kind", "target"]);
            let groups = [
                ("wikilink", wikilinks.with_context(|| missing(&note))?),
                ("embed", index.embedded_files(&note).with_context(|| missing(&note))?),
                ("markdown", md_links.with_context(|| missing(&note))?),
            ];
            for (kind, targets) in groups {
                for target in targets {
                    result.push([json!(kind), json!(target)]);
                }
            }
            emit(result, format)
        }
        Commands::Tags { note, rollup } => {
            let tags: Vec<&str> = if rollup {
                let rollup = index.tag_rollup(&note).with_context(|| missing(&note))?;
                rollup.iter().map(String::as_str).collect()
            } else {
                let tags = index.tags(&note).with_context(|| missing(&note))?;
                tags.iter().map(String::as_str).collect()
            };
            emit(QueryResult::list("tag", tags), format)
        }
        Commands::Tagged { tag } => {
            let notes = index.notes_with_tag(&tag);
            emit(QueryResult::list("note", notes.into_iter().map(|id| id.as_str())), format)
        }
        Commands::Math { note } => {
            let math = index.math(&note).with_context(|| missing(&note))?;
            emit(QueryResult::list("math", math.iter().map(String::as_str)), format)
        }
        Commands::FrontMatter { note } => {
            let front_matter = index.front_matter(&note).with_context(|| missing(&note))?;
            if format == Some(Format::Json) {
                println!("{}", serde_json::to_string_pretty(front_matter)?);
                return Ok(());
            }
            let mut result = QueryResult::new(["key", "value"]);
            for (key, value) in front_matter {
                result.push([json!(key), value.clone()]);
            }
            emit(result, format)
        }
        Commands::Text { note, readable } => {
            let gathered = vault.gather(connected);
            let text = if readable {
                gathered.readable_text(&note)
            } else {
                gathered.source_text(&note)
            }
            .with_context(|| missing(&note))?;
            print!("{text}");
            if !text.is_empty() && !text.ends_with('\n') {
                println!();
            }
            Ok(())
        }
        Commands::Graph { center, depth } => {
            let export = match &center {
                Some(center) => GraphExport::neighborhood(connected.graph(), center, depth)
                    .with_context(|| missing(center))?,
                None => GraphExport::from_vault(connected.graph()),
            };
            let rendered = match format {
                None | Some(Format::Dot) => export.format_dot(),
                Some(Format::Mermaid) => export.format_mermaid(),
                Some(Format::Json) => export.format_json(),
                Some(other) => {
                    bail!("graph cannot be rendered as {other:?}; use dot, mermaid or json")
                }
            };
            print!("{rendered}");
            Ok(())
        }
        Commands::Broken => {
            let mut result = QueryResult::new(["file", "kind", "n_backlinks"]);
            let missing_nodes = connected
                .graph()
                .nodes()
                .filter(|n| !n.exists && n.kind != NodeKind::Tag);
            for node in missing_nodes {
                let backlinks = index.backlinks(node.id.as_str()).map_or(0, <[_]>::len);
                result.push([json!(node.id), json!(node.kind.as_str()), json!(backlinks)]);
            }
            emit(result, format)
        }
        Commands::Isolated => {
            let mut result = QueryResult::new(["file", "kind"]);
            let isolated = connected
                .graph()
                .nodes()
                .filter(|n| n.isolated && n.kind != NodeKind::Tag);
            for node in isolated {
                result.push([json!(node.id), json!(node.kind.as_str())]);
            }
            emit(result, format)
        }
        Commands::Completions { .. } => Ok(()),
    }
}

fn load_config(cli: &Cli) -> Result<VaultConfig> {
    let mut config = match &cli.config {
        Some(path) => VaultConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => VaultConfig::load_or_default(&cli.vault)
            .with_context(|| format!("failed to load config in {}", cli.vault.display()))?,
    };
    if cli.attachments {
        config.attachments = true;
    }
    if cli.tag_nodes {
        config.tag_nodes = true;
    }
    if cli.ignore_case {
        config.case_policy = CasePolicy::InsensitiveFallback;
    }
    Ok(config)
}

fn cmd_stats(connected: &Connected, format: Option<Format>) -> Result<()> {
    let stats = connected.stats();
    if format == Some(Format::Json) {
        let report = json!({ "stats": stats, "failures": connected.failures() });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let mut result = QueryResult::new(["metric", "value"]);
    let metrics = [
        ("notes", stats.notes),
        ("nodes", stats.nodes),
        ("edges", stats.edges),
        ("references", stats.references),
        ("broken_references", stats.broken_references),
        ("ambiguous_resolutions", stats.ambiguous_resolutions),
        ("case_folded_resolutions", stats.case_folded_resolutions),
        ("load_failures", stats.load_failures),
    ];
    for (metric, value) in metrics {
        result.push([json!(metric), json!(value)]);
    }
    emit(result, format)?;

    for failure in connected.failures() {
        eprintln!("failed: {} ({})", failure.rel_path.display(), failure.reason);
    }
    Ok(())
}

fn emit(result: QueryResult, format: Option<Format>) -> Result<()> {
    let format = match format {
        None | Some(Format::Table) => OutputFormat::Table,
        Some(Format::Markdown) => OutputFormat::Markdown,
        Some(Format::Json) => OutputFormat::Json,
        Some(other) => bail!("tables cannot be rendered as {other:?}; use table, markdown or json"),
    };
    let output = format_results(&result, format);
    print!("{output}");
    if !output.ends_with('\n') {
        println!();
    }
    Ok(())
}

fn missing(note: &str) -> String {
    format!("no note or file named '{note}' in the vault")
}
