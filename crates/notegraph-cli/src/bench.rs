//! notegraph benchmark binary
//!
//! Measures the connect and gather phases on synthetic vaults of 100, 1,000
//! and 10,000 notes.
//! Run with: `cargo run --bin notegraph-bench --release`

use std::path::PathBuf;
use std::time::Instant;

use chrono::Utc;
use notegraph_core::{NoteId, VaultConfig};
use notegraph_index::{connect, gather, ConnectOptions, VaultInput};
use notegraph_parser::GatherOptions;

// ---------------------------------------------------------------------------
// Synthetic vault generation
// ---------------------------------------------------------------------------

const FOLDERS: &[&str] = &["", "projects", "people", "journal", "archive/2021"];

const TAGS: &[&str] = &[
    "project",
    "project/alpha",
    "project/beta",
    "meeting",
    "idea",
    "reading/books",
    "reading/papers",
    "todo",
    "music/pop",
    "y1982",
];

const BODY_FRAGMENTS: &[&str] = &[
    "The team discussed the deployment plan and agreed to revisit the open risks next week.",
    "Estimated $\\hat{\\beta}_{1}$ with robust errors; see the appendix for $\\sigma^2$.",
    "Reading notes on the chapter about distributed consensus and failure detectors.",
    "```rust\nfn main() { println!(\"[[NotALink]]\"); }\n```",
    "Open questions: latency under load, cache eviction, and **rollout** order.",
    "$$\n\\sum_{i=1}^{n} x_i = n \\bar{x}\n$$",
];

fn note_name(i: usize) -> String {
    format!("Note {i}")
}

fn generate_note(i: usize, n: usize) -> (PathBuf, String) {
    let folder = FOLDERS[i % FOLDERS.len()];
    let name = note_name(i);
    let path = if folder.is_empty() {
        PathBuf::from(format!("{name}.md"))
    } else {
        PathBuf::from(format!("{folder}/{name}.md"))
    };

    let mut body = format!(
        "---\ntags: [{}]\n---\n# {name}\n\n{}\n\n",
        TAGS[(i + 3) % TAGS.len()],
        BODY_FRAGMENTS[i % BODY_FRAGMENTS.len()]
    );
    for k in 1..=4 {
        let target = (i * 7 + k * 13) % n;
        body.push_str(&format!("See [[{}]] and ", note_name(target)));
    }
    body.push_str(&format!(
        "[[Missing {}|a gap]], [the next one](<{}.md>), #{}\n",
        i % 50,
        note_name((i + 1) % n),
        TAGS[i % TAGS.len()]
    ));
    (path, body)
}

// ---------------------------------------------------------------------------
// Percentile computation
// ---------------------------------------------------------------------------

fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((p / 100.0) * sorted.len() as f64).ceil() as usize;
    let idx = if idx == 0 { 0 } else { idx - 1 };
    sorted[idx.min(sorted.len() - 1)]
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

fn format_duration_us(us: f64) -> String {
    if us >= 1_000_000.0 {
        format!("{:.1} s", us / 1_000_000.0)
    } else if us >= 1_000.0 {
        format!("{:.0} ms", us / 1_000.0)
    } else {
        format!("{:.0} us", us)
    }
}

fn format_throughput(notes_per_sec: f64) -> String {
    if notes_per_sec >= 1_000_000.0 {
        format!("{:.1}M/s", notes_per_sec / 1_000_000.0)
    } else if notes_per_sec >= 1_000.0 {
        format!("{:.1}K/s", notes_per_sec / 1_000.0)
    } else {
        format!("{:.0}/s", notes_per_sec)
    }
}

fn format_scale(n: usize) -> String {
    if n >= 1_000_000 {
        format!("{}M", n / 1_000_000)
    } else if n >= 1_000 {
        format!("{}K", n / 1_000)
    } else {
        n.to_string()
    }
}

// ---------------------------------------------------------------------------
// Benchmark results
// ---------------------------------------------------------------------------

type MetricRow = (&'static str, fn(&ScaleResult) -> f64);

#[derive(Default)]
struct ScaleResult {
    connect_notes_per_sec: f64,
    gather_notes_per_sec: f64,
    backlinks_p50_us: f64,
    backlinks_p95_us: f64,
    backlinks_p99_us: f64,
    nodes: usize,
    edges: usize,
    broken: usize,
}

// ---------------------------------------------------------------------------
// Benchmark runner for a single scale
// ---------------------------------------------------------------------------

fn run_benchmark(n: usize) -> Result<ScaleResult, notegraph_core::NotegraphError> {
    let config = VaultConfig::default();
    let notes: Vec<(PathBuf, String)> = (0..n).map(|i| generate_note(i, n)).collect();
    let input = VaultInput::from_texts(notes, &config)?;

    let mut result = ScaleResult::default();

    // --- Connect (extract, resolve, build graph, assemble indices) ---
    let start = Instant::now();
    let connected = connect(&input, &ConnectOptions::from(&config));
    result.connect_notes_per_sec = n as f64 / start.elapsed().as_secs_f64();

    let stats = *connected.stats();
    result.nodes = stats.nodes;
    result.edges = stats.edges;
    result.broken = stats.broken_references;

    // --- Backlink lookups ---
    let lookups = 200;
    let ids: Vec<NoteId> = input.notes().map(|(id, _)| id.clone()).collect();
    let mut latencies: Vec<f64> = Vec::with_capacity(lookups);
    for i in 0..lookups {
        let id = &ids[(i * 31) % ids.len()];
        let start = Instant::now();
        let _ = connected.index().backlinks(id.as_str());
        latencies.push(start.elapsed().as_nanos() as f64 / 1_000.0);
    }
    latencies.sort_by(f64::total_cmp);
    result.backlinks_p50_us = percentile(&latencies, 50.0);
    result.backlinks_p95_us = percentile(&latencies, 95.0);
    result.backlinks_p99_us = percentile(&latencies, 99.0);

    // --- Gather (plaintext renderings) ---
    let start = Instant::now();
    let _ = gather(connected, &input, &GatherOptions::from(&config.gather));
    result.gather_notes_per_sec = n as f64 / start.elapsed().as_secs_f64();

    Ok(result)
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<(), notegraph_core::NotegraphError> {
    let scales: &[usize] = &[100, 1_000, 10_000];

    println!();
    println!("notegraph Benchmark");
    println!("===================");
    println!(
        "Platform: {} {}",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
    println!("Date: {}", Utc::now().format("%Y-%m-%d"));
    println!();

    eprint!("Warming up... ");
    let _ = run_benchmark(10)?;
    eprintln!("done.");
    println!();

    let mut results: Vec<(usize, ScaleResult)> = Vec::new();
    for &n in scales {
        eprint!("Benchmarking {} notes... ", n);
        let start = Instant::now();
        let result = run_benchmark(n)?;
        eprintln!("done in {:.1}s", start.elapsed().as_secs_f64());
        results.push((n, result));
    }

    println!();

    let col0 = 22;
    let colw = 14;

    print!("| {:col0$}", "Operation");
    for &n in scales {
        print!("| {:>colw$}", format!("{} notes", format_scale(n)));
    }
    println!("|");

    print!("|{}", "-".repeat(col0 + 1));
    for _ in scales {
        print!("|{}", "-".repeat(colw + 1));
    }
    println!("|");

    let throughput_rows: Vec<MetricRow> = vec![
        ("Connect", |r: &ScaleResult| r.connect_notes_per_sec),
        ("Gather", |r: &ScaleResult| r.gather_notes_per_sec),
    ];
    for (label, getter) in &throughput_rows {
        print!("| {:col0$}", label);
        for (_, r) in &results {
            print!("| {:>colw$}", format_throughput(getter(r)));
        }
        println!("|");
    }

    let lookup_rows: Vec<MetricRow> = vec![
        ("Backlinks (p50)", |r: &ScaleResult| r.backlinks_p50_us),
        ("Backlinks (p95)", |r: &ScaleResult| r.backlinks_p95_us),
        ("Backlinks (p99)", |r: &ScaleResult| r.backlinks_p99_us),
    ];
    for (label, getter) in &lookup_rows {
        print!("| {:col0$}", label);
        for (_, r) in &results {
            print!("| {:>colw$}", format_duration_us(getter(r)));
        }
        println!("|");
    }

    let size_rows: [(&str, fn(&ScaleResult) -> usize); 3] = [
        ("Graph nodes", |r| r.nodes),
        ("Graph edges", |r| r.edges),
        ("Broken references", |r| r.broken),
    ];
    for (label, getter) in &size_rows {
        print!("| {:col0$}", label);
        for (_, r) in &results {
            print!("| {:>colw$}", getter(r));
        }
        println!("|");
    }

    println!();
    Ok(())
}
