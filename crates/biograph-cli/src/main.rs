//! Biograph CLI
//!
//! Command-line interface for flattening knowledge-graph exports into
//! per-entity annotation documents (NDJSON), one namespace prefix at a
//! time. The graph and the term-type overlay can be named explicitly or
//! picked up from a data folder using the conventional filenames.

use anyhow::{bail, Context, Result};
use biograph_flatten::{
    build_entities, load_graph, load_term_types, KG_FILE, TERM_TYPES_FILE,
};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "biograph")]
#[command(author, version, about = "Flatten knowledge-graph exports into entity documents")]
struct Cli {
    /// Enable debug logging (per-endpoint skip reasons, pass summary).
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Flatten a graph export into NDJSON entity documents.
    Flatten(FlattenArgs),
}

#[derive(Args)]
struct FlattenArgs {
    /// Graph document (JSON object with an `edges` array).
    #[arg(long, conflicts_with = "data_dir", required_unless_present = "data_dir")]
    graph: Option<PathBuf>,

    /// Term-type overlay (flat JSON object: node id → semantic type).
    #[arg(long, conflicts_with = "data_dir", required_unless_present = "data_dir")]
    term_types: Option<PathBuf>,

    /// Folder holding the conventional `kg.json` + `go_mapping.json` pair.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Target namespace prefix.
    #[arg(long, default_value = "PR")]
    prefix: String,

    /// Semantic type label assigned to matching entities.
    #[arg(long, default_value = "Protein")]
    semantic_type: String,

    /// Output path (one JSON document per line); stdout when omitted.
    #[arg(short, long)]
    out: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Commands::Flatten(args) => run_flatten(args),
    }
}

fn run_flatten(args: FlattenArgs) -> Result<()> {
    let (graph_path, overlay_path) = match (&args.data_dir, &args.graph, &args.term_types) {
        (Some(dir), None, None) => (dir.join(KG_FILE), dir.join(TERM_TYPES_FILE)),
        (None, Some(graph), Some(overlay)) => (graph.clone(), overlay.clone()),
        _ => bail!("pass either --data-dir or both --graph and --term-types"),
    };

    let graph = load_graph(&graph_path)?;
    let term_types = load_term_types(&overlay_path)?;
    let entities = build_entities(&graph, &args.semantic_type, &args.prefix, &term_types)?;

    let records = entities.len();
    let associations: usize = entities.iter().map(|r| r.associated_with.len()).sum();
    let unresolved = entities.unresolved_endpoints();

    let mut writer: BufWriter<Box<dyn Write>> = match &args.out {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating output file {}", path.display()))?;
            BufWriter::new(Box::new(file))
        }
        None => BufWriter::new(Box::new(io::stdout())),
    };

    for doc in entities.into_documents() {
        serde_json::to_writer(&mut writer, &doc).context("writing entity document")?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;

    eprintln!(
        "{} {} entity documents ({} associations, {} unresolved endpoints) for prefix {}",
        "flattened".green().bold(),
        records,
        associations,
        unresolved,
        args.prefix.cyan()
    );
    Ok(())
}
