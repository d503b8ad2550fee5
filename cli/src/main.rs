//! `copilot`: ask the reinforcement-learning textbook copilot a question.
//!
//! Usage:
//!   copilot build-index --pages pages.json --out index
//!   copilot ask "What is the difference between SARSA and Q-learning?"
//!   copilot ask --trace "Explain eligibility traces"
//!   copilot graph --term Q-learning
//!
//! Settings come from `--config <file>` (TOML) or built-in defaults; a
//! `.env` file in the working directory is loaded first.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use copilot_contracts::{
    error::{CopilotError, CopilotResult},
    settings::{EmbedderKind, Settings},
};
use copilot_core::{traits::Embedder, traits::KnowledgeStore, Engine};
use copilot_index::{load_pages, FlatIndex, HashedEmbedder, IndexBuilder};
use copilot_llm::{resolve_api_key, OpenAiChat, OpenAiEmbedder};
use copilot_memory::GraphMemory;
use copilot_trace::InMemoryTraceWriter;
use copilot_web::DuckDuckGoTools;

// ── CLI definition ────────────────────────────────────────────────────────────

/// Textbook-grounded question answering for reinforcement learning.
#[derive(Parser)]
#[command(
    name = "copilot",
    about = "Reinforcement-learning textbook copilot",
    long_about = "Answers questions from an indexed RL textbook, falling back to the web\n\
                  when the book has nothing relevant, and remembers facts from its answers."
)]
struct Cli {
    /// TOML settings file. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Answer one question.
    Ask {
        question: String,
        /// Print the hash-chained stage trace after the answer.
        #[arg(long)]
        trace: bool,
    },
    /// Build the evidence index from extracted page text.
    BuildIndex {
        /// JSON file of `[{"page": n, "text": "..."}]`.
        #[arg(long)]
        pages: PathBuf,
        /// Output directory. Defaults to `[index].dir`.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Show knowledge-graph expansions for one or more terms.
    Graph {
        #[arg(long = "term", required = true)]
        terms: Vec<String>,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // A missing .env is fine.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let result = copilot_config::load(cli.config.as_deref()).and_then(|settings| match cli.command {
        Command::Ask { question, trace } => run_ask(&settings, &question, trace),
        Command::BuildIndex { pages, out } => run_build_index(&settings, &pages, out.as_deref()),
        Command::Graph { terms } => run_graph(&settings, &terms),
    });

    if let Err(e) = result {
        eprintln!("copilot error: {}", e);
        std::process::exit(1);
    }
}

// ── Commands ──────────────────────────────────────────────────────────────────

fn run_ask(settings: &Settings, question: &str, show_trace: bool) -> CopilotResult<()> {
    let knowledge = Arc::new(open_memory(settings)?);
    let index = FlatIndex::open(Path::new(&settings.index.dir), make_embedder(settings)?)?;
    let api_key = resolve_api_key(&settings.generation, |k| std::env::var(k).ok())?;
    let generator = OpenAiChat::new(&settings.generation, api_key)?;
    let web = DuckDuckGoTools::new(settings.web.clone())?;
    let trace = InMemoryTraceWriter::new();

    let engine = Engine::new(
        Box::new(generator),
        Box::new(index),
        Box::new(web),
        knowledge.clone() as Arc<dyn KnowledgeStore>,
        Box::new(trace.clone()),
        settings.engine.clone(),
    );

    let outcome = engine.run(question)?;
    println!("{}", outcome.answer);

    if show_trace {
        print_trace(&trace, &outcome.run_id.to_string())?;
    }

    if let Some(snapshot) = &settings.memory.snapshot {
        knowledge.save(Path::new(snapshot))?;
    }
    Ok(())
}

fn run_build_index(settings: &Settings, pages: &Path, out: Option<&Path>) -> CopilotResult<()> {
    let out_dir = out.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from(&settings.index.dir));
    let pages = load_pages(pages)?;
    let embedder = make_embedder(settings)?;

    let summary = IndexBuilder::from_settings(&settings.index).build(&pages, embedder.as_ref(), &out_dir)?;
    println!(
        "Indexed {} chunks ({} dimensions) -> {}",
        summary.chunks,
        summary.dimensions,
        out_dir.display()
    );
    Ok(())
}

fn run_graph(settings: &Settings, terms: &[String]) -> CopilotResult<()> {
    let memory = open_memory(settings)?;
    let expansions = memory.suggest_expansions(terms)?;
    if expansions.is_empty() {
        println!("(no related entities)");
    }
    for entity in expansions {
        println!("{entity}");
    }
    Ok(())
}

// ── Wiring ────────────────────────────────────────────────────────────────────

fn make_embedder(settings: &Settings) -> CopilotResult<Box<dyn Embedder>> {
    match settings.index.embedder {
        EmbedderKind::Hashed => Ok(Box::new(HashedEmbedder::new(settings.index.hashed_dimensions))),
        EmbedderKind::Openai => {
            let api_key = resolve_api_key(&settings.generation, |k| std::env::var(k).ok())?;
            Ok(Box::new(OpenAiEmbedder::new(&settings.generation, api_key)?))
        }
    }
}

fn open_memory(settings: &Settings) -> CopilotResult<GraphMemory> {
    match &settings.memory.snapshot {
        Some(path) => GraphMemory::load_or_default(Path::new(path)),
        None => {
            debug!("no graph snapshot configured, starting empty");
            Ok(GraphMemory::new())
        }
    }
}

fn print_trace(trace: &InMemoryTraceWriter, run_id: &str) -> CopilotResult<()> {
    let exported = trace.export(run_id).ok_or_else(|| CopilotError::Trace {
        reason: format!("no trace recorded for run {run_id}"),
    })?;
    info!(run_id = %run_id, intact = trace.verify_integrity(run_id), "trace exported");

    let json = serde_json::to_string_pretty(&exported).map_err(|e| CopilotError::Trace {
        reason: format!("failed to serialize trace: {}", e),
    })?;
    println!();
    println!("{json}");
    Ok(())
}
