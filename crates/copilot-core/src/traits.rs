//! Collaborator trait definitions for the copilot engine.
//!
//! The engine owns no I/O. Everything it talks to sits behind one of these
//! traits:
//!
//! - `Generator`      — text-in/text-out chat completion
//! - `EvidenceIndex`  — similarity search over the textbook
//! - `WebTools`       — web search and page fetch, never failing
//! - `KnowledgeStore` — the triple graph that outlives individual runs
//! - `TraceWriter`    — append-only record of every executed stage
//!
//! `Embedder` is not called by the engine directly; it is the seam between
//! an evidence index and whatever produces its vectors.

use copilot_contracts::{
    error::CopilotResult,
    execution::StepRecord,
    knowledge::Triple,
    message::ChatMessage,
    state::{PdfEvidence, WebHit},
};

/// A chat-completion backend.
///
/// Implementations should sample at low temperature so verification and
/// extraction replies are reproducible.
pub trait Generator: Send + Sync {
    /// Generate a reply to `messages` using at most `max_output_tokens`.
    ///
    /// Empty or odd replies are returned as-is; the engine treats them as
    /// literal text. Transport and service failures are errors.
    fn generate(&self, messages: &[ChatMessage], max_output_tokens: u32) -> CopilotResult<String>;
}

/// Turns text into dense vectors.
pub trait Embedder: Send + Sync {
    /// Embed every text in `texts`, returning one vector per input in order.
    fn embed(&self, texts: &[String]) -> CopilotResult<Vec<Vec<f32>>>;

    /// Short identifier recorded alongside built indexes.
    fn name(&self) -> &str;
}

/// Ranked passage search over the textbook corpus.
///
/// The engine only reads from the index. Errors (malformed query, empty
/// corpus) are fatal to the run.
pub trait EvidenceIndex: Send + Sync {
    /// Return up to `k` passages for `query`, best first.
    fn search(&self, query: &str, k: usize) -> CopilotResult<Vec<PdfEvidence>>;
}

/// Web search and page fetch.
///
/// Both operations degrade to empty results instead of failing. Retrying
/// is the implementation's concern.
pub trait WebTools: Send + Sync {
    /// Return up to `k` search hits for `query`.
    fn search(&self, query: &str, k: usize) -> Vec<WebHit>;

    /// Return the cleaned, length-capped text of the page at `url`, or an
    /// empty string when it cannot be fetched.
    fn fetch(&self, url: &str) -> String;
}

/// The persistent knowledge graph.
///
/// One store is shared by every run in the process, so implementations use
/// interior mutability and must tolerate calls from successive runs.
pub trait KnowledgeStore: Send + Sync {
    /// Insert each triple as a labeled edge, creating endpoint entities as
    /// needed. Parallel edges are kept.
    fn add_triples(&self, triples: &[Triple]) -> CopilotResult<()>;

    /// Entities one outbound edge away from any of `terms`, deduplicated.
    fn suggest_expansions(&self, terms: &[String]) -> CopilotResult<Vec<String>>;
}

/// The stage trace.
///
/// Every executed stage produces exactly one `StepRecord`. A failed write
/// is fatal: a run that cannot be traced does not continue.
pub trait TraceWriter: Send + Sync {
    /// Append one record. Records are never modified afterwards.
    fn write(&self, record: &StepRecord) -> CopilotResult<()>;

    /// Mark a run as complete. Called once, after the terminal stage.
    fn finalize(&self, run_id: &str) -> CopilotResult<()>;
}
