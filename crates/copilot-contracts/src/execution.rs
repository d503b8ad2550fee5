//! Stage identities, routing results, and trace records.
//!
//! `Stage` names the nodes of the engine's control-flow graph. `Next` is
//! what the transition table returns after a stage completes. `StepRecord`
//! is what gets written to the trace, one per executed stage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A node in the engine's control-flow graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Propose up to three sub-queries. Entry point.
    Plan,
    /// Query the textbook index, with knowledge-graph expansion.
    RetrieveCorpus,
    /// Search and fetch web pages. Only entered when `need_web` is set.
    RetrieveWeb,
    /// Draft a cited answer from the cumulative evidence.
    Synthesize,
    /// Gate the draft through a YES/NO grounding check, repairing on failure.
    SelfCheck,
    /// Decide between another hop and finishing.
    HopControl,
    /// Extract triples from the final answer into the knowledge store. Terminal.
    UpdateMemory,
}

impl Stage {
    /// Stable snake_case name used in logs and traces.
    pub fn name(self) -> &'static str {
        match self {
            Stage::Plan => "plan",
            Stage::RetrieveCorpus => "retrieve_corpus",
            Stage::RetrieveWeb => "retrieve_web",
            Stage::Synthesize => "synthesize",
            Stage::SelfCheck => "self_check",
            Stage::HopControl => "hop_control",
            Stage::UpdateMemory => "update_memory",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Where control goes after a stage completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Next {
    Stage(Stage),
    End,
}

/// The outcome of hop control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HopDecision {
    /// Loop back to corpus retrieval with `hop + 1`.
    Continue,
    /// Leave the retrieval loop and update memory.
    Finish,
}

/// An immutable record of one executed stage, written to the trace.
///
/// Collections are recorded as lengths so the trace stays small and never
/// carries page text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// The run this stage belongs to.
    pub run_id: String,
    /// Zero-based position of this stage execution within the run.
    pub sequence: u64,
    /// The stage that just ran.
    pub stage: Stage,
    /// `hop` after the stage returned.
    pub hop: u32,
    pub subqueries: usize,
    pub evidence_pdf: usize,
    pub evidence_web: usize,
    pub need_web: bool,
    pub done: bool,
    /// The routing decision taken after this stage.
    pub next: Next,
    /// Wall-clock time the record was created (UTC).
    pub timestamp: DateTime<Utc>,
}
