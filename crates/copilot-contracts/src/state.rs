//! Agent state and evidence types.
//!
//! `AgentState` is the single record threaded through the engine for one
//! question. Stages never mutate it in place: each stage takes the current
//! value and returns a full replacement, carrying untouched fields over with
//! struct update syntax.

use serde::{Deserialize, Serialize};

/// Unique identifier for a single question-run.
///
/// Appears in every trace record written for the run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub uuid::Uuid);

impl RunId {
    /// Create a new, unique run ID.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A passage returned by the evidence index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdfEvidence {
    /// Stable chunk identifier assigned when the index was built.
    pub id: String,
    /// The passage text.
    pub text: String,
    /// 1-based page number the passage was cut from.
    pub page: u32,
    /// Inner-product similarity against the query; higher is more relevant.
    pub score: f32,
    /// Where the passage came from (always "pdf" for the textbook index).
    pub source: String,
}

/// Cleaned page text fetched from a web search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebEvidence {
    pub url: String,
    /// Extracted page text, already length-capped by the fetcher.
    pub text: String,
}

/// A ranked web search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Everything the engine knows about one question while answering it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentState {
    /// The caller's question. Never changes after construction.
    pub question: String,
    /// Planned sub-queries, at most three. May be empty.
    pub subqueries: Vec<String>,
    /// Zero-based hop counter. Only ever increases within a run.
    pub hop: u32,
    /// Corpus passages accumulated across hops. Append-only.
    pub evidence_pdf: Vec<PdfEvidence>,
    /// Web pages accumulated across hops. Append-only.
    pub evidence_web: Vec<WebEvidence>,
    /// The latest synthesized draft.
    pub draft: String,
    /// The latest verified or repaired answer.
    pub final_answer: String,
    /// Routing flag recomputed by every corpus retrieval.
    pub need_web: bool,
    /// Set once, when hop control decides to finish.
    pub done: bool,
}

impl AgentState {
    /// A fresh state for `question`: empty collections, hop 0, flags cleared.
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Self::default()
        }
    }

    /// The query retrieval should run for the current hop.
    ///
    /// Hop `n` uses `subqueries[n]`. When the planner produced nothing, or
    /// the hop has moved past the last planned sub-query, retrieval falls
    /// back to the raw question.
    pub fn active_query(&self) -> &str {
        self.subqueries
            .get(self.hop as usize)
            .map(String::as_str)
            .unwrap_or(&self.question)
    }
}
