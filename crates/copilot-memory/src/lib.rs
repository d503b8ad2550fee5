//! # copilot-memory
//!
//! The knowledge graph the copilot grows from its own answers.
//!
//! [`GraphMemory`] implements
//! [`KnowledgeStore`](copilot_core::traits::KnowledgeStore): the memory-update
//! stage adds `(head, relation, tail)` triples, and corpus retrieval asks it
//! for neighbours of query terms to widen the search.

pub mod graph;
pub mod snapshot;

pub use graph::{GraphMemory, DEFAULT_MAX_DEGREE};

// ── Tests ─────────────────────────────────────────────────────────────────────
