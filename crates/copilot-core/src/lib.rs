//! # copilot-core
//!
//! The orchestration engine for the textbook question-answering copilot.
//!
//! This crate provides:
//! - The collaborator traits (`Generator`, `Embedder`, `EvidenceIndex`,
//!   `WebTools`, `KnowledgeStore`, `TraceWriter`)
//! - The stage functions, each a `State -> State` replacement
//! - The transition table that routes between stages
//! - The `Engine` that drives one question from planning to memory update
//!
//! ## Usage
//!
//! ```rust,ignore
//! use copilot_core::Engine;
//!
//! let engine = Engine::new(generator, index, web, knowledge, trace, settings);
//! let answer = engine.answer("Explain the Bellman optimality equation")?;
//! ```

pub mod digest;
pub mod engine;
pub mod prompts;
pub mod routing;
pub mod stages;
pub mod traits;

pub use engine::{Engine, RunOutcome, NO_ANSWER};
