//! # copilot-trace
//!
//! Append-only, SHA-256 hash-chained trace of the stages a copilot run
//! executed.
//!
//! Every record the engine writes is wrapped in a `TraceEvent` that links to
//! the previous event of the same run by hash. Editing any event breaks the
//! chain and `verify_chain` reports it.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use copilot_trace::InMemoryTraceWriter;
//!
//! let trace = InMemoryTraceWriter::new();
//! let engine = Engine::new(generator, index, web, knowledge, Box::new(trace.clone()), settings);
//! let outcome = engine.run("What is a Markov decision process?")?;
//!
//! assert!(trace.verify_integrity(&outcome.run_id.to_string()));
//! ```

pub mod chain;
pub mod event;
pub mod memory;

pub use chain::{hash_event, verify_chain};
pub use event::{RunTrace, TraceEvent};
pub use memory::InMemoryTraceWriter;

// ── Tests ─────────────────────────────────────────────────────────────────────
