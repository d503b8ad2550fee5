//! # copilot-verify
//!
//! The two places the engine interprets model output as structured data:
//!
//! - `verdict` — the YES/NO grounding gate. Anything that is not a clear
//!   YES is a failure, so ambiguity always routes to repair.
//! - `triples` — knowledge extraction. Output is validated entry by entry
//!   against a JSON Schema; rejected output is reported as an error value
//!   for the caller to discard.

pub mod triples;
pub mod verdict;

pub use triples::{extract_triples, TripleParseError};
pub use verdict::{parse_verdict, Verdict};
