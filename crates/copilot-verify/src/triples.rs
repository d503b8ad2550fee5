//! Triple-extraction parsing.
//!
//! The model is asked for a JSON array of `[head, relation, tail]` arrays.
//! Parsing runs in two phases:
//!
//! 1. **Document** — the reply must parse as JSON and be an array. Anything
//!    else rejects the whole reply.
//! 2. **Entries** — each element is validated against a JSON Schema for a
//!    single triple (exactly three non-empty strings). Invalid entries are
//!    skipped individually; valid ones are kept in order.
//!
//! Rejection is returned as a `TripleParseError`. Callers treat extraction
//! as best-effort and discard the error after logging it.

use std::sync::LazyLock;

use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

use copilot_contracts::knowledge::Triple;

/// Why an extraction reply was rejected as a whole.
#[derive(Debug, Error)]
pub enum TripleParseError {
    #[error("reply is not valid JSON: {0}")]
    NotJson(String),

    #[error("reply is JSON but not an array")]
    NotArray,
}

static TRIPLE_VALIDATOR: LazyLock<jsonschema::Validator> = LazyLock::new(|| {
    let schema = json!({
        "type": "array",
        "minItems": 3,
        "maxItems": 3,
        "items": { "type": "string", "minLength": 1 }
    });
    jsonschema::validator_for(&schema).expect("triple schema is a valid JSON Schema")
});

/// Parse an extraction reply into at most `max` triples.
///
/// A reply wrapped in a Markdown code fence is unwrapped first.
pub fn extract_triples(raw: &str, max: usize) -> Result<Vec<Triple>, TripleParseError> {
    let body = strip_code_fence(raw);
    let document: Value =
        serde_json::from_str(body).map_err(|e| TripleParseError::NotJson(e.to_string()))?;

    let entries = match document {
        Value::Array(entries) => entries,
        _ => return Err(TripleParseError::NotArray),
    };

    let mut triples = Vec::new();
    for entry in &entries {
        if triples.len() >= max {
            break;
        }
        if !TRIPLE_VALIDATOR.is_valid(entry) {
            warn!(%entry, "skipping malformed triple");
            continue;
        }
        // Validated above: an array of exactly three strings.
        let parts: Vec<&str> = entry
            .as_array()
            .map(|a| a.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        if let [head, relation, tail] = parts.as_slice() {
            triples.push(Triple::new(*head, *relation, *tail));
        }
    }

    debug!(
        offered = entries.len(),
        accepted = triples.len(),
        "parsed extraction reply"
    );
    Ok(triples)
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening fence line.
    let rest = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}
