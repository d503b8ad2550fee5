//! Hash-chain primitives: hashing and chain verification.
//!
//! Hash input layout (bytes, in order):
//!   1. run_id as UTF-8 bytes
//!   2. sequence as 8-byte little-endian
//!   3. prev_hash as UTF-8 bytes (64 ASCII hex chars)
//!   4. compact JSON of the step record

use sha2::{Digest, Sha256};

use copilot_contracts::execution::StepRecord;

use crate::event::TraceEvent;

/// Compute the SHA-256 hash for one trace event.
///
/// Returns a lowercase 64-character hex string.
///
/// # Panics
///
/// Panics if `record` cannot be serialized to JSON, which cannot happen for
/// `StepRecord`.
pub fn hash_event(run_id: &str, sequence: u64, record: &StepRecord, prev_hash: &str) -> String {
    let record_json =
        serde_json::to_vec(record).expect("StepRecord must always be serializable to JSON");

    let mut hasher = Sha256::new();
    hasher.update(run_id.as_bytes());
    hasher.update(sequence.to_le_bytes());
    hasher.update(prev_hash.as_bytes());
    hasher.update(&record_json);

    hex::encode(hasher.finalize())
}

/// Verify a run's chain.
///
/// Valid when every event links to its predecessor's hash (genesis for the
/// first), carries the expected sequence number, and its stored hash matches
/// the recomputed one. An empty chain is valid.
pub fn verify_chain(events: &[TraceEvent]) -> bool {
    let mut expected_prev = TraceEvent::GENESIS_HASH.to_string();

    for (position, event) in events.iter().enumerate() {
        if event.sequence != position as u64 || event.prev_hash != expected_prev {
            return false;
        }

        let recomputed = hash_event(&event.run_id, event.sequence, &event.record, &event.prev_hash);
        if event.this_hash != recomputed {
            return false;
        }

        expected_prev = event.this_hash.clone();
    }

    true
}
