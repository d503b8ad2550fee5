//! Trace event and sealed trace types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use copilot_contracts::execution::StepRecord;

/// One link in a run's hash chain.
///
/// Changing any field, including the embedded record, invalidates
/// `this_hash` and every later `prev_hash`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEvent {
    /// Position in the run's chain, starting at 0.
    pub sequence: u64,
    pub run_id: String,
    pub record: StepRecord,
    /// Hash of the previous event, or `GENESIS_HASH` for the first.
    pub prev_hash: String,
    pub this_hash: String,
}

impl TraceEvent {
    /// The `prev_hash` of the first event in every chain: 64 hex zeros.
    pub const GENESIS_HASH: &'static str =
        "0000000000000000000000000000000000000000000000000000000000000000";
}

/// A sealed copy of one run's trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunTrace {
    pub run_id: String,
    /// Events in chain order.
    pub events: Vec<TraceEvent>,
    /// True once the engine called `finalize` for this run.
    pub finalized: bool,
    /// When this copy was exported (UTC).
    pub exported_at: DateTime<Utc>,
    /// `this_hash` of the last event; empty when the run has no events.
    pub terminal_hash: String,
}
