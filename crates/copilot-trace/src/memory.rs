//! In-memory implementation of `TraceWriter`.
//!
//! `InMemoryTraceWriter` keeps one hash chain per run behind a `Mutex`.
//! Clones share the same chains, so a caller can hand one clone to the
//! engine and keep another to export traces afterwards.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::{debug, info};

use copilot_contracts::{
    error::{CopilotError, CopilotResult},
    execution::StepRecord,
};
use copilot_core::traits::TraceWriter;

use crate::{
    chain::{hash_event, verify_chain},
    event::{RunTrace, TraceEvent},
};

/// One run's chain.
pub(crate) struct RunChain {
    pub(crate) events: Vec<TraceEvent>,
    /// `this_hash` of the last event, or `GENESIS_HASH` before the first.
    pub(crate) last_hash: String,
    pub(crate) finalized: bool,
}

impl RunChain {
    fn new() -> Self {
        Self {
            events: Vec::new(),
            last_hash: TraceEvent::GENESIS_HASH.to_string(),
            finalized: false,
        }
    }
}

/// An in-memory, append-only trace writer backed by per-run hash chains.
#[derive(Clone, Default)]
pub struct InMemoryTraceWriter {
    pub(crate) runs: Arc<Mutex<HashMap<String, RunChain>>>,
}

impl InMemoryTraceWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run IDs with at least one recorded event, in no particular order.
    pub fn run_ids(&self) -> Vec<String> {
        match self.runs.lock() {
            Ok(runs) => runs.keys().cloned().collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Export a sealed copy of `run_id`'s trace, if the run is known.
    pub fn export(&self, run_id: &str) -> Option<RunTrace> {
        let runs = self.runs.lock().ok()?;
        let chain = runs.get(run_id)?;
        Some(RunTrace {
            run_id: run_id.to_string(),
            events: chain.events.clone(),
            finalized: chain.finalized,
            exported_at: Utc::now(),
            terminal_hash: chain.events.last().map(|e| e.this_hash.clone()).unwrap_or_default(),
        })
    }

    /// True when `run_id`'s chain is intact. Unknown runs are trivially intact.
    pub fn verify_integrity(&self, run_id: &str) -> bool {
        match self.runs.lock() {
            Ok(runs) => runs.get(run_id).map_or(true, |chain| verify_chain(&chain.events)),
            Err(_) => false,
        }
    }
}

impl TraceWriter for InMemoryTraceWriter {
    /// Append `record` to its run's chain.
    ///
    /// Fails when the run has already been finalized.
    fn write(&self, record: &StepRecord) -> CopilotResult<()> {
        let mut runs = self.runs.lock().map_err(|e| CopilotError::Trace {
            reason: format!("trace state lock poisoned: {}", e),
        })?;

        let chain = runs.entry(record.run_id.clone()).or_insert_with(RunChain::new);
        if chain.finalized {
            return Err(CopilotError::Trace {
                reason: format!("run {} is already finalized", record.run_id),
            });
        }

        let sequence = chain.events.len() as u64;
        let prev_hash = chain.last_hash.clone();
        let this_hash = hash_event(&record.run_id, sequence, record, &prev_hash);

        debug!(run_id = %record.run_id, sequence, stage = %record.stage, "trace event appended");
        chain.events.push(TraceEvent {
            sequence,
            run_id: record.run_id.clone(),
            record: record.clone(),
            prev_hash,
            this_hash: this_hash.clone(),
        });
        chain.last_hash = this_hash;

        Ok(())
    }

    /// Seal `run_id`'s chain against further writes.
    fn finalize(&self, run_id: &str) -> CopilotResult<()> {
        let mut runs = self.runs.lock().map_err(|e| CopilotError::Trace {
            reason: format!("trace state lock poisoned: {}", e),
        })?;

        let chain = runs.get_mut(run_id).ok_or_else(|| CopilotError::Trace {
            reason: format!("cannot finalize unknown run {run_id}"),
        })?;
        chain.finalized = true;

        info!(
            run_id = %run_id,
            event_count = chain.events.len(),
            terminal_hash = %chain.last_hash,
            "trace finalized"
        );
        Ok(())
    }
}
