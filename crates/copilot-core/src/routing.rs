//! The engine's transition table.
//!
//! All routing lives here. The control-flow graph is:
//!
//! ```text
//!   plan ─► retrieve_corpus ─┬─(need_web)─► retrieve_web ─┐
//!                ▲           └──────────────────────────────┴─► synthesize ─► self_check ─► hop_control
//!                │                                                                           │
//!                └──────────────────────────(not done)───────────────────────────────────────┤
//!                                                                                   (done)   ▼
//!                                                                                     update_memory ─► end
//! ```
//!
//! Only two nodes branch: corpus retrieval (on `need_web`) and hop control
//! (on `done`). Every other edge is fixed.

use copilot_contracts::{
    execution::{HopDecision, Next, Stage},
    settings::EngineSettings,
    state::AgentState,
};

/// Where control goes after `stage` has produced `state`.
pub fn route(stage: Stage, state: &AgentState) -> Next {
    match stage {
        Stage::Plan => Next::Stage(Stage::RetrieveCorpus),
        Stage::RetrieveCorpus if state.need_web => Next::Stage(Stage::RetrieveWeb),
        Stage::RetrieveCorpus => Next::Stage(Stage::Synthesize),
        Stage::RetrieveWeb => Next::Stage(Stage::Synthesize),
        Stage::Synthesize => Next::Stage(Stage::SelfCheck),
        Stage::SelfCheck => Next::Stage(Stage::HopControl),
        Stage::HopControl if state.done => Next::Stage(Stage::UpdateMemory),
        Stage::HopControl => Next::Stage(Stage::RetrieveCorpus),
        Stage::UpdateMemory => Next::End,
    }
}

/// Decide whether the retrieval loop runs another hop.
///
/// Continue only while all three hold: another hop fits under `max_hops`,
/// no web evidence has been collected, and corpus evidence is still below
/// `min_corpus_items`.
pub fn hop_decision(state: &AgentState, settings: &EngineSettings) -> HopDecision {
    let hop_available = state.hop + 1 < settings.max_hops;
    let no_web = state.evidence_web.is_empty();
    let thin_corpus = state.evidence_pdf.len() < settings.min_corpus_items;

    if hop_available && no_web && thin_corpus {
        HopDecision::Continue
    } else {
        HopDecision::Finish
    }
}

/// Upper bound on stage executions for one run.
///
/// Planning and memory update run once; each hop runs at most five stages.
/// Exceeding this means the transition table is looping and the run is
/// aborted.
pub fn step_ceiling(settings: &EngineSettings) -> u64 {
    2 + 5 * u64::from(settings.max_hops)
}
