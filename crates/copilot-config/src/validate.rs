//! Semantic checks serde cannot express.

use copilot_contracts::{
    error::{CopilotError, CopilotResult},
    settings::Settings,
};

/// Hops and sub-queries a question may use at most.
pub const HOP_LIMIT: u32 = 3;
pub const SUBQUERY_LIMIT: usize = 3;

/// Ceiling on `web.backoff_base_secs`.
pub const MAX_BACKOFF_BASE_SECS: f64 = 30.0;

fn invalid(reason: String) -> CopilotError {
    CopilotError::Config { reason }
}

/// Reject settings the engine or the index builder cannot run with.
///
/// Returns the first violation found as `CopilotError::Config`.
pub fn validate(settings: &Settings) -> CopilotResult<()> {
    let engine = &settings.engine;
    if engine.max_hops == 0 || engine.max_hops > HOP_LIMIT {
        return Err(invalid(format!(
            "engine.max_hops must be in 1..={}, got {}",
            HOP_LIMIT, engine.max_hops
        )));
    }
    if engine.max_subqueries == 0 || engine.max_subqueries > SUBQUERY_LIMIT {
        return Err(invalid(format!(
            "engine.max_subqueries must be in 1..={}, got {}",
            SUBQUERY_LIMIT, engine.max_subqueries
        )));
    }
    if !engine.web_score_threshold.is_finite() {
        return Err(invalid(format!(
            "engine.web_score_threshold must be finite, got {}",
            engine.web_score_threshold
        )));
    }

    let generation = &settings.generation;
    if generation.base_url.trim().is_empty() {
        return Err(invalid("generation.base_url must not be empty".into()));
    }
    if generation.model.trim().is_empty() {
        return Err(invalid("generation.model must not be empty".into()));
    }
    if !generation.temperature.is_finite() || generation.temperature < 0.0 {
        return Err(invalid(format!(
            "generation.temperature must be a non-negative number, got {}",
            generation.temperature
        )));
    }

    let web = &settings.web;
    if !(0.0..=MAX_BACKOFF_BASE_SECS).contains(&web.backoff_base_secs) {
        return Err(invalid(format!(
            "web.backoff_base_secs must be in 0..={}, got {}",
            MAX_BACKOFF_BASE_SECS, web.backoff_base_secs
        )));
    }

    let index = &settings.index;
    if index.window_words == 0 {
        return Err(invalid("index.window_words must be at least 1".into()));
    }
    if index.stride_words == 0 || index.stride_words > index.window_words {
        return Err(invalid(format!(
            "index.stride_words must be in 1..={}, got {}",
            index.window_words, index.stride_words
        )));
    }
    if index.hashed_dimensions == 0 {
        return Err(invalid("index.hashed_dimensions must be at least 1".into()));
    }

    Ok(())
}
