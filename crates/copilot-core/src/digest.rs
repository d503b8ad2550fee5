//! Evidence digest assembly.
//!
//! The digest is the only view of retrieved evidence the generation service
//! ever sees. It always covers the full cumulative evidence, never just the
//! latest hop.

use copilot_contracts::{settings::EngineSettings, state::AgentState};

/// Render the evidence digest for `state`.
///
/// Layout: the highest-scoring corpus passages as `[p.N] excerpt` lines,
/// a blank line, then the first web pages as `[url] excerpt` lines. Either
/// section is omitted when it has no items; an empty string means there is
/// no evidence at all.
pub fn build_digest(state: &AgentState, settings: &EngineSettings) -> String {
    let mut ranked: Vec<_> = state.evidence_pdf.iter().collect();
    // Stable sort keeps retrieval order among equal scores.
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));

    let pdf_section = ranked
        .into_iter()
        .take(settings.digest_pdf_items)
        .map(|item| format!("[p.{}] {}", item.page, truncate_chars(&item.text, settings.digest_pdf_chars)))
        .collect::<Vec<_>>()
        .join("\n");

    let web_section = state
        .evidence_web
        .iter()
        .take(settings.digest_web_items)
        .map(|item| format!("[{}] {}", item.url, truncate_chars(&item.text, settings.digest_web_chars)))
        .collect::<Vec<_>>()
        .join("\n");

    [pdf_section, web_section]
        .into_iter()
        .filter(|section| !section.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// The first `max` characters of `text` (not bytes, so multi-byte text is
/// never split mid-character).
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
