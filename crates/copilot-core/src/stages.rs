//! Stage functions.
//!
//! Each stage takes the current `AgentState` by value and returns its
//! replacement. Fields a stage does not own are carried over untouched via
//! struct update syntax. Stages never decide where control goes next; that
//! is `routing`'s job.

use tracing::{debug, info, warn};

use copilot_contracts::{
    error::CopilotResult,
    execution::HopDecision,
    message::ChatMessage,
    settings::EngineSettings,
    state::{AgentState, WebEvidence},
};
use copilot_verify::{extract_triples, parse_verdict};

use crate::{
    digest::build_digest,
    prompts::{
        CITATION_INSTRUCTION, JUDGE_QUESTION, JUDGE_SYSTEM_PROMPT, PLANNER_INSTRUCTION,
        REPAIR_INSTRUCTION, SYSTEM_PROMPT, TRIPLE_INSTRUCTION,
    },
    routing::hop_decision,
    traits::{EvidenceIndex, Generator, KnowledgeStore, WebTools},
};

/// Borrowed collaborators and settings shared by every stage of a run.
pub struct StageContext<'a> {
    pub generator: &'a dyn Generator,
    pub index: &'a dyn EvidenceIndex,
    pub web: &'a dyn WebTools,
    pub knowledge: &'a dyn KnowledgeStore,
    pub settings: &'a EngineSettings,
}

// ── Planning ─────────────────────────────────────────────────────────────────

/// Ask for up to `max_subqueries` sub-queries and reset the hop counter.
pub fn plan(ctx: &StageContext<'_>, state: AgentState) -> CopilotResult<AgentState> {
    let messages = [
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(format!("Question: {}{}", state.question, PLANNER_INSTRUCTION)),
    ];
    let reply = ctx.generator.generate(&messages, ctx.settings.plan_tokens)?;
    let subqueries = parse_plan(&reply, ctx.settings.max_subqueries);

    debug!(count = subqueries.len(), "planned sub-queries");
    Ok(AgentState { subqueries, hop: 0, ..state })
}

/// Split a bulleted reply into sub-queries.
///
/// Blank lines are skipped and leading list markers (`-`, `*`, `•`, `1.`,
/// `2)`) are stripped. A reply with nothing usable yields an empty list.
pub fn parse_plan(reply: &str, max: usize) -> Vec<String> {
    reply
        .lines()
        .map(strip_list_marker)
        .filter(|line| !line.is_empty())
        .take(max)
        .map(str::to_string)
        .collect()
}

fn strip_list_marker(line: &str) -> &str {
    let line = line.trim();
    if line.len() == 1 && line.starts_with(['-', '*', '•']) {
        return "";
    }
    for bullet in ['-', '*', '•'] {
        if let Some(rest) = line.strip_prefix(bullet) {
            if rest.starts_with(char::is_whitespace) {
                return rest.trim();
            }
        }
    }
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(rest) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                return rest.trim();
            }
        }
    }
    line
}

// ── Corpus retrieval ─────────────────────────────────────────────────────────

/// Search the textbook for the active query, widen it with knowledge-graph
/// neighbours, and recompute `need_web`.
///
/// Only the hits for the active query itself decide `need_web`: web fallback
/// is wanted when none of them reaches the score threshold, and only ever on
/// the first hop.
pub fn retrieve_corpus(ctx: &StageContext<'_>, state: AgentState) -> CopilotResult<AgentState> {
    let settings = ctx.settings;
    let query = state.active_query().to_string();

    let hits = ctx.index.search(&query, settings.corpus_k)?;
    let strong_hit = hits.iter().any(|hit| hit.score >= settings.web_score_threshold);
    debug!(hop = state.hop, query = %query, hits = hits.len(), strong_hit, "corpus search");

    let mut evidence_pdf = state.evidence_pdf.clone();
    evidence_pdf.extend(hits);

    let terms: Vec<String> = query
        .split_whitespace()
        .filter(|term| term.chars().count() >= settings.min_term_len)
        .map(str::to_string)
        .collect();
    let expansions = match ctx.knowledge.suggest_expansions(&terms) {
        Ok(expansions) => expansions,
        Err(e) => {
            warn!(error = %e, "knowledge expansion unavailable, searching without it");
            Vec::new()
        }
    };
    for expansion in expansions.iter().take(settings.max_expansions) {
        let expanded = format!("{query} {expansion}");
        let extra = ctx.index.search(&expanded, settings.expansion_k)?;
        debug!(query = %expanded, hits = extra.len(), "expansion search");
        evidence_pdf.extend(extra);
    }

    let need_web = !strong_hit && state.hop == 0;
    if need_web {
        info!(query = %query, "no strong corpus hit on first hop, falling back to web");
    }

    Ok(AgentState { evidence_pdf, need_web, ..state })
}

// ── Web retrieval ────────────────────────────────────────────────────────────

/// Search the web for the active query and fetch the leading results.
///
/// Hits without a URL and pages that come back empty are dropped. Always
/// clears `need_web` so the web is consulted at most once per retrieval.
pub fn retrieve_web(ctx: &StageContext<'_>, state: AgentState) -> CopilotResult<AgentState> {
    let settings = ctx.settings;
    let query = state.active_query().to_string();

    let hits = ctx.web.search(&query, settings.web_k);
    let mut evidence_web = state.evidence_web.clone();
    for hit in hits.iter().take(settings.web_fetch_limit) {
        if hit.url.trim().is_empty() {
            continue;
        }
        let text = ctx.web.fetch(&hit.url);
        if text.trim().is_empty() {
            debug!(url = %hit.url, "fetched page is empty, dropping");
            continue;
        }
        evidence_web.push(WebEvidence { url: hit.url.clone(), text });
    }

    info!(
        query = %query,
        hits = hits.len(),
        pages = evidence_web.len() - state.evidence_web.len(),
        "web retrieval"
    );
    Ok(AgentState { evidence_web, need_web: false, ..state })
}

// ── Synthesis ────────────────────────────────────────────────────────────────

/// Draft a cited answer from the full cumulative evidence.
pub fn synthesize(ctx: &StageContext<'_>, state: AgentState) -> CopilotResult<AgentState> {
    let digest = build_digest(&state, ctx.settings);
    let messages = [
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(format!(
            "Question: {}\n\nEvidence (textbook and web):\n{}\n\nDraft an answer with citations. {}",
            state.question, digest, CITATION_INSTRUCTION
        )),
    ];
    let draft = ctx.generator.generate(&messages, ctx.settings.synthesize_tokens)?;

    debug!(hop = state.hop, chars = draft.len(), "draft synthesized");
    Ok(AgentState { draft, ..state })
}

// ── Self-check / repair ──────────────────────────────────────────────────────

/// Gate the draft through a YES/NO grounding check.
///
/// A YES promotes the draft to the final answer unchanged. Anything else
/// triggers exactly one repair call whose output becomes the final answer;
/// the repaired text is not checked again.
pub fn self_check(ctx: &StageContext<'_>, state: AgentState) -> CopilotResult<AgentState> {
    let evidence = format!("Evidence:\n{}", build_digest(&state, ctx.settings));
    let subject = format!("Question: {}\n\nDraft Answer:\n{}", state.question, state.draft);

    let judge = [
        ChatMessage::system(JUDGE_SYSTEM_PROMPT),
        ChatMessage::user(evidence.clone()),
        ChatMessage::user(format!("{subject}\n\n{JUDGE_QUESTION}")),
    ];
    let reply = ctx.generator.generate(&judge, ctx.settings.verify_tokens)?;

    if parse_verdict(&reply).passed() {
        debug!(hop = state.hop, "draft passed self-check");
        let final_answer = state.draft.clone();
        return Ok(AgentState { final_answer, ..state });
    }

    info!(hop = state.hop, reply = %reply.trim(), "draft failed self-check, repairing");
    let repair = [
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(evidence),
        ChatMessage::user(format!("{subject}\n\n{REPAIR_INSTRUCTION}")),
    ];
    let final_answer = ctx.generator.generate(&repair, ctx.settings.repair_tokens)?;
    Ok(AgentState { final_answer, ..state })
}

// ── Hop control ──────────────────────────────────────────────────────────────

/// Advance to the next hop or mark the run done.
pub fn hop_control(ctx: &StageContext<'_>, state: AgentState) -> CopilotResult<AgentState> {
    match hop_decision(&state, ctx.settings) {
        HopDecision::Continue => {
            info!(
                hop = state.hop + 1,
                evidence_pdf = state.evidence_pdf.len(),
                "evidence still thin, starting another hop"
            );
            let hop = state.hop + 1;
            Ok(AgentState { hop, ..state })
        }
        HopDecision::Finish => {
            info!(
                hop = state.hop,
                evidence_pdf = state.evidence_pdf.len(),
                evidence_web = state.evidence_web.len(),
                "retrieval loop finished"
            );
            Ok(AgentState { done: true, ..state })
        }
    }
}

// ── Memory update ────────────────────────────────────────────────────────────

/// Extract triples from the final answer into the knowledge store.
///
/// Best-effort: a failed generation call, a reply that is not a JSON array
/// of triples, or a store error is logged and discarded. The state is
/// returned unchanged in every case.
pub fn update_memory(ctx: &StageContext<'_>, state: AgentState) -> CopilotResult<AgentState> {
    let messages = [
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(format!("Answer: {}\n\n{}", state.final_answer, TRIPLE_INSTRUCTION)),
    ];

    let reply = match ctx.generator.generate(&messages, ctx.settings.extract_tokens) {
        Ok(reply) => reply,
        Err(e) => {
            warn!(error = %e, "triple extraction call failed, skipping memory update");
            return Ok(state);
        }
    };

    let triples = match extract_triples(&reply, ctx.settings.max_triples) {
        Ok(triples) => triples,
        Err(e) => {
            warn!(error = %e, "discarding unparseable triple extraction");
            return Ok(state);
        }
    };

    if triples.is_empty() {
        debug!("no triples extracted");
        return Ok(state);
    }
    match ctx.knowledge.add_triples(&triples) {
        Ok(()) => info!(count = triples.len(), "knowledge graph updated"),
        Err(e) => warn!(error = %e, "knowledge store rejected triples"),
    }
    Ok(state)
}
