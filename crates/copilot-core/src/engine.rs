//! The copilot engine: drives one question through the stage graph.
//!
//! The engine enforces the execution model:
//!
//!   Plan → [RetrieveCorpus → (RetrieveWeb) → Synthesize → SelfCheck → HopControl]* → UpdateMemory
//!
//! Exactly one stage runs at a time, to completion. After every stage the
//! engine consults the transition table, writes one trace record, and moves
//! on. Nothing else in the crate decides what runs next.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use copilot_contracts::{
    error::{CopilotError, CopilotResult},
    execution::{Next, Stage, StepRecord},
    settings::EngineSettings,
    state::{AgentState, RunId},
};

use crate::{
    routing::{route, step_ceiling},
    stages::{self, StageContext},
    traits::{EvidenceIndex, Generator, KnowledgeStore, TraceWriter, WebTools},
};

/// Returned by `Engine::answer` when no final answer was produced.
pub const NO_ANSWER: &str = "(No answer produced)";

/// Everything a finished run leaves behind.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: RunId,
    /// The final answer, or `NO_ANSWER` when it was never written.
    pub answer: String,
    /// The terminal state, for inspection.
    pub state: AgentState,
}

/// The orchestration engine.
///
/// One engine serves many questions. Each call to `run()` starts from a
/// fresh `AgentState`; only the knowledge store carries anything from one
/// run to the next.
pub struct Engine {
    generator: Box<dyn Generator>,
    index: Box<dyn EvidenceIndex>,
    web: Box<dyn WebTools>,
    knowledge: Arc<dyn KnowledgeStore>,
    trace: Box<dyn TraceWriter>,
    settings: EngineSettings,
}

impl Engine {
    /// Create an engine over the given collaborators.
    pub fn new(
        generator: Box<dyn Generator>,
        index: Box<dyn EvidenceIndex>,
        web: Box<dyn WebTools>,
        knowledge: Arc<dyn KnowledgeStore>,
        trace: Box<dyn TraceWriter>,
        settings: EngineSettings,
    ) -> Self {
        Self { generator, index, web, knowledge, trace, settings }
    }

    /// Answer `question`, returning only the text.
    ///
    /// Insufficient evidence is not an error: the generated text says so.
    /// Errors mean a hard dependency (generation service, evidence index,
    /// trace) failed.
    pub fn answer(&self, question: &str) -> CopilotResult<String> {
        self.run(question).map(|outcome| outcome.answer)
    }

    /// Answer `question`, returning the terminal state alongside the text.
    ///
    /// # Errors
    ///
    /// Propagates generation and index failures from any stage except
    /// memory update, trace write failures, and `StateMachine` if the run
    /// exceeds its step ceiling.
    pub fn run(&self, question: &str) -> CopilotResult<RunOutcome> {
        let run_id = RunId::new();
        let run_key = run_id.to_string();
        let ceiling = step_ceiling(&self.settings);

        info!(run_id = %run_key, question = %question, "run starting");

        let ctx = StageContext {
            generator: self.generator.as_ref(),
            index: self.index.as_ref(),
            web: self.web.as_ref(),
            knowledge: self.knowledge.as_ref(),
            settings: &self.settings,
        };

        let mut state = AgentState::new(question);
        let mut stage = Stage::Plan;
        let mut sequence: u64 = 0;

        loop {
            if sequence >= ceiling {
                return Err(CopilotError::StateMachine {
                    reason: format!(
                        "run {run_key} exceeded {ceiling} stage executions at stage '{stage}'"
                    ),
                });
            }

            debug!(run_id = %run_key, sequence, stage = %stage, hop = state.hop, "stage starting");
            state = execute(&ctx, stage, state)?;
            let next = route(stage, &state);

            self.trace.write(&StepRecord {
                run_id: run_key.clone(),
                sequence,
                stage,
                hop: state.hop,
                subqueries: state.subqueries.len(),
                evidence_pdf: state.evidence_pdf.len(),
                evidence_web: state.evidence_web.len(),
                need_web: state.need_web,
                done: state.done,
                next,
                timestamp: Utc::now(),
            })?;
            sequence += 1;

            match next {
                Next::Stage(following) => stage = following,
                Next::End => break,
            }
        }

        self.trace.finalize(&run_key)?;

        let answer = if state.final_answer.trim().is_empty() {
            NO_ANSWER.to_string()
        } else {
            state.final_answer.clone()
        };
        info!(
            run_id = %run_key,
            hops = state.hop + 1,
            evidence_pdf = state.evidence_pdf.len(),
            evidence_web = state.evidence_web.len(),
            "run complete"
        );

        Ok(RunOutcome { run_id, answer, state })
    }
}

fn execute(ctx: &StageContext<'_>, stage: Stage, state: AgentState) -> CopilotResult<AgentState> {
    match stage {
        Stage::Plan => stages::plan(ctx, state),
        Stage::RetrieveCorpus => stages::retrieve_corpus(ctx, state),
        Stage::RetrieveWeb => stages::retrieve_web(ctx, state),
        Stage::Synthesize => stages::synthesize(ctx, state),
        Stage::SelfCheck => stages::self_check(ctx, state),
        Stage::HopControl => stages::hop_control(ctx, state),
        Stage::UpdateMemory => stages::update_memory(ctx, state),
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use copilot_contracts::{
        error::{CopilotError, CopilotResult},
        execution::{Next, Stage, StepRecord},
        knowledge::Triple,
        message::{ChatMessage, Role},
        settings::EngineSettings,
        state::{PdfEvidence, WebHit},
    };

    use crate::prompts::{JUDGE_SYSTEM_PROMPT, PLANNER_INSTRUCTION, REPAIR_INSTRUCTION, TRIPLE_INSTRUCTION};
    use crate::traits::{EvidenceIndex, Generator, KnowledgeStore, TraceWriter, WebTools};

    use super::{Engine, NO_ANSWER};

    // ── Mock helpers ─────────────────────────────────────────────────────────

    /// Which prompt a generation request belongs to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Call {
        Plan,
        Draft,
        Judge,
        Repair,
        Extract,
    }

    fn classify(messages: &[ChatMessage]) -> Call {
        let last = &messages.last().expect("at least one message").content;
        if messages[0].role == Role::System && messages[0].content == JUDGE_SYSTEM_PROMPT {
            Call::Judge
        } else if last.contains(PLANNER_INSTRUCTION) {
            Call::Plan
        } else if last.contains(REPAIR_INSTRUCTION) {
            Call::Repair
        } else if last.contains(TRIPLE_INSTRUCTION) {
            Call::Extract
        } else {
            Call::Draft
        }
    }

    /// A generator that answers each kind of prompt with a fixed reply and
    /// records every call.
    struct ScriptedGenerator {
        plan: String,
        verdict: String,
        extraction: String,
        calls: Arc<Mutex<Vec<(Call, Vec<ChatMessage>)>>>,
    }

    impl ScriptedGenerator {
        fn new(plan: &str, verdict: &str, extraction: &str) -> Self {
            Self {
                plan: plan.to_string(),
                verdict: verdict.to_string(),
                extraction: extraction.to_string(),
                calls: Arc::new(Mutex::new(vec![])),
            }
        }
    }

    impl Generator for ScriptedGenerator {
        fn generate(&self, messages: &[ChatMessage], _max_output_tokens: u32) -> CopilotResult<String> {
            let call = classify(messages);
            self.calls.lock().unwrap().push((call, messages.to_vec()));
            Ok(match call {
                Call::Plan => self.plan.clone(),
                Call::Draft => "draft answer [PDF p.1]".to_string(),
                Call::Judge => self.verdict.clone(),
                Call::Repair => "repaired answer [PDF p.1]".to_string(),
                Call::Extract => self.extraction.clone(),
            })
        }
    }

    /// A generator whose extraction call fails outright.
    struct ExtractionFailsGenerator;

    impl Generator for ExtractionFailsGenerator {
        fn generate(&self, messages: &[ChatMessage], _max_output_tokens: u32) -> CopilotResult<String> {
            match classify(messages) {
                Call::Extract => Err(CopilotError::Generation { reason: "rate limited".to_string() }),
                Call::Judge => Ok("YES".to_string()),
                _ => Ok("text".to_string()),
            }
        }
    }

    /// An index that returns `per_call` hits with the given score for every
    /// query, and records the queries.
    struct MockIndex {
        per_call: usize,
        score: f32,
        queries: Arc<Mutex<Vec<(String, usize)>>>,
    }

    impl MockIndex {
        fn new(per_call: usize, score: f32) -> Self {
            Self { per_call, score, queries: Arc::new(Mutex::new(vec![])) }
        }
    }

    impl EvidenceIndex for MockIndex {
        fn search(&self, query: &str, k: usize) -> CopilotResult<Vec<PdfEvidence>> {
            let mut queries = self.queries.lock().unwrap();
            let call = queries.len();
            queries.push((query.to_string(), k));
            Ok((0..self.per_call.min(k))
                .map(|i| PdfEvidence {
                    id: format!("chunk-{call}-{i}"),
                    text: format!("passage {i} for {query}"),
                    page: i as u32 + 1,
                    score: self.score,
                    source: "pdf".to_string(),
                })
                .collect())
        }
    }

    struct FailingIndex;

    impl EvidenceIndex for FailingIndex {
        fn search(&self, _query: &str, _k: usize) -> CopilotResult<Vec<PdfEvidence>> {
            Err(CopilotError::Index { reason: "empty corpus".to_string() })
        }
    }

    /// Web tools with a fixed hit list; `page_text` is returned for every fetch.
    struct MockWeb {
        hits: Vec<WebHit>,
        page_text: String,
        searches: Arc<Mutex<Vec<String>>>,
        fetches: Arc<Mutex<Vec<String>>>,
    }

    impl MockWeb {
        fn new(urls: &[&str], page_text: &str) -> Self {
            Self {
                hits: urls
                    .iter()
                    .map(|url| WebHit { title: "t".to_string(), url: url.to_string(), snippet: String::new() })
                    .collect(),
                page_text: page_text.to_string(),
                searches: Arc::new(Mutex::new(vec![])),
                fetches: Arc::new(Mutex::new(vec![])),
            }
        }
    }

    impl WebTools for MockWeb {
        fn search(&self, query: &str, k: usize) -> Vec<WebHit> {
            self.searches.lock().unwrap().push(query.to_string());
            self.hits.iter().take(k).cloned().collect()
        }

        fn fetch(&self, url: &str) -> String {
            self.fetches.lock().unwrap().push(url.to_string());
            self.page_text.clone()
        }
    }

    /// A knowledge store with fixed expansions that records insertions.
    struct MockKnowledge {
        expansions: Vec<String>,
        added: Mutex<Vec<Triple>>,
        asked: Mutex<Vec<Vec<String>>>,
    }

    impl MockKnowledge {
        fn new(expansions: &[&str]) -> Self {
            Self {
                expansions: expansions.iter().map(|s| s.to_string()).collect(),
                added: Mutex::new(vec![]),
                asked: Mutex::new(vec![]),
            }
        }
    }

    impl KnowledgeStore for MockKnowledge {
        fn add_triples(&self, triples: &[Triple]) -> CopilotResult<()> {
            self.added.lock().unwrap().extend_from_slice(triples);
            Ok(())
        }

        fn suggest_expansions(&self, terms: &[String]) -> CopilotResult<Vec<String>> {
            self.asked.lock().unwrap().push(terms.to_vec());
            Ok(self.expansions.clone())
        }
    }

    /// A knowledge store whose every call fails.
    #[derive(Default)]
    struct UnavailableKnowledge {
        add_attempts: Mutex<usize>,
    }

    impl KnowledgeStore for UnavailableKnowledge {
        fn add_triples(&self, _triples: &[Triple]) -> CopilotResult<()> {
            *self.add_attempts.lock().unwrap() += 1;
            Err(CopilotError::Knowledge { reason: "graph store offline".to_string() })
        }

        fn suggest_expansions(&self, _terms: &[String]) -> CopilotResult<Vec<String>> {
            Err(CopilotError::Knowledge { reason: "graph store offline".to_string() })
        }
    }

    /// A trace writer that records every call for later inspection.
    struct MockTrace {
        records: Arc<Mutex<Vec<StepRecord>>>,
        finalized: Arc<Mutex<Vec<String>>>,
    }

    impl MockTrace {
        fn new() -> Self {
            Self { records: Arc::new(Mutex::new(vec![])), finalized: Arc::new(Mutex::new(vec![])) }
        }
    }

    impl TraceWriter for MockTrace {
        fn write(&self, record: &StepRecord) -> CopilotResult<()> {
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }

        fn finalize(&self, run_id: &str) -> CopilotResult<()> {
            self.finalized.lock().unwrap().push(run_id.to_string());
            Ok(())
        }
    }

    /// Handles kept by a test after the mocks are moved into the engine.
    struct Probe {
        calls: Arc<Mutex<Vec<(Call, Vec<ChatMessage>)>>>,
        queries: Arc<Mutex<Vec<(String, usize)>>>,
        searches: Arc<Mutex<Vec<String>>>,
        fetches: Arc<Mutex<Vec<String>>>,
        records: Arc<Mutex<Vec<StepRecord>>>,
        finalized: Arc<Mutex<Vec<String>>>,
        knowledge: Arc<MockKnowledge>,
    }

    impl Probe {
        fn stages(&self) -> Vec<Stage> {
            self.records.lock().unwrap().iter().map(|r| r.stage).collect()
        }

        fn calls_of(&self, kind: Call) -> usize {
            self.calls.lock().unwrap().iter().filter(|(c, _)| *c == kind).count()
        }
    }

    fn build(
        generator: ScriptedGenerator,
        index: MockIndex,
        web: MockWeb,
        knowledge: MockKnowledge,
    ) -> (Engine, Probe) {
        let trace = MockTrace::new();
        let knowledge = Arc::new(knowledge);
        let probe = Probe {
            calls: generator.calls.clone(),
            queries: index.queries.clone(),
            searches: web.searches.clone(),
            fetches: web.fetches.clone(),
            records: trace.records.clone(),
            finalized: trace.finalized.clone(),
            knowledge: knowledge.clone(),
        };
        let engine = Engine::new(
            Box::new(generator),
            Box::new(index),
            Box::new(web),
            knowledge,
            Box::new(trace),
            EngineSettings::default(),
        );
        (engine, probe)
    }

    const PLAN: &str = "- Bellman optimality equation\n- action-value function\n- greedy policy";
    const TRIPLES: &str = r#"[["Q-learning", "is-a", "off-policy method"]]"#;

    // ── Test cases ────────────────────────────────────────────────────────────

    /// A strong first-hop hit skips the web and finishes after one hop
    /// because six passages is already thick evidence.
    #[test]
    fn strong_hit_skips_web() {
        let (engine, probe) = build(
            ScriptedGenerator::new(PLAN, "YES", TRIPLES),
            MockIndex::new(6, 0.9),
            MockWeb::new(&["https://example.org"], "page"),
            MockKnowledge::new(&[]),
        );

        let outcome = engine.run("What is Q*?").unwrap();

        assert!(!outcome.state.need_web);
        assert!(outcome.state.done);
        assert_eq!(outcome.state.hop, 0);
        assert!(probe.searches.lock().unwrap().is_empty(), "web must not be searched");
        assert_eq!(
            probe.stages(),
            vec![
                Stage::Plan,
                Stage::RetrieveCorpus,
                Stage::Synthesize,
                Stage::SelfCheck,
                Stage::HopControl,
                Stage::UpdateMemory,
            ]
        );
        assert_eq!(outcome.answer, "draft answer [PDF p.1]");
    }

    /// A single 0.9 hit is enough to keep `need_web` false.
    #[test]
    fn one_strong_hit_is_enough() {
        let (engine, probe) = build(
            ScriptedGenerator::new(PLAN, "YES", "[]"),
            MockIndex::new(1, 0.9),
            MockWeb::new(&["https://example.org"], "page"),
            MockKnowledge::new(&[]),
        );

        let outcome = engine.run("q").unwrap();

        let records = probe.records.lock().unwrap();
        assert!(records.iter().all(|r| r.stage != Stage::RetrieveWeb));
        assert!(!records[1].need_web);
        assert_eq!(records[1].next, Next::Stage(Stage::Synthesize));
        assert!(outcome.state.evidence_web.is_empty());
    }

    /// A blank plan leaves no sub-queries, so retrieval uses the raw question.
    #[test]
    fn blank_plan_falls_back_to_question() {
        let (engine, probe) = build(
            ScriptedGenerator::new("", "YES", "[]"),
            MockIndex::new(6, 0.9),
            MockWeb::new(&[], ""),
            MockKnowledge::new(&[]),
        );

        let outcome = engine.run("Explain eligibility traces").unwrap();

        assert!(outcome.state.subqueries.is_empty());
        let queries = probe.queries.lock().unwrap();
        assert_eq!(queries[0], ("Explain eligibility traces".to_string(), 6));
    }

    /// The first hop's query is the first planned sub-query.
    #[test]
    fn first_hop_uses_first_subquery() {
        let (engine, probe) = build(
            ScriptedGenerator::new(PLAN, "YES", "[]"),
            MockIndex::new(6, 0.9),
            MockWeb::new(&[], ""),
            MockKnowledge::new(&[]),
        );

        let outcome = engine.run("q").unwrap();

        assert_eq!(outcome.state.subqueries.len(), 3);
        assert_eq!(probe.queries.lock().unwrap()[0].0, "Bellman optimality equation");
    }

    /// Low first-hop scores trigger the web exactly once. When the web yields
    /// nothing, later hops with low scores again must not go back to it.
    #[test]
    fn web_fallback_only_on_first_hop() {
        let (engine, probe) = build(
            ScriptedGenerator::new(PLAN, "YES", "[]"),
            MockIndex::new(1, 0.2),
            MockWeb::new(&["https://a.example", "https://b.example"], ""),
            MockKnowledge::new(&[]),
        );

        let outcome = engine.run("q").unwrap();

        let records = probe.records.lock().unwrap();
        let corpus: Vec<&StepRecord> =
            records.iter().filter(|r| r.stage == Stage::RetrieveCorpus).collect();
        assert_eq!(corpus.len(), 3, "one corpus retrieval per hop");
        assert!(corpus[0].need_web, "first hop with weak hits must want the web");
        assert!(!corpus[1].need_web, "hop 1 must never want the web");
        assert!(!corpus[2].need_web, "hop 2 must never want the web");

        assert_eq!(probe.searches.lock().unwrap().len(), 1, "web searched exactly once");
        assert_eq!(probe.fetches.lock().unwrap().len(), 2);
        assert!(outcome.state.evidence_web.is_empty(), "empty pages are dropped");
        assert_eq!(outcome.state.hop, 2);
    }

    /// Once web evidence exists, the loop finishes regardless of corpus size.
    #[test]
    fn web_evidence_stops_hopping() {
        let (engine, probe) = build(
            ScriptedGenerator::new(PLAN, "YES", "[]"),
            MockIndex::new(1, 0.2),
            MockWeb::new(&["https://a.example", "", "https://c.example", "https://d.example"], "page text"),
            MockKnowledge::new(&[]),
        );

        let outcome = engine.run("q").unwrap();

        assert_eq!(outcome.state.hop, 0);
        assert!(outcome.state.done);
        // Only the first three hits are considered; the empty URL is skipped.
        assert_eq!(
            *probe.fetches.lock().unwrap(),
            vec!["https://a.example".to_string(), "https://c.example".to_string()]
        );
        assert_eq!(outcome.state.evidence_web.len(), 2);
        assert!(!outcome.state.need_web, "web retrieval clears the flag");
    }

    /// Hops stay within 0..=2 and evidence never shrinks between stages.
    #[test]
    fn hops_are_bounded_and_evidence_is_append_only() {
        let (engine, probe) = build(
            ScriptedGenerator::new("", "NO", "[]"),
            MockIndex::new(0, 0.0),
            MockWeb::new(&[], ""),
            MockKnowledge::new(&[]),
        );

        let outcome = engine.run("q").unwrap();

        let records = probe.records.lock().unwrap();
        assert!(records.iter().all(|r| r.hop <= 2));
        for pair in records.windows(2) {
            assert!(pair[1].hop >= pair[0].hop, "hop must not decrease");
            assert!(pair[1].evidence_pdf >= pair[0].evidence_pdf);
            assert!(pair[1].evidence_web >= pair[0].evidence_web);
        }
        assert_eq!(outcome.state.hop, 2);
        assert_eq!(records.iter().filter(|r| r.stage == Stage::Synthesize).count(), 3);
        assert_eq!(records.iter().filter(|r| r.done).count(), 2, "hop_control and update_memory");
    }

    /// Every hop re-runs synthesis and self-check over cumulative evidence.
    #[test]
    fn each_hop_resynthesizes_over_all_evidence() {
        let (engine, probe) = build(
            ScriptedGenerator::new("", "YES", "[]"),
            MockIndex::new(1, 0.9),
            MockWeb::new(&[], ""),
            MockKnowledge::new(&[]),
        );

        let outcome = engine.run("q").unwrap();

        assert_eq!(outcome.state.evidence_pdf.len(), 3);
        assert_eq!(outcome.state.hop, 2);
        assert_eq!(probe.calls_of(Call::Draft), 3);
        assert_eq!(probe.calls_of(Call::Judge), 3);

        let calls = probe.calls.lock().unwrap();
        let last_draft = calls.iter().rev().find(|(c, _)| *c == Call::Draft).unwrap();
        let prompt = &last_draft.1[1].content;
        assert_eq!(prompt.matches("[p.1]").count(), 3, "last draft must see every hop's passage");
    }

    /// A failed verdict triggers exactly one repair whose text becomes final.
    #[test]
    fn failed_self_check_repairs_once() {
        let (engine, probe) = build(
            ScriptedGenerator::new(PLAN, "NO", "[]"),
            MockIndex::new(6, 0.9),
            MockWeb::new(&[], ""),
            MockKnowledge::new(&[]),
        );

        let answer = engine.answer("q").unwrap();

        assert_eq!(answer, "repaired answer [PDF p.1]");
        assert_eq!(probe.calls_of(Call::Judge), 1);
        assert_eq!(probe.calls_of(Call::Repair), 1);
    }

    /// An ambiguous verdict is a failure, never a pass.
    #[test]
    fn ambiguous_verdict_fails_closed() {
        let (engine, probe) = build(
            ScriptedGenerator::new(PLAN, "Probably", "[]"),
            MockIndex::new(6, 0.9),
            MockWeb::new(&[], ""),
            MockKnowledge::new(&[]),
        );

        let answer = engine.answer("q").unwrap();

        assert_eq!(answer, "repaired answer [PDF p.1]");
        assert_eq!(probe.calls_of(Call::Repair), 1);
    }

    /// The judge sees the evidence before it sees the draft.
    #[test]
    fn judge_is_shown_evidence() {
        let (engine, probe) = build(
            ScriptedGenerator::new(PLAN, "YES", "[]"),
            MockIndex::new(6, 0.9),
            MockWeb::new(&[], ""),
            MockKnowledge::new(&[]),
        );

        engine.run("q").unwrap();

        let calls = probe.calls.lock().unwrap();
        let (_, judge) = calls.iter().find(|(c, _)| *c == Call::Judge).unwrap();
        assert_eq!(judge.len(), 3);
        assert!(judge[1].content.starts_with("Evidence:\n[p."));
        assert!(judge[2].content.contains("draft answer"));
    }

    /// Valid triples reach the knowledge store.
    #[test]
    fn extracted_triples_are_stored() {
        let (engine, probe) = build(
            ScriptedGenerator::new(PLAN, "YES", TRIPLES),
            MockIndex::new(6, 0.9),
            MockWeb::new(&[], ""),
            MockKnowledge::new(&[]),
        );

        engine.run("q").unwrap();

        assert_eq!(
            *probe.knowledge.added.lock().unwrap(),
            vec![Triple::new("Q-learning", "is-a", "off-policy method")]
        );
    }

    /// Malformed extraction output is discarded without affecting the answer.
    #[test]
    fn malformed_extraction_is_discarded() {
        for reply in [
            "not json at all",
            r#"{"head": "a", "relation": "b", "tail": "c"}"#,
            r#"[["a", "b"], ["a", "b", "c", "d"]]"#,
        ] {
            let (engine, probe) = build(
                ScriptedGenerator::new(PLAN, "YES", reply),
                MockIndex::new(6, 0.9),
                MockWeb::new(&[], ""),
                MockKnowledge::new(&[]),
            );

            let answer = engine.answer("q").unwrap();

            assert_eq!(answer, "draft answer [PDF p.1]", "reply {reply:?} must not affect the answer");
            assert!(probe.knowledge.added.lock().unwrap().is_empty(), "reply {reply:?} must store nothing");
        }
    }

    /// A failing extraction call is swallowed too.
    #[test]
    fn extraction_call_failure_is_discarded() {
        let engine = Engine::new(
            Box::new(ExtractionFailsGenerator),
            Box::new(MockIndex::new(6, 0.9)),
            Box::new(MockWeb::new(&[], "")),
            Arc::new(MockKnowledge::new(&[])),
            Box::new(MockTrace::new()),
            EngineSettings::default(),
        );

        assert_eq!(engine.answer("q").unwrap(), "text");
    }

    /// Knowledge-graph expansions add one extra search each, capped at two.
    #[test]
    fn expansions_widen_the_query() {
        let (engine, probe) = build(
            ScriptedGenerator::new("- Q-learning convergence", "YES", "[]"),
            MockIndex::new(6, 0.9),
            MockWeb::new(&[], ""),
            MockKnowledge::new(&["off-policy method", "tabular methods", "ignored"]),
        );

        let outcome = engine.run("q").unwrap();

        let queries = probe.queries.lock().unwrap();
        assert_eq!(
            *queries,
            vec![
                ("Q-learning convergence".to_string(), 6),
                ("Q-learning convergence off-policy method".to_string(), 3),
                ("Q-learning convergence tabular methods".to_string(), 3),
            ]
        );
        assert_eq!(outcome.state.evidence_pdf.len(), 12);
        assert_eq!(
            probe.knowledge.asked.lock().unwrap()[0],
            vec!["Q-learning".to_string(), "convergence".to_string()]
        );
    }

    /// Short words are not offered to the knowledge store.
    #[test]
    fn short_terms_are_not_expanded() {
        let (engine, probe) = build(
            ScriptedGenerator::new("- TD vs MC in RL", "YES", "[]"),
            MockIndex::new(6, 0.9),
            MockWeb::new(&[], ""),
            MockKnowledge::new(&[]),
        );

        engine.run("q").unwrap();

        assert!(probe.knowledge.asked.lock().unwrap()[0].is_empty());
    }

    /// A failing knowledge store degrades to un-expanded retrieval and never
    /// fails the answer.
    #[test]
    fn knowledge_store_failure_degrades() {
        let generator = ScriptedGenerator::new("- Q-learning convergence", "YES", TRIPLES);
        let index = MockIndex::new(6, 0.9);
        let queries = index.queries.clone();
        let knowledge = Arc::new(UnavailableKnowledge::default());

        let engine = Engine::new(
            Box::new(generator),
            Box::new(index),
            Box::new(MockWeb::new(&[], "")),
            knowledge.clone(),
            Box::new(MockTrace::new()),
            EngineSettings::default(),
        );

        let outcome = engine.run("q").unwrap();

        assert_eq!(outcome.answer, "draft answer [PDF p.1]");
        assert_eq!(*queries.lock().unwrap(), vec![("Q-learning convergence".to_string(), 6)]);
        assert_eq!(outcome.state.evidence_pdf.len(), 6);
        assert_eq!(*knowledge.add_attempts.lock().unwrap(), 1, "triples were offered once");
    }

    /// Index failures abort the run.
    #[test]
    fn index_failure_is_fatal() {
        let engine = Engine::new(
            Box::new(ScriptedGenerator::new(PLAN, "YES", "[]")),
            Box::new(FailingIndex),
            Box::new(MockWeb::new(&[], "")),
            Arc::new(MockKnowledge::new(&[])),
            Box::new(MockTrace::new()),
            EngineSettings::default(),
        );

        match engine.answer("q") {
            Err(CopilotError::Index { reason }) => assert!(reason.contains("empty corpus")),
            other => panic!("expected Index error, got {:?}", other),
        }
    }

    /// An empty final answer is reported as the fallback sentinel.
    #[test]
    fn empty_final_answer_yields_sentinel() {
        struct SilentGenerator;
        impl Generator for SilentGenerator {
            fn generate(&self, _messages: &[ChatMessage], _max: u32) -> CopilotResult<String> {
                Ok(String::new())
            }
        }

        let engine = Engine::new(
            Box::new(SilentGenerator),
            Box::new(MockIndex::new(6, 0.9)),
            Box::new(MockWeb::new(&[], "")),
            Arc::new(MockKnowledge::new(&[])),
            Box::new(MockTrace::new()),
            EngineSettings::default(),
        );

        assert_eq!(engine.answer("q").unwrap(), NO_ANSWER);
    }

    /// The trace gets one record per stage and is finalized once per run.
    #[test]
    fn trace_is_sequenced_and_finalized() {
        let (engine, probe) = build(
            ScriptedGenerator::new(PLAN, "YES", "[]"),
            MockIndex::new(6, 0.9),
            MockWeb::new(&[], ""),
            MockKnowledge::new(&[]),
        );

        let outcome = engine.run("q").unwrap();

        let records = probe.records.lock().unwrap();
        for (idx, record) in records.iter().enumerate() {
            assert_eq!(record.sequence, idx as u64);
            assert_eq!(record.run_id, outcome.run_id.to_string());
        }
        assert_eq!(records.last().unwrap().next, Next::End);
        assert_eq!(*probe.finalized.lock().unwrap(), vec![outcome.run_id.to_string()]);
    }
}
