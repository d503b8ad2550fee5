//! Prompt text sent to the generation service.
//!
//! Stages assemble messages from these constants; nothing else in the crate
//! hard-codes instruction wording.

/// Persona shared by planning, synthesis, repair, and extraction.
pub const SYSTEM_PROMPT: &str = "You are RL Copilot, an assistant for reinforcement learning questions. \
Rely on the reinforcement learning textbook excerpts first and cite their page numbers. \
Cite URLs for anything taken from the web. When the evidence is thin, say so plainly. \
Keep answers short and precise.";

/// Appended to the question when asking for sub-queries.
pub const PLANNER_INSTRUCTION: &str = "\n\nBreak this question into at most 3 search sub-queries \
that together lead to an answer. Use wording a reinforcement learning textbook would use. \
Reply with a bullet list, one sub-query per line.";

pub const CITATION_INSTRUCTION: &str =
    "Cite inline as [PDF p.X] for textbook pages and [URL] for web pages.";

/// System prompt for the grounding gate.
pub const JUDGE_SYSTEM_PROMPT: &str = "You are a strict fact checker. Reply with YES or NO only.";

pub const JUDGE_QUESTION: &str = "Is this answer fully supported by the evidence presented earlier? \
Reply with YES or NO only.";

pub const REPAIR_INSTRUCTION: &str = "This draft is not fully supported by the evidence. \
Rewrite it so that every claim is grounded in the evidence above, and give the corrected \
final answer with citations.";

pub const TRIPLE_INSTRUCTION: &str = "List up to 5 (head, relation, tail) facts about the key \
reinforcement learning concepts in this answer. Reply with a JSON array only, where each \
element is a three-string array [head, relation, tail].";
