//! Configuration schema.
//!
//! Every section and field has a default, so an empty TOML document is a
//! valid configuration. Loading, validation, and environment overrides live
//! in `copilot-config`.

use serde::{Deserialize, Serialize};

/// Top-level configuration, deserialized from TOML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub generation: GenerationSettings,
    #[serde(default)]
    pub web: WebSettings,
    #[serde(default)]
    pub index: IndexSettings,
    #[serde(default)]
    pub memory: MemorySettings,
}

/// `[engine]` section: retrieval sizes, thresholds, and token budgets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Planned sub-queries beyond this count are dropped.
    pub max_subqueries: usize,
    /// Upper bound on hops per question (hops are 0-indexed).
    pub max_hops: u32,
    /// Passages requested from the index for the active query.
    pub corpus_k: usize,
    /// Passages requested for each knowledge-graph expansion query.
    pub expansion_k: usize,
    /// Expansion terms used per retrieval.
    pub max_expansions: usize,
    /// Query words shorter than this are not offered to the knowledge store.
    pub min_term_len: usize,
    /// A first-hop retrieval with no hit at or above this score falls back to web.
    pub web_score_threshold: f32,
    /// Web search results requested.
    pub web_k: usize,
    /// Leading search results whose pages are fetched.
    pub web_fetch_limit: usize,
    pub digest_pdf_items: usize,
    pub digest_pdf_chars: usize,
    pub digest_web_items: usize,
    pub digest_web_chars: usize,
    /// Corpus evidence at or above this count stops the hop loop.
    pub min_corpus_items: usize,
    /// Triples accepted from one extraction.
    pub max_triples: usize,
    pub plan_tokens: u32,
    pub synthesize_tokens: u32,
    pub verify_tokens: u32,
    pub repair_tokens: u32,
    pub extract_tokens: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_subqueries: 3,
            max_hops: 3,
            corpus_k: 6,
            expansion_k: 3,
            max_expansions: 2,
            min_term_len: 3,
            web_score_threshold: 0.55,
            web_k: 5,
            web_fetch_limit: 3,
            digest_pdf_items: 6,
            digest_pdf_chars: 600,
            digest_web_items: 2,
            digest_web_chars: 800,
            min_corpus_items: 3,
            max_triples: 5,
            plan_tokens: 250,
            synthesize_tokens: 900,
            verify_tokens: 3,
            repair_tokens: 700,
            extract_tokens: 300,
        }
    }
}

/// `[generation]` section: the chat-completions and embeddings backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            embedding_model: default_embedding_model(),
            api_key_env: default_api_key_env(),
            temperature: default_temperature(),
            timeout_secs: default_generation_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-3.5-turbo".into()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_generation_timeout() -> u64 {
    60
}

/// `[web]` section: search/fetch timeouts and retry policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSettings {
    pub search_timeout_secs: u64,
    pub read_timeout_secs: u64,
    /// Extra attempts after the first one fails.
    pub max_retries: u32,
    /// Backoff base in seconds: sleep is `base * 2^attempt + U(0, base)`.
    pub backoff_base_secs: f64,
    /// Cleaned page text is truncated to this many characters.
    pub max_page_chars: usize,
    pub user_agent: String,
}

impl Default for WebSettings {
    fn default() -> Self {
        Self {
            search_timeout_secs: 6,
            read_timeout_secs: 10,
            max_retries: 2,
            backoff_base_secs: 0.6,
            max_page_chars: 15_000,
            user_agent: "rl-copilot/1.0".into(),
        }
    }
}

/// Which embedding backend the evidence index uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmbedderKind {
    /// The `[generation]` embeddings endpoint.
    Openai,
    /// Deterministic hashed term frequencies; works offline.
    Hashed,
}

/// `[index]` section: where the textbook index lives and how it is chunked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    pub dir: String,
    pub window_words: usize,
    /// Words the window advances by; `window_words - stride_words` is the overlap.
    pub stride_words: usize,
    pub embedder: EmbedderKind,
    pub hashed_dimensions: usize,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            dir: "index".into(),
            window_words: 1000,
            stride_words: 800,
            embedder: EmbedderKind::Openai,
            hashed_dimensions: 384,
        }
    }
}

/// `[memory]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemorySettings {
    /// JSON snapshot of the knowledge graph. In-memory only when absent.
    #[serde(default)]
    pub snapshot: Option<String>,
}
