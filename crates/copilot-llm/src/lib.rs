//! # copilot-llm
//!
//! Blocking clients for OpenAI-compatible HTTP APIs.
//!
//! - [`OpenAiChat`] implements `Generator` via `POST {base_url}/chat/completions`
//! - [`OpenAiEmbedder`] implements `Embedder` via `POST {base_url}/embeddings`
//!
//! Both authenticate with a bearer key read from the environment variable
//! named in `[generation].api_key_env`:
//!
//! ```rust,ignore
//! let key = resolve_api_key(&settings.generation, |k| std::env::var(k).ok())?;
//! let chat = OpenAiChat::new(&settings.generation, key)?;
//! ```

pub mod chat;
pub mod embeddings;
pub mod http;

pub use chat::{parse_chat_response, ChatRequest, OpenAiChat};
pub use embeddings::{parse_embedding_response, OpenAiEmbedder};
pub use http::{endpoint, resolve_api_key};
