//! # copilot-config
//!
//! TOML configuration for the copilot.
//!
//! Every field has a default (see `copilot_contracts::settings`), so a
//! document only needs the values it changes:
//!
//! ```toml
//! [engine]
//! max_hops = 2
//!
//! [index]
//! dir = "data/index"
//! embedder = "hashed"
//! ```
//!
//! ```rust,ignore
//! let settings = copilot_config::load(Some(Path::new("copilot.toml")))?;
//! ```

pub mod loader;
pub mod validate;

pub use loader::{apply_env_overrides, from_file, from_toml_str, load};
pub use validate::{validate, HOP_LIMIT, MAX_BACKOFF_BASE_SECS, SUBQUERY_LIMIT};

// ── Tests ─────────────────────────────────────────────────────────────────────
