//! Runtime error types for the copilot engine.
//!
//! All fallible operations return `CopilotResult<T>`. Variants name the
//! collaborator that failed so the CLI can report something actionable.

use thiserror::Error;

/// The unified error type for the copilot crates.
#[derive(Debug, Error)]
pub enum CopilotError {
    /// The generation service failed or returned an unusable response.
    #[error("generation failed: {reason}")]
    Generation { reason: String },

    /// The evidence index rejected a query or could not be loaded.
    ///
    /// Fatal for the run: the engine has no recovery path for a broken index.
    #[error("evidence index error: {reason}")]
    Index { reason: String },

    /// The embedding backend failed.
    #[error("embedding failed: {reason}")]
    Embedding { reason: String },

    /// Web search or fetch failed. Never escapes the web tools.
    #[error("web tools error: {reason}")]
    Web { reason: String },

    /// The knowledge store could not be read, written, or persisted.
    #[error("knowledge store error: {reason}")]
    Knowledge { reason: String },

    /// The stage trace could not record a step.
    #[error("trace write failed: {reason}")]
    Trace { reason: String },

    /// The engine reached an illegal transition or exceeded its step ceiling.
    #[error("state machine error: {reason}")]
    StateMachine { reason: String },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    Config { reason: String },

    /// Filesystem I/O failed.
    #[error("I/O error: {reason}")]
    Io { reason: String },
}

/// Convenience alias used throughout the copilot crates.
pub type CopilotResult<T> = Result<T, CopilotError>;
