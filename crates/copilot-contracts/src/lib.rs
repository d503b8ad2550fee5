//! # copilot-contracts
//!
//! Shared types, settings, and errors for the copilot question-answering
//! engine.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate — only data definitions and error types.

pub mod error;
pub mod execution;
pub mod knowledge;
pub mod message;
pub mod settings;
pub mod state;
