//! Knowledge-graph fact types.

use serde::{Deserialize, Serialize};

/// A directed, labeled fact: `head --relation--> tail`.
///
/// Entities are identified by exact string equality; no normalization is
/// applied anywhere in the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triple {
    pub head: String,
    pub relation: String,
    pub tail: String,
}

impl Triple {
    pub fn new(
        head: impl Into<String>,
        relation: impl Into<String>,
        tail: impl Into<String>,
    ) -> Self {
        Self {
            head: head.into(),
            relation: relation.into(),
            tail: tail.into(),
        }
    }
}
