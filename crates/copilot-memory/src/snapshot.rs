//! JSON snapshots of a `GraphMemory`.
//!
//! Only edges are stored; nodes are rebuilt from edge endpoints on load.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use copilot_contracts::{
    error::{CopilotError, CopilotResult},
    knowledge::Triple,
};

use crate::graph::GraphMemory;

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    triples: Vec<Triple>,
}

impl GraphMemory {
    /// Write every edge to `path` as pretty-printed JSON, replacing any
    /// existing file.
    pub fn save(&self, path: &Path) -> CopilotResult<()> {
        let snapshot = Snapshot { triples: self.triples()? };
        let json = serde_json::to_string_pretty(&snapshot).map_err(|e| CopilotError::Knowledge {
            reason: format!("failed to serialize graph snapshot: {}", e),
        })?;
        std::fs::write(path, json).map_err(|e| CopilotError::Io {
            reason: format!("failed to write graph snapshot '{}': {}", path.display(), e),
        })?;

        info!(path = %path.display(), edges = snapshot.triples.len(), "graph snapshot saved");
        Ok(())
    }

    /// Rebuild a graph from a snapshot written by `save`.
    pub fn load(path: &Path) -> CopilotResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| CopilotError::Io {
            reason: format!("failed to read graph snapshot '{}': {}", path.display(), e),
        })?;
        let snapshot: Snapshot =
            serde_json::from_str(&contents).map_err(|e| CopilotError::Knowledge {
                reason: format!("malformed graph snapshot '{}': {}", path.display(), e),
            })?;

        info!(path = %path.display(), edges = snapshot.triples.len(), "graph snapshot loaded");
        Ok(Self::from_triples(snapshot.triples))
    }

    /// `load` when `path` exists, otherwise an empty graph.
    pub fn load_or_default(path: &Path) -> CopilotResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::new())
        }
    }
}
