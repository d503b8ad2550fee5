//! `GraphMemory`: the process-wide knowledge graph.
//!
//! Nodes are entity strings compared exactly. Edges are `(head, tail, label)`
//! and parallel edges between the same pair are kept, so re-asserting a fact
//! adds another edge rather than replacing the first.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use copilot_contracts::{
    error::{CopilotError, CopilotResult},
    knowledge::Triple,
};
use copilot_core::traits::KnowledgeStore;

/// Neighbours returned per entity when expanding a query.
pub const DEFAULT_MAX_DEGREE: usize = 2;

#[derive(Default)]
pub(crate) struct Graph {
    /// Every entity seen as a head or tail.
    pub(crate) nodes: HashSet<String>,
    /// Edges in insertion order.
    pub(crate) edges: Vec<Triple>,
    /// Head entity → indices into `edges`, in insertion order.
    pub(crate) outgoing: HashMap<String, Vec<usize>>,
}

impl Graph {
    pub(crate) fn insert(&mut self, triple: Triple) {
        self.nodes.insert(triple.head.clone());
        self.nodes.insert(triple.tail.clone());
        self.outgoing
            .entry(triple.head.clone())
            .or_default()
            .push(self.edges.len());
        self.edges.push(triple);
    }

    /// Distinct out-neighbours of `entity` in first-seen order, at most `max_degree`.
    fn neighbors(&self, entity: &str, max_degree: usize) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let Some(indices) = self.outgoing.get(entity) else {
            return out;
        };
        for &idx in indices {
            if out.len() >= max_degree {
                break;
            }
            let tail = &self.edges[idx].tail;
            if seen.insert(tail.as_str()) {
                out.push(tail.clone());
            }
        }
        out
    }
}

/// An in-memory directed labeled multigraph behind a `Mutex`.
///
/// Share one instance across runs with `Arc<GraphMemory>`.
#[derive(Default)]
pub struct GraphMemory {
    pub(crate) graph: Mutex<Graph>,
}

impl GraphMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph pre-populated with `triples`.
    pub fn from_triples(triples: impl IntoIterator<Item = Triple>) -> Self {
        let mut graph = Graph::default();
        for triple in triples {
            graph.insert(triple);
        }
        Self { graph: Mutex::new(graph) }
    }

    pub(crate) fn lock(&self) -> CopilotResult<MutexGuard<'_, Graph>> {
        self.graph.lock().map_err(|e| CopilotError::Knowledge {
            reason: format!("graph lock poisoned: {}", e),
        })
    }

    /// Up to `max_degree` distinct entities reachable from `entity` by one
    /// outbound edge. Unknown entities have no neighbours.
    pub fn neighbors(&self, entity: &str, max_degree: usize) -> CopilotResult<Vec<String>> {
        Ok(self.lock()?.neighbors(entity, max_degree))
    }

    /// Every stored edge, in insertion order.
    pub fn triples(&self) -> CopilotResult<Vec<Triple>> {
        Ok(self.lock()?.edges.clone())
    }

    pub fn node_count(&self) -> CopilotResult<usize> {
        Ok(self.lock()?.nodes.len())
    }

    pub fn edge_count(&self) -> CopilotResult<usize> {
        Ok(self.lock()?.edges.len())
    }
}

impl KnowledgeStore for GraphMemory {
    fn add_triples(&self, triples: &[Triple]) -> CopilotResult<()> {
        let mut graph = self.lock()?;
        for triple in triples {
            graph.insert(triple.clone());
        }
        debug!(added = triples.len(), edges = graph.edges.len(), "triples stored");
        Ok(())
    }

    /// Union of the neighbours of every term, deduplicated in first-seen
    /// order.
    fn suggest_expansions(&self, terms: &[String]) -> CopilotResult<Vec<String>> {
        let graph = self.lock()?;
        let mut seen = HashSet::new();
        let mut expansions = Vec::new();
        for term in terms {
            for neighbour in graph.neighbors(term, DEFAULT_MAX_DEGREE) {
                if seen.insert(neighbour.clone()) {
                    expansions.push(neighbour);
                }
            }
        }
        Ok(expansions)
    }
}
