//! `FlatIndex`: exhaustive inner-product search over the textbook chunks.
//!
//! An index directory holds two artifacts:
//!
//! - `pdf.index` — `{ "dimensions": d, "embedder": name, "vectors": [[f32; d], …] }`
//! - `meta.json` — `[{ "id", "text", "page", "source" }, …]`, row-parallel to `vectors`
//!
//! Vectors are stored L2-normalized, so inner product equals cosine
//! similarity against a normalized query.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use copilot_contracts::{
    error::{CopilotError, CopilotResult},
    state::PdfEvidence,
};
use copilot_core::traits::{Embedder, EvidenceIndex};

use crate::vector::{dot, l2_normalize};

pub const VECTORS_FILE: &str = "pdf.index";
pub const META_FILE: &str = "meta.json";

/// One indexed chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub id: String,
    pub text: String,
    /// 1-based page number.
    pub page: u32,
    pub source: String,
}

/// Contents of `pdf.index`.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct VectorFile {
    pub(crate) dimensions: usize,
    /// Name of the embedder that produced the vectors; empty if unknown.
    #[serde(default)]
    pub(crate) embedder: String,
    pub(crate) vectors: Vec<Vec<f32>>,
}

fn index_error(reason: String) -> CopilotError {
    CopilotError::Index { reason }
}

/// A loaded index plus the embedder used to encode queries.
pub struct FlatIndex {
    records: Vec<ChunkRecord>,
    vectors: Vec<Vec<f32>>,
    dimensions: usize,
    embedder: Box<dyn Embedder>,
}

impl FlatIndex {
    /// Load `pdf.index` and `meta.json` from `dir`.
    ///
    /// Fails with `CopilotError::Index` when either file is missing or
    /// malformed, when the row counts differ, or when a row has the wrong
    /// dimension.
    pub fn open(dir: &Path, embedder: Box<dyn Embedder>) -> CopilotResult<Self> {
        let vector_path = dir.join(VECTORS_FILE);
        let meta_path = dir.join(META_FILE);

        let vector_json = std::fs::read_to_string(&vector_path).map_err(|e| {
            index_error(format!("failed to read '{}': {}", vector_path.display(), e))
        })?;
        let file: VectorFile = serde_json::from_str(&vector_json).map_err(|e| {
            index_error(format!("malformed vector file '{}': {}", vector_path.display(), e))
        })?;

        let meta_json = std::fs::read_to_string(&meta_path)
            .map_err(|e| index_error(format!("failed to read '{}': {}", meta_path.display(), e)))?;
        let records: Vec<ChunkRecord> = serde_json::from_str(&meta_json).map_err(|e| {
            index_error(format!("malformed metadata file '{}': {}", meta_path.display(), e))
        })?;

        if records.len() != file.vectors.len() {
            return Err(index_error(format!(
                "index has {} vectors but {} metadata records",
                file.vectors.len(),
                records.len()
            )));
        }
        if let Some(row) = file.vectors.iter().position(|v| v.len() != file.dimensions) {
            return Err(index_error(format!(
                "vector {} has dimension {}, expected {}",
                row,
                file.vectors[row].len(),
                file.dimensions
            )));
        }
        if !file.embedder.is_empty() && file.embedder != embedder.name() {
            warn!(
                built_with = %file.embedder,
                querying_with = %embedder.name(),
                "index was built with a different embedder"
            );
        }

        info!(dir = %dir.display(), chunks = records.len(), dimensions = file.dimensions, "index opened");
        Ok(Self {
            records,
            vectors: file.vectors,
            dimensions: file.dimensions,
            embedder,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Metadata records for `ids`, in the order requested. Unknown ids are
    /// skipped.
    pub fn read(&self, ids: &[String]) -> Vec<ChunkRecord> {
        ids.iter()
            .filter_map(|id| self.records.iter().find(|r| &r.id == id).cloned())
            .collect()
    }

    fn embed_query(&self, query: &str) -> CopilotResult<Vec<f32>> {
        let mut vectors = self.embedder.embed(&[query.to_string()])?;
        let mut vector = vectors
            .pop()
            .ok_or_else(|| index_error("embedder returned no vector for the query".into()))?;
        if vector.len() != self.dimensions {
            return Err(index_error(format!(
                "query embedding has dimension {}, index expects {}",
                vector.len(),
                self.dimensions
            )));
        }
        l2_normalize(&mut vector);
        Ok(vector)
    }
}

impl EvidenceIndex for FlatIndex {
    /// Score every row against the query and return the best `k`.
    ///
    /// Ties keep index order. An empty or whitespace-only query and an empty
    /// corpus are errors.
    fn search(&self, query: &str, k: usize) -> CopilotResult<Vec<PdfEvidence>> {
        if query.trim().is_empty() {
            return Err(index_error("query is empty".into()));
        }
        if self.records.is_empty() {
            return Err(index_error("index contains no chunks".into()));
        }

        let query_vector = self.embed_query(query)?;
        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(row, v)| (row, dot(&query_vector, v)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        debug!(query = %query, k, returned = scored.len(), "index search");
        Ok(scored
            .into_iter()
            .map(|(row, score)| {
                let record = &self.records[row];
                PdfEvidence {
                    id: record.id.clone(),
                    text: record.text.clone(),
                    page: record.page,
                    score,
                    source: record.source.clone(),
                }
            })
            .collect())
    }
}
