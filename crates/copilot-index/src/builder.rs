//! Building an index directory from extracted page text.
//!
//! Text extraction from the PDF itself happens outside this crate; the
//! builder consumes a JSON array of `{ "page": n, "text": "…" }` objects
//! with 1-based page numbers.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use copilot_contracts::{
    error::{CopilotError, CopilotResult},
    settings::IndexSettings,
};
use copilot_core::traits::Embedder;

use crate::{
    chunk::chunk_words,
    store::{ChunkRecord, VectorFile, META_FILE, VECTORS_FILE},
    vector::l2_normalize,
};

/// Source label stamped on every chunk built from the textbook.
pub const PDF_SOURCE: &str = "pdf";

/// Chunks sent to the embedder per call.
const EMBED_BATCH: usize = 64;

/// Extracted text of one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageText {
    pub page: u32,
    pub text: String,
}

/// Parse a pages file.
pub fn load_pages(path: &Path) -> CopilotResult<Vec<PageText>> {
    let contents = std::fs::read_to_string(path).map_err(|e| CopilotError::Io {
        reason: format!("failed to read pages file '{}': {}", path.display(), e),
    })?;
    serde_json::from_str(&contents).map_err(|e| CopilotError::Index {
        reason: format!("malformed pages file '{}': {}", path.display(), e),
    })
}

/// What a build produced.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildSummary {
    pub chunks: usize,
    pub dimensions: usize,
}

/// Chunks pages, embeds the chunks, and writes both index artifacts.
pub struct IndexBuilder {
    window_words: usize,
    stride_words: usize,
}

impl IndexBuilder {
    pub fn new(window_words: usize, stride_words: usize) -> Self {
        Self { window_words, stride_words }
    }

    pub fn from_settings(settings: &IndexSettings) -> Self {
        Self::new(settings.window_words, settings.stride_words)
    }

    /// Split every page into chunk records with fresh UUIDs, in page order.
    pub fn chunk_pages(&self, pages: &[PageText]) -> Vec<ChunkRecord> {
        pages
            .iter()
            .flat_map(|page| {
                chunk_words(&page.text, self.window_words, self.stride_words)
                    .into_iter()
                    .map(move |text| ChunkRecord {
                        id: Uuid::new_v4().to_string(),
                        text,
                        page: page.page,
                        source: PDF_SOURCE.to_string(),
                    })
            })
            .collect()
    }

    /// Build an index for `pages` into `out_dir`, creating it if needed.
    ///
    /// Existing artifacts in `out_dir` are overwritten. Fails with
    /// `CopilotError::Index` when the pages contain no text, or when the
    /// embedder returns the wrong number of vectors or inconsistent
    /// dimensions.
    pub fn build(
        &self,
        pages: &[PageText],
        embedder: &dyn Embedder,
        out_dir: &Path,
    ) -> CopilotResult<BuildSummary> {
        let records = self.chunk_pages(pages);
        if records.is_empty() {
            return Err(CopilotError::Index {
                reason: "pages contain no text to index".into(),
            });
        }
        info!(pages = pages.len(), chunks = records.len(), embedder = %embedder.name(), "chunked pages");

        let mut vectors = Vec::with_capacity(records.len());
        for batch in records.chunks(EMBED_BATCH) {
            let texts: Vec<String> = batch.iter().map(|r| r.text.clone()).collect();
            let embedded = embedder.embed(&texts)?;
            if embedded.len() != texts.len() {
                return Err(CopilotError::Index {
                    reason: format!(
                        "embedder returned {} vectors for {} chunks",
                        embedded.len(),
                        texts.len()
                    ),
                });
            }
            vectors.extend(embedded);
            debug!(embedded = vectors.len(), total = records.len(), "embedding progress");
        }

        let dimensions = vectors[0].len();
        if dimensions == 0 || vectors.iter().any(|v| v.len() != dimensions) {
            return Err(CopilotError::Index {
                reason: "embedder returned vectors of inconsistent or zero dimension".into(),
            });
        }
        for v in vectors.iter_mut() {
            l2_normalize(v);
        }

        std::fs::create_dir_all(out_dir).map_err(|e| CopilotError::Io {
            reason: format!("failed to create index directory '{}': {}", out_dir.display(), e),
        })?;
        let vector_file = VectorFile {
            dimensions,
            embedder: embedder.name().to_string(),
            vectors,
        };
        write_json(&out_dir.join(VECTORS_FILE), &vector_file)?;
        write_json(&out_dir.join(META_FILE), &records)?;

        info!(dir = %out_dir.display(), chunks = records.len(), dimensions, "index written");
        Ok(BuildSummary { chunks: records.len(), dimensions })
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> CopilotResult<()> {
    let json = serde_json::to_string(value).map_err(|e| CopilotError::Index {
        reason: format!("failed to serialize '{}': {}", path.display(), e),
    })?;
    std::fs::write(path, json).map_err(|e| CopilotError::Io {
        reason: format!("failed to write '{}': {}", path.display(), e),
    })
}
