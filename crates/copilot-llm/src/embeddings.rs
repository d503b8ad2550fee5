//! Embeddings.

use serde::{Deserialize, Serialize};
use tracing::debug;

use copilot_contracts::{
    error::{CopilotError, CopilotResult},
    settings::GenerationSettings,
};
use copilot_core::traits::Embedder;

use crate::http::{decode, ApiClient};

fn embedding_error(reason: String) -> CopilotError {
    CopilotError::Embedding { reason }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingRow>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingRow {
    index: usize,
    embedding: Vec<f32>,
}

/// Vectors from an embeddings response, ordered by their `index` field.
///
/// Fails unless there is exactly one row per input index in `0..expected`.
pub fn parse_embedding_response(body: &str, expected: usize) -> CopilotResult<Vec<Vec<f32>>> {
    let response: EmbeddingResponse = decode(body, embedding_error)?;
    if response.data.len() != expected {
        return Err(embedding_error(format!(
            "expected {} embeddings, got {}",
            expected,
            response.data.len()
        )));
    }

    let mut slots: Vec<Option<Vec<f32>>> = vec![None; expected];
    for row in response.data {
        let slot = slots
            .get_mut(row.index)
            .ok_or_else(|| embedding_error(format!("embedding index {} out of range", row.index)))?;
        if slot.replace(row.embedding).is_some() {
            return Err(embedding_error(format!("duplicate embedding index {}", row.index)));
        }
    }
    // Every slot is filled: `expected` distinct in-range indices were seen.
    Ok(slots.into_iter().flatten().collect())
}

/// `Embedder` over an OpenAI-compatible `/embeddings` endpoint.
pub struct OpenAiEmbedder {
    api: ApiClient,
    model: String,
}

impl OpenAiEmbedder {
    pub fn new(settings: &GenerationSettings, api_key: String) -> CopilotResult<Self> {
        Ok(Self {
            api: ApiClient::new(settings, api_key, embedding_error)?,
            model: settings.embedding_model.clone(),
        })
    }
}

impl Embedder for OpenAiEmbedder {
    fn embed(&self, texts: &[String]) -> CopilotResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let request = EmbeddingRequest { model: &self.model, input: texts };
        let body = self.api.post_json("embeddings", &request, embedding_error)?;
        let vectors = parse_embedding_response(&body, texts.len())?;

        debug!(model = %self.model, count = vectors.len(), "embeddings");
        Ok(vectors)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_reordered_by_index() {
        let body = r#"{"data": [
            {"index": 1, "embedding": [0.0, 1.0]},
            {"index": 0, "embedding": [1.0, 0.0]}
        ]}"#;
        assert_eq!(parse_embedding_response(body, 2).unwrap(), vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn count_mismatch_is_embedding_error() {
        let body = r#"{"data": [{"index": 0, "embedding": [1.0]}]}"#;
        assert!(matches!(parse_embedding_response(body, 2), Err(CopilotError::Embedding { .. })));
    }

    #[test]
    fn duplicate_or_out_of_range_index_is_rejected() {
        let duplicate = r#"{"data": [
            {"index": 0, "embedding": [1.0]},
            {"index": 0, "embedding": [2.0]}
        ]}"#;
        assert!(parse_embedding_response(duplicate, 2).is_err());

        let out_of_range = r#"{"data": [{"index": 3, "embedding": [1.0]}]}"#;
        assert!(parse_embedding_response(out_of_range, 1).is_err());
    }

    #[test]
    fn malformed_body_is_embedding_error() {
        assert!(matches!(parse_embedding_response("{}", 1), Err(CopilotError::Embedding { .. })));
    }
}
