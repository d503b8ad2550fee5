//! Hashed term-frequency embedder.
//!
//! Deterministic fixed-dimension vectors that need no model or network.
//! Terms are hashed into buckets with FNV-1a and weighted by frequency.
//! Quality is well below a neural embedder, but indexes built with it can
//! be searched offline.

use std::collections::HashMap;

use copilot_contracts::error::CopilotResult;
use copilot_core::traits::Embedder;

use crate::vector::l2_normalize;

pub struct HashedEmbedder {
    dimensions: usize,
}

impl HashedEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions: dimensions.max(1) }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn bucket(term: &str, dims: usize) -> usize {
        let mut h: u64 = 0xcbf29ce484222325;
        for b in term.as_bytes() {
            h ^= u64::from(*b);
            h = h.wrapping_mul(0x100000001b3);
        }
        (h % dims as u64) as usize
    }

    /// Lowercase alphanumeric terms of two or more characters.
    fn terms(text: &str) -> impl Iterator<Item = String> + '_ {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.chars().count() >= 2)
            .map(str::to_lowercase)
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let mut counts: HashMap<String, f32> = HashMap::new();
        for term in Self::terms(text) {
            *counts.entry(term).or_default() += 1.0;
        }

        let mut vector = vec![0.0f32; self.dimensions];
        for (term, count) in &counts {
            vector[Self::bucket(term, self.dimensions)] += count;
        }
        l2_normalize(&mut vector);
        vector
    }
}

impl Embedder for HashedEmbedder {
    fn embed(&self, texts: &[String]) -> CopilotResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }

    fn name(&self) -> &str {
        "hashed-tf"
    }
}
