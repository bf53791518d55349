//! Offline embedder: signed feature hashing of word tokens and character
//! trigrams into a fixed number of buckets, L2-normalized.
//!
//! Needs no model download and is fully deterministic, which makes it the
//! embedder used in tests and with `--embedder hashing`.

use crate::normalize::normalize;
use crate::search::embedding_engine::{Embedder, EmbeddingError};

pub const DEFAULT_HASHING_DIMENSION: usize = 256;

const WORD_WEIGHT: f32 = 1.0;
const TRIGRAM_WEIGHT: f32 = 0.5;

/// FNV-1a 64-bit hash.
pub(crate) fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut h: u64 = 0xcbf29ce484222325;
    let prime: u64 = 0x00000100000001B3;
    for &b in bytes {
        h ^= b as u64;
        h = h.wrapping_mul(prime);
    }
    h
}

#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension: dimension.max(1) }
    }

    fn add_feature(&self, vector: &mut [f32], feature: &str, weight: f32) {
        let h = fnv1a_64(feature.as_bytes());
        let bucket = (h % self.dimension as u64) as usize;
        let sign = if (h >> 63) & 1 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign * weight;
    }

    fn encode_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        let text = normalize(text);
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            self.add_feature(&mut vector, word, WORD_WEIGHT);

            let padded: Vec<char> = format!(" {} ", word).chars().collect();
            for window in padded.windows(3) {
                let trigram: String = window.iter().collect();
                self.add_feature(&mut vector, &trigram, TRIGRAM_WEIGHT);
            }
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_HASHING_DIMENSION)
    }
}

impl Embedder for HashingEmbedder {
    fn id(&self) -> String {
        format!("hashing:{}", self.dimension)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| self.encode_one(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn test_deterministic_and_unit_length() {
        let embedder = HashingEmbedder::default();
        let a = embedder.embed_one("Zupa pomidorowa: pomidor, cebula").unwrap();
        let b = embedder.embed_one("Zupa pomidorowa: pomidor, cebula").unwrap();
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_case_and_spacing_do_not_matter() {
        let embedder = HashingEmbedder::default();
        let a = embedder.embed_one("POMIDOR   cebula").unwrap();
        let b = embedder.embed_one("pomidor cebula").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_shared_words_are_closer() {
        let embedder = HashingEmbedder::default();
        let query = embedder.embed_one("pomidor, cebula").unwrap();
        let near = embedder.embed_one("Sos: pomidor, cebula, czosnek").unwrap();
        let far = embedder.embed_one("Omlet: jajko, masło").unwrap();
        assert!(cosine(&query, &near) > cosine(&query, &far));
    }

    #[test]
    fn test_punctuation_only_text_is_rejected_as_zero() {
        let embedder = HashingEmbedder::default();
        assert!(matches!(embedder.embed_one(",,, ;"), Err(EmbeddingError::ZeroVector { .. })));
    }
}
