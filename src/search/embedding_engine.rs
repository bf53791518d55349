use model2vec_rs::model::StaticModel;
use thiserror::Error;

pub const EMBEDDING_MODEL_ID: &str = "minishlab/potion-base-32M";

/// Width of [`EMBEDDING_MODEL_ID`].
pub const EMBEDDING_DIMENSION: usize = 512;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("cannot embed empty or whitespace-only text")]
    EmptyText,

    #[error("embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("embedding for text #{index} contains NaN or infinity")]
    NonFinite { index: usize },

    #[error("embedding for text #{index} is an all-zero vector")]
    ZeroVector { index: usize },

    #[error("embedder returned {got} vectors for {expected} texts")]
    CountMismatch { expected: usize, got: usize },

    #[error("embedding backend failed: {0}")]
    Backend(String),
}

/// Deterministic text-to-vector encoder shared by index build and query.
pub trait Embedder {
    /// Stable identifier, recorded in index snapshots.
    fn id(&self) -> String;

    fn dimension(&self) -> usize;

    /// Raw encode. Callers go through [`Embedder::embed`] so the output is
    /// validated.
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.iter().any(|t| t.trim().is_empty()) {
            return Err(EmbeddingError::EmptyText);
        }
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let embeddings = self.encode(texts)?;
        if embeddings.len() != texts.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: texts.len(),
                got: embeddings.len(),
            });
        }
        for (index, emb) in embeddings.iter().enumerate() {
            validate_embedding(index, emb, self.dimension())?;
        }
        Ok(embeddings)
    }

    fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut embeddings = self.embed(&[text.to_string()])?;
        embeddings.pop().ok_or(EmbeddingError::CountMismatch { expected: 1, got: 0 })
    }
}

/// Rejects vectors that would silently corrupt distance computations.
pub fn validate_embedding(index: usize, emb: &[f32], dimension: usize) -> Result<(), EmbeddingError> {
    if emb.len() != dimension {
        return Err(EmbeddingError::DimensionMismatch { expected: dimension, got: emb.len() });
    }
    if emb.iter().any(|v| !v.is_finite()) {
        return Err(EmbeddingError::NonFinite { index });
    }
    if emb.iter().all(|&v| v == 0.0) {
        return Err(EmbeddingError::ZeroVector { index });
    }
    Ok(())
}

/// model2vec static embeddings. Loading downloads the model on first use.
pub struct EmbeddingEngine {
    model: StaticModel,
    model_id: String,
    dimension: usize,
}

impl EmbeddingEngine {
    pub fn new() -> anyhow::Result<Self> {
        Self::from_pretrained(EMBEDDING_MODEL_ID)
    }

    /// Loads any model2vec model. Its width is read off a sample encode since
    /// model2vec_rs does not expose it.
    pub fn from_pretrained(model_id: &str) -> anyhow::Result<Self> {
        let model = StaticModel::from_pretrained(model_id, None, None, None)?;
        let dimension = model
            .encode(&["pomidor".to_string()])
            .first()
            .map(Vec::len)
            .filter(|&dim| dim > 0)
            .ok_or_else(|| anyhow::anyhow!("Model '{}' produced no embedding for a sample text", model_id))?;
        Ok(Self { model, model_id: model_id.to_string(), dimension })
    }
}

impl Embedder for EmbeddingEngine {
    fn id(&self) -> String {
        format!("model2vec:{}", self.model_id)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(self.model.encode(texts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedEmbedder {
        output: Vec<Vec<f32>>,
    }

    impl Embedder for FixedEmbedder {
        fn id(&self) -> String {
            "fixed".into()
        }
        fn dimension(&self) -> usize {
            2
        }
        fn encode(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(self.output.clone())
        }
    }

    #[test]
    fn test_empty_text_fails_loudly() {
        let embedder = FixedEmbedder { output: vec![vec![1.0, 0.0]] };
        assert!(matches!(embedder.embed_one("   "), Err(EmbeddingError::EmptyText)));
    }

    #[test]
    fn test_zero_vector_rejected() {
        let embedder = FixedEmbedder { output: vec![vec![0.0, 0.0]] };
        assert!(matches!(embedder.embed_one("pomidor"), Err(EmbeddingError::ZeroVector { index: 0 })));
    }

    #[test]
    fn test_non_finite_and_dimension_rejected() {
        let nan = FixedEmbedder { output: vec![vec![f32::NAN, 1.0]] };
        assert!(matches!(nan.embed_one("x"), Err(EmbeddingError::NonFinite { .. })));

        let wide = FixedEmbedder { output: vec![vec![1.0, 2.0, 3.0]] };
        assert!(matches!(
            wide.embed_one("x"),
            Err(EmbeddingError::DimensionMismatch { expected: 2, got: 3 })
        ));
    }

    #[test]
    fn test_count_mismatch_rejected() {
        let embedder = FixedEmbedder { output: vec![vec![1.0, 0.0]] };
        let texts = vec!["a".to_string(), "b".to_string()];
        assert!(matches!(embedder.embed(&texts), Err(EmbeddingError::CountMismatch { expected: 2, got: 1 })));
    }

    #[test]
    #[ignore] // Downloads the model from the Hugging Face hub.
    fn test_embedding_engine_init_and_embed() -> anyhow::Result<()> {
        let engine = EmbeddingEngine::new()?;
        assert_eq!(engine.dimension(), EMBEDDING_DIMENSION);

        let sentences = vec!["Zupa pomidorowa: pomidor, cebula".to_string(), "Omlet: jajko".to_string()];
        let embeddings = engine.embed(&sentences)?;
        assert_eq!(embeddings.len(), 2);
        assert_eq!(embeddings[0].len(), EMBEDDING_DIMENSION);

        let again = engine.embed_one("Zupa pomidorowa: pomidor, cebula")?;
        assert_eq!(again, embeddings[0]);
        Ok(())
    }

    #[test]
    #[ignore] // Downloads a second, narrower model from the Hugging Face hub.
    fn test_other_model_width_is_detected() -> anyhow::Result<()> {
        let engine = EmbeddingEngine::from_pretrained("minishlab/potion-base-8M")?;
        assert_eq!(engine.dimension(), 256);
        assert_eq!(engine.embed_one("jajko, masło")?.len(), 256);
        Ok(())
    }
}
