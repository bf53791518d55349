use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::recipe::Recipe;
use crate::search::embedding_engine::{validate_embedding, Embedder, EmbeddingError};
use crate::search::hashing_embedder::fnv1a_64;
use crate::search::nano_vector_db::{Metric, NanoVectorDB};

const KEY_EMBEDDER: &str = "embedder";
const KEY_FINGERPRINT: &str = "corpus_fingerprint";
const KEY_ROWS: &str = "rows";

/// A recipe returned by a nearest-neighbor query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Retrieved<'a> {
    pub recipe: &'a Recipe,
    pub distance: f32,
}

/// Embedding index over a fixed recipe corpus. Built once, then read-only.
pub struct RecipeIndex<E> {
    embedder: E,
    db: NanoVectorDB,
    recipes: Vec<Recipe>,
    // Vector row -> position in `recipes`.
    rows: Vec<usize>,
}

fn corpus_texts(recipes: &[Recipe]) -> Vec<String> {
    recipes.iter().map(Recipe::embedding_text).collect()
}

fn corpus_fingerprint(texts: &[String]) -> String {
    format!("{:016x}-{}", fnv1a_64(texts.join("\n").as_bytes()), texts.len())
}

fn has_content(text: &str) -> bool {
    text.chars().any(char::is_alphanumeric)
}

impl<E: Embedder> RecipeIndex<E> {
    /// Encodes `"{title}: {ingredients}"` for every recipe. Recipes whose text
    /// carries nothing to embed stay out of the index but remain in
    /// [`RecipeIndex::recipes`]. An empty corpus yields an empty index.
    pub fn build(recipes: Vec<Recipe>, embedder: E, metric: Metric) -> Result<Self, EmbeddingError> {
        let texts = corpus_texts(&recipes);
        let fingerprint = corpus_fingerprint(&texts);
        let mut db = NanoVectorDB::new(embedder.dimension(), metric);
        let mut rows = Vec::with_capacity(texts.len());

        let (candidates, batch): (Vec<usize>, Vec<String>) = texts
            .iter()
            .enumerate()
            .filter(|(_, text)| has_content(text))
            .map(|(i, text)| (i, text.clone()))
            .unzip();

        if batch.is_empty() {
            warn!(recipes = recipes.len(), "Building recipe index with nothing to embed");
        } else {
            info!(recipes = batch.len(), embedder = %embedder.id(), ?metric, "Embedding recipe corpus");
            let embeddings = embedder.encode(&batch)?;
            if embeddings.len() != batch.len() {
                return Err(EmbeddingError::CountMismatch {
                    expected: batch.len(),
                    got: embeddings.len(),
                });
            }

            let mut vectors = Vec::with_capacity(embeddings.len());
            for (recipe_index, embedding) in candidates.into_iter().zip(embeddings) {
                match validate_embedding(recipe_index, &embedding, embedder.dimension()) {
                    Ok(()) => {
                        rows.push(recipe_index);
                        vectors.push(embedding);
                    }
                    Err(EmbeddingError::ZeroVector { .. }) => warn!(
                        recipe_index,
                        title = %recipes[recipe_index].title,
                        "Recipe embeds to a zero vector, leaving it out of the index"
                    ),
                    Err(e) => return Err(e),
                }
            }
            db.extend(&vectors)
                .map_err(|e| EmbeddingError::Backend(e.to_string()))?;
        }

        let skipped = recipes.len() - rows.len();
        if skipped > 0 {
            warn!(skipped, "Recipes without embeddable text are not retrievable");
        }

        db.store_additional_data(HashMap::from([
            (KEY_EMBEDDER.to_string(), serde_json::json!(embedder.id())),
            (KEY_FINGERPRINT.to_string(), serde_json::json!(fingerprint)),
            (KEY_ROWS.to_string(), serde_json::json!(rows)),
        ]));

        Ok(Self { embedder, db, recipes, rows })
    }

    /// The `top_k` recipes nearest to `text`, nearest first.
    pub fn query(&self, text: &str, top_k: usize) -> Result<Vec<Retrieved<'_>>, EmbeddingError> {
        if self.db.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }
        let query_embedding = self.embedder.embed_one(text)?;
        let neighbors = self.db.query(&query_embedding, top_k);
        debug!(query = text, hits = neighbors.len(), "Recipe index query");

        Ok(neighbors
            .into_iter()
            .filter_map(|n| {
                let recipe = self.rows.get(n.index).and_then(|&i| self.recipes.get(i))?;
                Some(Retrieved {
                    recipe,
                    distance: n.distance,
                })
            })
            .collect())
    }

    /// The whole corpus, including recipes left out of the index.
    pub fn recipes(&self) -> &[Recipe] {
        &self.recipes
    }

    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    pub fn metric(&self) -> Metric {
        self.db.metric()
    }

    /// Number of indexed (retrievable) recipes.
    pub fn len(&self) -> usize {
        self.db.len()
    }

    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.db
            .save(path)
            .with_context(|| format!("Failed to save recipe index snapshot to {:?}", path))
    }

    /// Reuses the snapshot at `path` when it was built by the same embedder,
    /// with the same metric, over the same corpus; otherwise rebuilds and
    /// rewrites it.
    pub fn load_or_build(path: &Path, recipes: Vec<Recipe>, embedder: E, metric: Metric) -> Result<Self> {
        let texts = corpus_texts(&recipes);
        let fingerprint = corpus_fingerprint(&texts);

        if path.exists() {
            match NanoVectorDB::load(path) {
                Ok(db) => match Self::snapshot_rows(&db, &embedder, metric, &fingerprint, recipes.len()) {
                    Some(rows) => {
                        info!(path = ?path, rows = db.len(), "Loaded recipe index snapshot");
                        return Ok(Self { embedder, db, recipes, rows });
                    }
                    None => info!(path = ?path, "Recipe index snapshot is stale, rebuilding"),
                },
                Err(e) => warn!(path = ?path, error = %e, "Unreadable recipe index snapshot, rebuilding"),
            }
        }

        let index = Self::build(recipes, embedder, metric)
            .context("Failed to build recipe index")?;
        index.save(path)?;
        Ok(index)
    }

    /// The snapshot's row mapping, if the snapshot fits this embedder, metric
    /// and corpus.
    fn snapshot_rows(
        db: &NanoVectorDB,
        embedder: &E,
        metric: Metric,
        fingerprint: &str,
        corpus_len: usize,
    ) -> Option<Vec<usize>> {
        let data = db.additional_data();
        let fits = db.metric() == metric
            && db.embedding_dim() == embedder.dimension()
            && data.get(KEY_EMBEDDER).and_then(|v| v.as_str()) == Some(embedder.id().as_str())
            && data.get(KEY_FINGERPRINT).and_then(|v| v.as_str()) == Some(fingerprint);
        if !fits {
            return None;
        }
        let rows: Vec<usize> = serde_json::from_value(data.get(KEY_ROWS)?.clone()).ok()?;
        (rows.len() == db.len() && rows.iter().all(|&i| i < corpus_len)).then_some(rows)
    }
}
