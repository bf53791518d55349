//! A small exact-search vector store: one dense row-major matrix, brute-force
//! L2 or cosine distance, and a JSON snapshot format with a base64 matrix.
#![forbid(unsafe_code)]

use anyhow::Result;
use base64::{engine::general_purpose, Engine as _};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::fs;
use std::path::Path;
use std::str::FromStr;

type Float = f32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Euclidean distance on the raw vectors.
    #[default]
    L2,
    /// `1 - cosine similarity`; rows are stored unit-normalized.
    Cosine,
}

impl FromStr for Metric {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "l2" | "euclidean" => Ok(Metric::L2),
            "cosine" => Ok(Metric::Cosine),
            other => anyhow::bail!("Unknown metric '{}'. Expected 'l2' or 'cosine'", other),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct DataBase {
    embedding_dim: usize,
    metric: Metric,
    rows: usize,
    #[serde(with = "base64_floats")]
    matrix: Vec<Float>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    additional_data: HashMap<String, serde_json::Value>,
}

mod base64_floats {
    use super::*;
    use bytemuck::cast_slice;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(vec: &[Float], serializer: S) -> Result<S::Ok, S::Error> {
        let bytes: &[u8] = cast_slice(vec);
        serializer.serialize_str(&general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Float>, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = general_purpose::STANDARD
            .decode(s)
            .map_err(serde::de::Error::custom)?;
        if bytes.len() % std::mem::size_of::<Float>() != 0 {
            return Err(serde::de::Error::custom(format!(
                "matrix byte length {} is not a multiple of {}",
                bytes.len(),
                std::mem::size_of::<Float>()
            )));
        }
        Ok(bytemuck::pod_collect_to_vec(bytes.as_slice()))
    }
}

/// A row index and its distance to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub index: usize,
    pub distance: Float,
}

impl Eq for Neighbor {}

impl PartialOrd for Neighbor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Neighbor {
    // Nearer first, then lower row index; NaN sorts after every number.
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.index.cmp(&other.index))
    }
}

#[derive(Debug)]
pub struct NanoVectorDB {
    storage: DataBase,
}

impl NanoVectorDB {
    pub fn new(embedding_dim: usize, metric: Metric) -> Self {
        Self {
            storage: DataBase {
                embedding_dim,
                metric,
                rows: 0,
                matrix: Vec::new(),
                additional_data: HashMap::new(),
            },
        }
    }

    pub fn embedding_dim(&self) -> usize {
        self.storage.embedding_dim
    }

    pub fn metric(&self) -> Metric {
        self.storage.metric
    }

    /// Appends rows; returns the index of the first appended row.
    pub fn extend(&mut self, vectors: &[Vec<Float>]) -> Result<usize> {
        for (i, v) in vectors.iter().enumerate() {
            if v.len() != self.storage.embedding_dim {
                anyhow::bail!(
                    "Embedding dimension mismatch for row {}: expected {}, got {}",
                    self.storage.rows + i,
                    self.storage.embedding_dim,
                    v.len()
                );
            }
        }
        let first = self.storage.rows;
        for v in vectors {
            match self.storage.metric {
                Metric::L2 => self.storage.matrix.extend_from_slice(v),
                Metric::Cosine => self.storage.matrix.extend(normalize(v)),
            }
        }
        self.storage.rows += vectors.len();
        Ok(first)
    }

    /// Exact top-`k` search, nearest first. Equal distances keep row order.
    pub fn query(&self, query: &[Float], top_k: usize) -> Vec<Neighbor> {
        if self.is_empty()
            || top_k == 0
            || self.storage.embedding_dim == 0
            || query.len() != self.storage.embedding_dim
        {
            return Vec::new();
        }
        let query = match self.storage.metric {
            Metric::L2 => query.to_vec(),
            Metric::Cosine => normalize(query),
        };
        let metric = self.storage.metric;

        let distances: Vec<Float> = self
            .storage
            .matrix
            .par_chunks_exact(self.storage.embedding_dim)
            .map(|row| match metric {
                Metric::L2 => l2_distance(row, &query),
                Metric::Cosine => 1.0 - dot_product(row, &query),
            })
            .collect();

        // Max-heap holding the k nearest seen so far; the farthest sits on top.
        let mut heap = BinaryHeap::with_capacity(top_k.min(self.len()) + 1);
        for (index, distance) in distances.into_iter().enumerate() {
            heap.push(Neighbor { index, distance });
            if heap.len() > top_k {
                heap.pop();
            }
        }
        heap.into_sorted_vec()
    }

    pub fn row(&self, index: usize) -> Option<&[Float]> {
        let dim = self.storage.embedding_dim;
        self.storage.matrix.get(index * dim..(index + 1) * dim)
    }

    pub fn len(&self) -> usize {
        self.storage.rows
    }

    pub fn is_empty(&self) -> bool {
        self.storage.rows == 0
    }

    pub fn additional_data(&self) -> &HashMap<String, serde_json::Value> {
        &self.storage.additional_data
    }

    pub fn store_additional_data(&mut self, data: HashMap<String, serde_json::Value>) {
        self.storage.additional_data = data;
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let serialized = serde_json::to_string(&self.storage)?;
        fs::write(path, serialized)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let storage: DataBase = serde_json::from_str(&contents)?;
        let expected_len = storage.rows * storage.embedding_dim;
        if storage.matrix.len() != expected_len {
            anyhow::bail!(
                "Matrix size mismatch: expected {}, got {}",
                expected_len,
                storage.matrix.len()
            );
        }
        Ok(Self { storage })
    }
}

#[inline]
fn dot_product(a: &[Float], b: &[Float]) -> Float {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[inline]
fn l2_distance(a: &[Float], b: &[Float]) -> Float {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum::<Float>().sqrt()
}

/// Normalize a vector to unit length. Zero vectors are returned unchanged;
/// embedders reject them before they reach the store.
pub fn normalize(vector: &[Float]) -> Vec<Float> {
    let norm_sq: Float = vector.iter().map(|&x| x * x).sum();
    if norm_sq == 0.0 {
        return vector.to_vec();
    }
    let inv_norm = 1.0 / norm_sq.sqrt();
    vector.iter().map(|&x| x * inv_norm).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use tempfile::NamedTempFile;

    fn generate_dummy_embeddings(count: usize, dim: usize) -> Vec<Vec<f32>> {
        let mut rng = rand::thread_rng();
        (0..count)
            .map(|_| (0..dim).map(|_| rng.gen::<f32>() + 0.01).collect())
            .collect()
    }

    #[test]
    fn test_query_returns_self_first() -> Result<()> {
        for metric in [Metric::L2, Metric::Cosine] {
            let mut db = NanoVectorDB::new(32, metric);
            let embeddings = generate_dummy_embeddings(100, 32);
            db.extend(&embeddings)?;
            assert_eq!(db.len(), 100);

            let results = db.query(&embeddings[17], 5);
            assert_eq!(results.len(), 5);
            assert_eq!(results[0].index, 17);
            assert!(results.windows(2).all(|w| w[0].distance <= w[1].distance));
        }
        Ok(())
    }

    #[test]
    fn test_l2_ordering_and_ties() -> Result<()> {
        let mut db = NanoVectorDB::new(2, Metric::L2);
        db.extend(&[vec![3.0, 0.0], vec![1.0, 0.0], vec![0.0, 1.0], vec![-1.0, 0.0]])?;
        let results = db.query(&[0.0, 0.0], 3);
        // Rows 1, 2 and 3 all sit at distance 1; row order breaks the tie.
        let indices: Vec<_> = results.iter().map(|n| n.index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
        assert!((results[0].distance - 1.0).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn test_cosine_ignores_magnitude() -> Result<()> {
        let mut db = NanoVectorDB::new(2, Metric::Cosine);
        db.extend(&[vec![10.0, 0.0], vec![0.0, 1.0]])?;
        let results = db.query(&[0.5, 0.0], 2);
        assert_eq!(results[0].index, 0);
        assert!(results[0].distance.abs() < 1e-6);
        assert!((results[1].distance - 1.0).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn test_empty_store_and_zero_k() -> Result<()> {
        let mut db = NanoVectorDB::new(3, Metric::L2);
        assert!(db.query(&[1.0, 0.0, 0.0], 5).is_empty());
        db.extend(&[vec![1.0, 0.0, 0.0]])?;
        assert!(db.query(&[1.0, 0.0, 0.0], 0).is_empty());
        assert_eq!(db.query(&[1.0, 0.0, 0.0], 10).len(), 1);
        Ok(())
    }

    #[test]
    fn test_extend_rejects_wrong_dimension() {
        let mut db = NanoVectorDB::new(3, Metric::L2);
        let err = db.extend(&[vec![1.0, 2.0]]).unwrap_err();
        assert!(err.to_string().contains("expected 3, got 2"), "{}", err);
        assert!(db.is_empty());
    }

    #[test]
    fn test_save_and_load_round_trip() -> Result<()> {
        let temp_file = NamedTempFile::new()?;
        let mut db = NanoVectorDB::new(4, Metric::Cosine);
        db.extend(&generate_dummy_embeddings(10, 4))?;
        db.store_additional_data([("corpus".to_string(), serde_json::json!("abc"))].into());
        db.save(temp_file.path())?;

        let loaded = NanoVectorDB::load(temp_file.path())?;
        assert_eq!(loaded.len(), 10);
        assert_eq!(loaded.metric(), Metric::Cosine);
        assert_eq!(loaded.row(3), db.row(3));
        assert_eq!(loaded.additional_data()["corpus"], "abc");
        Ok(())
    }

    #[test]
    fn test_matrix_size_validation_on_load() -> Result<()> {
        let temp_file = NamedTempFile::new()?;
        let corrupt = DataBase {
            embedding_dim: 2,
            metric: Metric::L2,
            rows: 1,
            matrix: vec![1.0],
            additional_data: HashMap::new(),
        };
        fs::write(temp_file.path(), serde_json::to_string(&corrupt)?)?;

        let err = NanoVectorDB::load(temp_file.path()).unwrap_err().to_string();
        assert!(err.contains("Matrix size mismatch"), "{}", err);
        assert!(err.contains("expected 2"), "{}", err);
        assert!(err.contains("got 1"), "{}", err);
        Ok(())
    }

    #[test]
    fn test_invalid_base64_rejected() {
        let invalid_json = r#"{"embedding_dim": 2, "metric": "l2", "rows": 1, "matrix": "INVALID_BASE64!!"}"#;
        let result: Result<DataBase, _> = serde_json::from_str(invalid_json);
        assert!(result.is_err());
    }

    #[test]
    fn test_neighbor_ordering_puts_nan_last() {
        let mut v = vec![
            Neighbor { index: 0, distance: Float::NAN },
            Neighbor { index: 1, distance: 0.5 },
            Neighbor { index: 2, distance: 0.1 },
        ];
        v.sort();
        assert_eq!(v.iter().map(|n| n.index).collect::<Vec<_>>(), vec![2, 1, 0]);
    }

    #[test]
    fn test_normalize_vectors() {
        let normalized = normalize(&[3.0, 4.0]);
        assert!((normalized[0] - 0.6).abs() < 1e-6);
        assert!((normalized[1] - 0.8).abs() < 1e-6);
        assert_eq!(normalize(&[0.0, 0.0]), vec![0.0, 0.0]);
    }
}
