pub mod data_loader;
pub mod dedup;
pub mod embedding_engine;
pub mod hashing_embedder;
pub mod nano_vector_db;
pub mod recipe_index;

pub use data_loader::{load_catalog, load_recipes};
pub use dedup::{distinct_by_category, Categorized};
pub use embedding_engine::{Embedder, EmbeddingEngine, EmbeddingError, EMBEDDING_DIMENSION};
pub use hashing_embedder::HashingEmbedder;
pub use nano_vector_db::{Metric, NanoVectorDB};
pub use recipe_index::{RecipeIndex, Retrieved};
