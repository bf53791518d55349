pub mod api_connection;
pub mod assistant;
pub mod calories;
pub mod catalog;
pub mod cli;
pub mod engine;
mod lenient;
pub mod matcher;
pub mod normalize;
pub mod recipe;
pub mod search;

pub use engine::{Engine, FindReport, RecipeHit};
