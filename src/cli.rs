use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::api_connection::endpoints::DEFAULT_MODEL;
use crate::recipe::Diet;
use crate::search::Metric;

#[derive(Parser, Debug)]
#[command(author, version, about = "Pantry recipe finder with a recipe-grounded chat assistant", long_about = None)]
pub struct Cli {
    /// Path to the recipe JSON file
    #[arg(long, global = true, env = "RECIPE_RAG_RECIPES", default_value = "data/recipes.json")]
    pub recipes: PathBuf,

    /// Path to the ingredient reference file (JSON or CSV)
    #[arg(long, global = true, env = "RECIPE_RAG_INGREDIENTS", default_value = "data/ingredients.json")]
    pub ingredients: PathBuf,

    #[arg(long, global = true, value_enum, default_value_t = EmbedderKind::Model2vec)]
    pub embedder: EmbedderKind,

    /// Distance metric for retrieval: l2 or cosine
    #[arg(long, global = true, default_value = "l2")]
    pub metric: Metric,

    /// Reuse or write an index snapshot at this path
    #[arg(long, global = true, env = "RECIPE_RAG_INDEX_CACHE")]
    pub index_cache: Option<PathBuf>,

    #[arg(long, global = true, env = "OPENROUTER_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Chat-completion request timeout in seconds
    #[arg(long, global = true, env = "OPENROUTER_TIMEOUT_SECS", default_value_t = 60)]
    pub timeout_secs: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmbedderKind {
    /// Static model2vec embeddings (downloads the model on first use)
    Model2vec,
    /// Offline feature-hashing embeddings
    Hashing,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Print the canonical ingredient names
    Ingredients,
    /// Find recipes for the ingredients you have
    Find {
        /// Comma-separated ingredient names
        #[arg(long, value_delimiter = ',', required = true)]
        have: Vec<String>,
        #[arg(long, default_value = "any")]
        diet: Diet,
        /// Hide recipes above this calorie estimate
        #[arg(long)]
        max_kcal: Option<i64>,
        /// Generate cooking instructions for each result
        #[arg(long)]
        instructions: bool,
    },
    /// Chat with the assistant about recipes
    Chat,
    /// Build the recipe index and save a snapshot
    Index {
        #[arg(long)]
        out: PathBuf,
    },
}

pub fn parse_args() -> Cli {
    Cli::parse()
}
