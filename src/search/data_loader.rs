use anyhow::{Context, Result};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::catalog::{
    IngredientCatalog, IngredientData, IngredientRecord, DEFAULT_KCAL_PER_100G, DEFAULT_STANDARD_WEIGHT_G,
};
use crate::recipe::Recipe;

// Expected CSV column headers
const NAME_COL: &str = "name";
const KCAL_COL: &str = "kcal_per_100g";
const WEIGHT_COL: &str = "standard_weight_g";
const SYNONYMS_COL: &str = "synonyms";
const SYNONYM_SEPARATOR: char = '|';

#[derive(Deserialize)]
#[serde(untagged)]
enum RecipeFile {
    List(Vec<serde_json::Value>),
    Wrapped {
        #[serde(alias = "przepisy")]
        recipes: Vec<serde_json::Value>,
    },
}

fn read_file(path: &Path, what: &str) -> Result<String> {
    if !path.exists() {
        return Err(anyhow::anyhow!("{} file not found at: {:?}", what, path));
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {} file at {:?}", what, path))
}

/// Loads recipes from a JSON list, or from an object holding the list under
/// `recipes`/`przepisy`. Missing or `null` fields keep their defaults; a
/// record that is not an object at all is skipped.
pub fn load_recipes(path: &Path) -> Result<Vec<Recipe>> {
    let contents = read_file(path, "Recipe")?;
    let records = match serde_json::from_str::<RecipeFile>(&contents)
        .with_context(|| format!("Failed to parse recipes from {:?}", path))?
    {
        RecipeFile::List(records) | RecipeFile::Wrapped { recipes: records } => records,
    };

    let mut recipes = Vec::with_capacity(records.len());
    for (index, record) in records.into_iter().enumerate() {
        match serde_json::from_value::<Recipe>(record) {
            Ok(recipe) => recipes.push(recipe),
            Err(e) => warn!(index, error = %e, "Skipping unreadable recipe record"),
        }
    }

    let without_ingredients = recipes.iter().filter(|r| r.ingredients.is_empty()).count();
    let without_category = recipes.iter().filter(|r| r.category.trim().is_empty()).count();
    debug!(without_ingredients, without_category, "Recipe records defaulted");
    info!(count = recipes.len(), path = ?path, "Loaded recipes");
    Ok(recipes)
}

pub fn load_ingredient_data(path: &Path) -> Result<IngredientData> {
    let contents = read_file(path, "Ingredient")?;
    let data: IngredientData = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse ingredient data from {:?}", path))?;
    info!(records = data.records.len(), path = ?path, "Loaded ingredient reference data");
    Ok(data)
}

fn parse_or(s: Option<&str>, default: f64) -> f64 {
    s.and_then(|s| s.trim().parse::<f64>().ok()).unwrap_or(default)
}

/// Loads ingredient reference data from CSV: `name` is required, the
/// numeric columns and `synonyms` (`|`-separated) are optional.
pub fn load_ingredient_csv(path: &Path) -> Result<IngredientData> {
    if !path.exists() {
        return Err(anyhow::anyhow!("Ingredient CSV file not found at: {:?}", path));
    }
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open ingredient CSV file at {:?}", path))?;
    let mut rdr = ReaderBuilder::new().has_headers(true).trim(csv::Trim::All).from_reader(file);

    let headers = rdr.headers()?.clone();
    let position = |col: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(col));
    let name_idx = position(NAME_COL).ok_or_else(|| anyhow::anyhow!("Column '{}' not found", NAME_COL))?;
    let kcal_idx = position(KCAL_COL);
    let weight_idx = position(WEIGHT_COL);
    let synonyms_idx = position(SYNONYMS_COL);

    let mut records = Vec::new();
    for (row_index, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read record at row index {}", row_index))?;
        let name = record.get(name_idx).unwrap_or_default().to_string();
        let synonyms = synonyms_idx
            .and_then(|i| record.get(i))
            .map(|s| {
                s.split(SYNONYM_SEPARATOR)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        records.push(IngredientRecord {
            name,
            synonyms,
            kcal_per_100g: parse_or(kcal_idx.and_then(|i| record.get(i)), DEFAULT_KCAL_PER_100G),
            standard_weight_g: parse_or(weight_idx.and_then(|i| record.get(i)), DEFAULT_STANDARD_WEIGHT_G),
        });
    }

    info!(records = records.len(), path = ?path, "Loaded ingredient reference CSV");
    Ok(IngredientData { records })
}

/// Builds the catalog from a `.csv` or JSON reference file.
pub fn load_catalog(path: &Path) -> Result<IngredientCatalog> {
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    let data = if is_csv {
        load_ingredient_csv(path)?
    } else {
        load_ingredient_data(path)?
    };
    Ok(IngredientCatalog::build(&data))
}
