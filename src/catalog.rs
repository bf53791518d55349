//! Ingredient reference table: normalized name (canonical or synonym) to the
//! caloric density and standard unit weight used by the calorie estimator.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

use crate::lenient::null_as_default;
use crate::normalize::normalize;

pub const DEFAULT_KCAL_PER_100G: f64 = 0.0;
pub const DEFAULT_STANDARD_WEIGHT_G: f64 = 100.0;

fn default_kcal() -> f64 {
    DEFAULT_KCAL_PER_100G
}

fn default_weight() -> f64 {
    DEFAULT_STANDARD_WEIGHT_G
}

fn kcal_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(DEFAULT_KCAL_PER_100G))
}

fn weight_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(DEFAULT_STANDARD_WEIGHT_G))
}

/// One raw reference record as stored in `ingredients.json`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct IngredientRecord {
    #[serde(default, rename = "nazwa", alias = "name", deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, rename = "synonimy", alias = "synonyms", deserialize_with = "null_as_default")]
    pub synonyms: Vec<String>,
    #[serde(
        default = "default_kcal",
        rename = "kalorie_na_100g",
        alias = "kcal_per_100g",
        deserialize_with = "kcal_or_default"
    )]
    pub kcal_per_100g: f64,
    #[serde(
        default = "default_weight",
        rename = "waga_standardowa",
        alias = "standard_weight_g",
        deserialize_with = "weight_or_default"
    )]
    pub standard_weight_g: f64,
}

/// Top-level shape of the ingredient reference document.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct IngredientData {
    #[serde(default, rename = "skladniki", alias = "ingredients", deserialize_with = "null_as_default")]
    pub records: Vec<IngredientRecord>,
}

/// Density/weight pair shared by a canonical name and all of its synonyms.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct IngredientFacts {
    pub kcal_per_100g: f64,
    pub standard_weight_g: f64,
}

impl IngredientFacts {
    /// Calories for `quantity` standard units.
    pub fn kcal_for(&self, quantity: f64) -> f64 {
        self.kcal_per_100g * quantity * self.standard_weight_g / 100.0
    }
}

/// A canonical ingredient as offered for user selection.
#[derive(Debug, Clone, PartialEq)]
pub struct IngredientRef {
    pub canonical_name: String,
    pub kcal_per_100g: f64,
    pub standard_weight_g: f64,
}

#[derive(Debug, Clone, Default)]
pub struct IngredientCatalog {
    lookup: HashMap<String, IngredientFacts>,
    canonical_names: Vec<String>,
}

impl IngredientCatalog {
    /// Builds the lookup table and the sorted canonical name list. Later
    /// records overwrite earlier ones that normalize to the same key.
    pub fn build(data: &IngredientData) -> Self {
        let mut lookup = HashMap::new();
        let mut canonical = BTreeSet::new();
        let mut synonym_count = 0usize;

        for record in &data.records {
            let facts = IngredientFacts {
                kcal_per_100g: record.kcal_per_100g,
                standard_weight_g: record.standard_weight_g,
            };

            let name = normalize(&record.name);
            if !name.is_empty() {
                lookup.insert(name.clone(), facts);
                canonical.insert(name);
            }

            for synonym in &record.synonyms {
                let synonym = normalize(synonym);
                if synonym.is_empty() {
                    continue;
                }
                lookup.insert(synonym, facts);
                synonym_count += 1;
            }
        }

        debug!(
            records = data.records.len(),
            canonical = canonical.len(),
            synonyms = synonym_count,
            keys = lookup.len(),
            "Built ingredient catalog"
        );

        Self {
            lookup,
            canonical_names: canonical.into_iter().collect(),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<IngredientFacts> {
        self.lookup.get(&normalize(name)).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup.contains_key(&normalize(name))
    }

    /// Canonical names only, sorted and distinct. Synonyms are lookup aliases
    /// and never appear here.
    pub fn canonical_names(&self) -> &[String] {
        &self.canonical_names
    }

    pub fn canonical_refs(&self) -> Vec<IngredientRef> {
        self.canonical_names
            .iter()
            .filter_map(|name| {
                self.lookup.get(name).map(|facts| IngredientRef {
                    canonical_name: name.clone(),
                    kcal_per_100g: facts.kcal_per_100g,
                    standard_weight_g: facts.standard_weight_g,
                })
            })
            .collect()
    }

    /// Number of lookup keys, synonyms included.
    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }
}
