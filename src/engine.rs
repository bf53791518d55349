use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use crate::assistant::suggest;
use crate::calories::recipe_calories;
use crate::catalog::IngredientCatalog;
use crate::matcher::match_recipes;
use crate::recipe::{dedup_by_display_title, Diet, Recipe};
use crate::search::{load_catalog, load_recipes, Embedder, EmbeddingError, Metric, RecipeIndex, Retrieved};

/// A recipe ready for display: its calorie estimate and, for partial
/// matches, the ingredients still missing.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeHit<'a> {
    pub recipe: &'a Recipe,
    pub kcal: i64,
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct FindReport<'a> {
    pub full: Vec<RecipeHit<'a>>,
    pub partial: Vec<RecipeHit<'a>>,
}

/// Catalog plus recipe index, built once at start-up and shared read-only.
pub struct Engine<E> {
    catalog: IngredientCatalog,
    index: RecipeIndex<E>,
}

impl<E: Embedder> Engine<E> {
    pub fn new(catalog: IngredientCatalog, index: RecipeIndex<E>) -> Self {
        Self { catalog, index }
    }

    /// Loads both data files and builds the index, reusing the snapshot at
    /// `index_cache` when one is given and still valid.
    pub fn load(
        recipes_path: &Path,
        ingredients_path: &Path,
        embedder: E,
        metric: Metric,
        index_cache: Option<&Path>,
    ) -> Result<Self> {
        let catalog = load_catalog(ingredients_path)?;
        let recipes = load_recipes(recipes_path)?;
        let index = match index_cache {
            Some(path) => RecipeIndex::load_or_build(path, recipes, embedder, metric)?,
            None => RecipeIndex::build(recipes, embedder, metric).context("Failed to build recipe index")?,
        };
        info!(ingredients = catalog.len(), recipes = index.len(), "Engine ready");
        Ok(Self { catalog, index })
    }

    pub fn catalog(&self) -> &IngredientCatalog {
        &self.catalog
    }

    pub fn index(&self) -> &RecipeIndex<E> {
        &self.index
    }

    pub fn recipes(&self) -> &[Recipe] {
        self.index.recipes()
    }

    pub fn calories(&self, recipe: &Recipe) -> i64 {
        recipe_calories(recipe, &self.catalog)
    }

    /// Full and partial matches for the pantry, one per display title, with
    /// recipes above `max_kcal` left out.
    pub fn find<S: AsRef<str>>(&self, have: &[S], diet: Diet, max_kcal: Option<i64>) -> FindReport<'_> {
        let report = match_recipes(have, self.recipes(), diet);
        let within_limit = |hit: &RecipeHit<'_>| max_kcal.map_or(true, |limit| hit.kcal <= limit);

        let full = report.full.into_iter().map(|recipe| RecipeHit {
            recipe,
            kcal: self.calories(recipe),
            missing: Vec::new(),
        });
        let partial = report.partial.into_iter().map(|m| RecipeHit {
            recipe: m.recipe,
            kcal: self.calories(m.recipe),
            missing: m.missing,
        });

        FindReport {
            full: dedup_by_display_title(full.filter(within_limit), |hit| hit.recipe),
            partial: dedup_by_display_title(partial.filter(within_limit), |hit| hit.recipe),
        }
    }

    pub fn suggest<S: AsRef<str>>(&self, have: &[S]) -> Result<Vec<Retrieved<'_>>, EmbeddingError> {
        suggest(&self.index, have)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{IngredientData, IngredientRecord};
    use crate::recipe::Ingredients;
    use crate::search::HashingEmbedder;

    fn record(name: &str, kcal: f64, weight: f64) -> IngredientRecord {
        IngredientRecord {
            name: name.into(),
            synonyms: Vec::new(),
            kcal_per_100g: kcal,
            standard_weight_g: weight,
        }
    }

    fn recipe(title: &str, category: &str, ingredients: &str) -> Recipe {
        Recipe {
            title: title.into(),
            category: category.into(),
            ingredients: Ingredients::Flat(ingredients.into()),
            description: None,
        }
    }

    fn engine() -> Engine<HashingEmbedder> {
        let catalog = IngredientCatalog::build(&IngredientData {
            records: vec![
                record("pomidor", 18.0, 120.0),
                record("cebula", 40.0, 110.0),
                record("boczek", 500.0, 100.0),
            ],
        });
        let recipes = vec![
            recipe("Sałatka", "wege", "pomidor, cebula"),
            recipe("Sałatka 2", "wege", "cebula, pomidor"),
            recipe("Jajecznica z boczkiem", "keto", "pomidor, boczek"),
            recipe("Zupa cebulowa", "wege", "cebula, czosnek"),
        ];
        let index = RecipeIndex::build(recipes, HashingEmbedder::default(), Metric::Cosine).unwrap();
        Engine::new(catalog, index)
    }

    #[test]
    fn test_find_dedups_titles_and_scores_calories() {
        let engine = engine();
        let report = engine.find(&["pomidor", "cebula"], Diet::Any, None);

        assert_eq!(report.full.len(), 1);
        assert_eq!(report.full[0].recipe.title, "Sałatka");
        // 18 * 1.2 + 40 * 1.1 = 65.6
        assert_eq!(report.full[0].kcal, 66);

        let partial: Vec<&str> = report.partial.iter().map(|h| h.recipe.title.as_str()).collect();
        assert_eq!(partial, ["Jajecznica z boczkiem", "Zupa cebulowa"]);
        assert_eq!(report.partial[1].missing, ["czosnek"]);
    }

    #[test]
    fn test_find_respects_calorie_limit_and_diet() {
        let engine = engine();
        let report = engine.find(&["pomidor", "cebula"], Diet::Any, Some(100));
        assert!(report.partial.iter().all(|h| h.kcal <= 100));
        assert!(!report.partial.iter().any(|h| h.recipe.title.contains("boczkiem")));

        let report = engine.find(&["pomidor", "cebula"], Diet::Keto, None);
        assert!(report.full.is_empty());
        assert_eq!(report.partial.len(), 1);
    }
}
