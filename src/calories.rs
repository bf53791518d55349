use crate::catalog::IngredientCatalog;
use crate::recipe::{Ingredients, Recipe};

/// Total kilocalories for an ingredient list, rounded half away from zero.
///
/// Each line contributes `kcal_per_100g * quantity * standard_weight_g / 100`.
/// Names missing from the catalog contribute nothing.
pub fn estimate_calories(ingredients: &Ingredients, catalog: &IngredientCatalog) -> i64 {
    let total: f64 = ingredients
        .lines()
        .iter()
        .filter_map(|line| catalog.lookup(&line.name).map(|facts| facts.kcal_for(line.quantity)))
        .sum();
    total.round() as i64
}

pub fn recipe_calories(recipe: &Recipe, catalog: &IngredientCatalog) -> i64 {
    estimate_calories(&recipe.ingredients, catalog)
}
