//! Classifies recipes against the ingredients a user has on hand.
//!
//! Results keep the order of the input recipes. Collapsing variants that share
//! a display title ("Zupa 2" vs "Zupa") is left to the presentation layer, see
//! [`crate::recipe::dedup_by_display_title`].

use std::collections::HashSet;

use crate::normalize::normalize;
use crate::recipe::{Diet, Recipe};

/// Largest number of missing ingredients a partial match may report.
pub const MAX_MISSING: usize = 2;

/// Normalized set of ingredients the user has.
#[derive(Debug, Clone, Default)]
pub struct Pantry {
    items: HashSet<String>,
}

impl Pantry {
    pub fn new<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let items = items
            .into_iter()
            .map(|item| normalize(item.as_ref()))
            .filter(|item| !item.is_empty())
            .collect();
        Self { items }
    }

    pub fn has(&self, normalized_name: &str) -> bool {
        self.items.contains(normalized_name)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Recipe ingredients not in the pantry, in recipe order.
    pub fn missing_for(&self, recipe: &Recipe) -> Vec<String> {
        recipe
            .ingredients
            .names()
            .into_iter()
            .filter(|name| !self.has(name))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PartialMatch<'a> {
    pub recipe: &'a Recipe,
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MatchReport<'a> {
    pub full: Vec<&'a Recipe>,
    pub partial: Vec<PartialMatch<'a>>,
}

enum Verdict {
    Full,
    Partial(Vec<String>),
    Excluded,
}

fn classify(pantry: &Pantry, recipe: &Recipe, diet: Diet) -> Verdict {
    if !diet.admits(&recipe.category) {
        return Verdict::Excluded;
    }
    // A recipe with no ingredients would match any pantry vacuously.
    if recipe.ingredients.is_empty() {
        return Verdict::Excluded;
    }
    let missing = pantry.missing_for(recipe);
    match missing.len() {
        0 => Verdict::Full,
        n if n <= MAX_MISSING => Verdict::Partial(missing),
        _ => Verdict::Excluded,
    }
}

/// Full and partial matches computed in one pass over `recipes`.
pub fn match_recipes<'a, S: AsRef<str>>(
    user_ingredients: &[S],
    recipes: &'a [Recipe],
    diet: Diet,
) -> MatchReport<'a> {
    let pantry = Pantry::new(user_ingredients);
    let mut report = MatchReport::default();
    for recipe in recipes {
        match classify(&pantry, recipe, diet) {
            Verdict::Full => report.full.push(recipe),
            Verdict::Partial(missing) => report.partial.push(PartialMatch { recipe, missing }),
            Verdict::Excluded => {}
        }
    }
    report
}

/// Recipes whose every ingredient the user has.
pub fn match_full<'a, S: AsRef<str>>(
    user_ingredients: &[S],
    recipes: &'a [Recipe],
    diet: Diet,
) -> Vec<&'a Recipe> {
    match_recipes(user_ingredients, recipes, diet).full
}

/// Recipes missing one or two ingredients, with the missing names.
pub fn match_partial<'a, S: AsRef<str>>(
    user_ingredients: &[S],
    recipes: &'a [Recipe],
    diet: Diet,
) -> Vec<PartialMatch<'a>> {
    match_recipes(user_ingredients, recipes, diet).partial
}
