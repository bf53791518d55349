use std::collections::HashSet;

use crate::normalize::normalize;
use crate::recipe::Recipe;
use crate::search::recipe_index::Retrieved;

/// Anything that belongs to a recipe category.
pub trait Categorized {
    fn category(&self) -> &str;
}

impl Categorized for Recipe {
    fn category(&self) -> &str {
        &self.category
    }
}

impl Categorized for &Recipe {
    fn category(&self) -> &str {
        &self.category
    }
}

impl Categorized for Retrieved<'_> {
    fn category(&self) -> &str {
        &self.recipe.category
    }
}

/// First item of each category, in input order, at most `limit` of them.
pub fn distinct_by_category<T, I>(items: I, limit: usize) -> Vec<T>
where
    T: Categorized,
    I: IntoIterator<Item = T>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for item in items {
        if out.len() >= limit {
            break;
        }
        if seen.insert(normalize(item.category())) {
            out.push(item);
        }
    }
    out
}
