use crate::search::{distinct_by_category, Embedder, EmbeddingError, RecipeIndex, Retrieved};

pub const SUGGESTION_POOL: usize = 10;
pub const SUGGESTION_COUNT: usize = 3;

/// Up to three recipes similar to the pantry, one per category.
pub fn suggest<'a, E, S>(index: &'a RecipeIndex<E>, have: &[S]) -> Result<Vec<Retrieved<'a>>, EmbeddingError>
where
    E: Embedder,
    S: AsRef<str>,
{
    let names: Vec<&str> = have
        .iter()
        .map(|s| s.as_ref().trim())
        .filter(|s| !s.is_empty())
        .collect();
    if names.is_empty() {
        return Ok(Vec::new());
    }
    let pool = index.query(&names.join(", "), SUGGESTION_POOL)?;
    Ok(distinct_by_category(pool, SUGGESTION_COUNT))
}
