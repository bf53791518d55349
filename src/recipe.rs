use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use tracing::warn;

use crate::lenient::null_as_default;
use crate::normalize::normalize;

static TRAILING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+\d+$").expect("trailing-number pattern is valid"));

/// One entry of a structured ingredient list. `quantity` multiplies the
/// ingredient's standard weight and defaults to 1.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct IngredientEntry {
    #[serde(default, alias = "nazwa", deserialize_with = "null_as_default")]
    pub item: String,
    #[serde(default, alias = "ilosc", skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
}

/// The two shapes a recipe's ingredients arrive in. Structured lists are tried
/// first when deserializing.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum Ingredients {
    Structured(Vec<IngredientEntry>),
    Flat(String),
}

impl Default for Ingredients {
    fn default() -> Self {
        Ingredients::Flat(String::new())
    }
}

/// Ingredients in neither shape are read as an empty list so one bad record
/// cannot fail a whole file.
fn ingredients_or_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Ingredients, D::Error> {
    let Some(value) = Option::<serde_json::Value>::deserialize(deserializer)? else {
        return Ok(Ingredients::default());
    };
    Ok(serde_json::from_value(value).unwrap_or_else(|e| {
        warn!(error = %e, "Unreadable ingredient list, treating it as empty");
        Ingredients::default()
    }))
}

/// A normalized ingredient name with its unit multiplier.
#[derive(Debug, Clone, PartialEq)]
pub struct IngredientLine {
    pub name: String,
    pub quantity: f64,
}

impl Ingredients {
    /// Extracts normalized lines from either representation. Empty names are
    /// dropped; flat-string entries always have quantity 1.
    pub fn lines(&self) -> Vec<IngredientLine> {
        match self {
            Ingredients::Flat(text) => text
                .split(',')
                .map(normalize)
                .filter(|name| !name.is_empty())
                .map(|name| IngredientLine { name, quantity: 1.0 })
                .collect(),
            Ingredients::Structured(entries) => entries
                .iter()
                .filter_map(|entry| {
                    let name = normalize(&entry.item);
                    (!name.is_empty()).then(|| IngredientLine {
                        name,
                        quantity: entry.quantity.unwrap_or(1.0),
                    })
                })
                .collect(),
        }
    }

    /// Distinct normalized names in first-seen order.
    pub fn names(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.lines()
            .into_iter()
            .filter_map(|line| seen.insert(line.name.clone()).then_some(line.name))
            .collect()
    }

    /// Comma-joined text form. Structured lists are flattened to their item
    /// names so both shapes embed comparably.
    pub fn as_flat_text(&self) -> String {
        match self {
            Ingredients::Flat(text) => text.trim().to_string(),
            Ingredients::Structured(entries) => entries
                .iter()
                .map(|entry| entry.item.trim())
                .filter(|item| !item.is_empty())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines().is_empty()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Recipe {
    #[serde(default, alias = "tytul", deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, alias = "kategoria", deserialize_with = "null_as_default")]
    pub category: String,
    #[serde(default, alias = "skladniki", deserialize_with = "ingredients_or_empty")]
    pub ingredients: Ingredients,
    #[serde(default, alias = "opis", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Recipe {
    /// Text the embedding index encodes for this recipe.
    pub fn embedding_text(&self) -> String {
        format!("{}: {}", self.title, self.ingredients.as_flat_text())
    }

    pub fn display_title(&self) -> &str {
        display_title(&self.title)
    }
}

/// Strips a trailing numeric disambiguator: "Zupa pomidorowa 2" -> "Zupa pomidorowa".
pub fn display_title(title: &str) -> &str {
    match TRAILING_NUMBER.find(title) {
        Some(m) => &title[..m.start()],
        None => title,
    }
}

/// Keeps the first recipe for each display title. Matchers leave this to
/// their callers so it happens exactly once per presentation.
pub fn dedup_by_display_title<'a, T, F>(items: impl IntoIterator<Item = T>, recipe_of: F) -> Vec<T>
where
    F: Fn(&T) -> &'a Recipe,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(display_title(&recipe_of(item).title).to_string()))
        .collect()
}

/// Dietary filter applied before matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Diet {
    #[default]
    Any,
    Vegetarian,
    Keto,
    LowFat,
    LowSugar,
}

impl Diet {
    pub const ALL: [Diet; 5] = [Diet::Any, Diet::Vegetarian, Diet::Keto, Diet::LowFat, Diet::LowSugar];

    /// Category labels (normalized) that satisfy this diet.
    pub fn labels(self) -> &'static [&'static str] {
        match self {
            Diet::Any => &["any", "dowolna"],
            Diet::Vegetarian => &["vegetarian", "wege", "wegetariańska"],
            Diet::Keto => &["keto"],
            Diet::LowFat => &["low-fat", "niskotłuszczowa"],
            Diet::LowSugar => &["low-sugar", "niskocukrowa"],
        }
    }

    pub fn admits(self, category: &str) -> bool {
        match self {
            Diet::Any => true,
            _ => {
                let category = normalize(category);
                self.labels().contains(&category.as_str())
            }
        }
    }
}

impl fmt::Display for Diet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.labels()[0])
    }
}

impl FromStr for Diet {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s);
        Diet::ALL
            .into_iter()
            .find(|diet| diet.labels().contains(&wanted.as_str()))
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Unknown diet '{}'. Expected one of: any, vegetarian, keto, low-fat, low-sugar",
                    s
                )
            })
    }
}
