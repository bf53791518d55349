use anyhow::Result;
use std::collections::{HashMap, VecDeque};
use tracing::debug;

use super::generation::TextGenerator;
use super::prompts::instruction_messages;
use crate::normalize::normalize;

pub const DEFAULT_CAPACITY: usize = 64;

type Key = (String, String);

/// Bounded LRU of generated cooking instructions, keyed by the normalized
/// (title, ingredients) pair.
#[derive(Debug)]
pub struct InstructionCache {
    capacity: usize,
    entries: HashMap<Key, String>,
    // Least recently used at the front.
    order: VecDeque<Key>,
}

impl Default for InstructionCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl InstructionCache {
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn key(title: &str, ingredients: &str) -> Key {
        (normalize(title), normalize(ingredients))
    }

    fn touch(&mut self, key: &Key) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            if let Some(k) = self.order.remove(pos) {
                self.order.push_back(k);
            }
        }
    }

    pub fn get(&mut self, title: &str, ingredients: &str) -> Option<&str> {
        let key = Self::key(title, ingredients);
        if !self.entries.contains_key(&key) {
            return None;
        }
        self.touch(&key);
        self.entries.get(&key).map(String::as_str)
    }

    pub fn insert(&mut self, title: &str, ingredients: &str, text: String) {
        let key = Self::key(title, ingredients);
        if self.entries.insert(key.clone(), text).is_some() {
            self.touch(&key);
            return;
        }
        self.order.push_back(key);
        while self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                debug!(title = %evicted.0, "Evicting cached instructions");
                self.entries.remove(&evicted);
            }
        }
    }

    /// Cached instructions, or a fresh generation. Failures are not cached.
    pub async fn get_or_generate<G: TextGenerator>(
        &mut self,
        generator: &G,
        title: &str,
        ingredients: &str,
    ) -> Result<String> {
        if let Some(text) = self.get(title, ingredients) {
            return Ok(text.to_string());
        }
        let text = generator.generate(&instruction_messages(title, ingredients)).await?;
        self.insert(title, ingredients, text.clone());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::generation::testing::EchoGenerator;

    #[test]
    fn test_zero_capacity_is_raised() {
        assert_eq!(InstructionCache::new(0).capacity(), 1);
        assert_eq!(InstructionCache::default().capacity(), DEFAULT_CAPACITY);
    }

    #[test]
    fn test_lru_eviction_order() {
        let mut cache = InstructionCache::new(2);
        cache.insert("Omlet", "jajko", "a".into());
        cache.insert("Zupa", "pomidor", "b".into());
        // Touch "Omlet" so "Zupa" becomes the eviction candidate.
        assert_eq!(cache.get("Omlet", "jajko"), Some("a"));
        cache.insert("Sałatka", "ogórek", "c".into());

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("Zupa", "pomidor"), None);
        assert_eq!(cache.get("Omlet", "jajko"), Some("a"));
        assert_eq!(cache.get("Sałatka", "ogórek"), Some("c"));
    }

    #[test]
    fn test_keys_are_normalized() {
        let mut cache = InstructionCache::new(4);
        cache.insert("  Omlet ", "Jajko,  masło", "steps".into());
        assert_eq!(cache.get("omlet", "jajko, masło"), Some("steps"));

        cache.insert("OMLET", "jajko, masło", "newer".into());
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("Omlet", "jajko, masło"), Some("newer"));
    }

    #[tokio::test]
    async fn test_get_or_generate_calls_generator_once() -> Result<()> {
        let generator = EchoGenerator::default();
        let mut cache = InstructionCache::default();

        let first = cache.get_or_generate(&generator, "Omlet", "jajko").await?;
        let second = cache.get_or_generate(&generator, "omlet", "JAJKO").await?;
        assert_eq!(first, second);
        assert!(first.contains("'Omlet'"));
        assert_eq!(generator.call_count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let generator = EchoGenerator::failing();
        let mut cache = InstructionCache::default();

        assert!(cache.get_or_generate(&generator, "Omlet", "jajko").await.is_err());
        assert!(cache.get_or_generate(&generator, "Omlet", "jajko").await.is_err());
        assert!(cache.is_empty());
        assert_eq!(generator.call_count(), 2);
    }
}
