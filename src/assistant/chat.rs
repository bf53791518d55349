use anyhow::{Context, Result};
use tracing::{debug, info};

use super::generation::TextGenerator;
use super::prompts::{chat_messages, context_block};
use crate::api_connection::ChatMessage;
use crate::search::{Embedder, RecipeIndex};

pub const CONTEXT_TOP_K: usize = 3;

/// In-memory chat transcript grounded on the recipe index.
#[derive(Debug, Default, Clone)]
pub struct ChatSession {
    history: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// User and assistant turns so far, oldest first.
    pub fn transcript(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }

    /// Answers `message` with the nearest recipes as context. The transcript
    /// only grows when the generator succeeds.
    pub async fn respond<E, G>(&mut self, index: &RecipeIndex<E>, generator: &G, message: &str) -> Result<String>
    where
        E: Embedder,
        G: TextGenerator,
    {
        let similar = index
            .query(message, CONTEXT_TOP_K)
            .context("Failed to retrieve similar recipes")?;
        debug!(retrieved = similar.len(), "Chat context assembled");

        let context = context_block(&similar);
        let messages = chat_messages(&context, &self.history, message);
        let reply = generator.generate(&messages).await?;

        self.history.push(ChatMessage::user(message));
        self.history.push(ChatMessage::assistant(reply.clone()));
        info!(turns = self.history.len() / 2, "Chat turn completed");
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::generation::testing::EchoGenerator;
    use crate::assistant::prompts::{CHAT_PERSONA, NO_CONTEXT};
    use crate::recipe::{Ingredients, Recipe};
    use crate::search::{HashingEmbedder, Metric};

    fn index(recipes: Vec<Recipe>) -> RecipeIndex<HashingEmbedder> {
        RecipeIndex::build(recipes, HashingEmbedder::default(), Metric::Cosine).unwrap()
    }

    fn recipe(title: &str, ingredients: &str) -> Recipe {
        Recipe {
            title: title.into(),
            category: "wege".into(),
            ingredients: Ingredients::Flat(ingredients.into()),
            description: None,
        }
    }

    #[tokio::test]
    async fn test_respond_builds_context_and_records_turns() -> Result<()> {
        let index = index(vec![
            recipe("Zupa pomidorowa", "pomidor, cebula"),
            recipe("Omlet", "jajko, masło"),
        ]);
        let generator = EchoGenerator::default();
        let mut session = ChatSession::new();

        let reply = session.respond(&index, &generator, "Mam pomidory").await?;
        assert_eq!(reply, "echo: Mam pomidory");
        session.respond(&index, &generator, "A coś z jajek?").await?;

        assert_eq!(session.transcript().len(), 4);
        assert_eq!(session.transcript()[0], ChatMessage::user("Mam pomidory"));

        let seen = generator.seen.lock().unwrap();
        let first = &seen[0];
        assert_eq!(first[0].content, CHAT_PERSONA);
        assert!(first[1].content.contains("Przepis: Zupa pomidorowa"));
        // The user turn appears once: history first, then the new message.
        assert_eq!(first.len(), 3);
        assert_eq!(seen[1].len(), 5);
        Ok(())
    }

    #[tokio::test]
    async fn test_failure_leaves_transcript_unchanged() {
        let index = index(vec![recipe("Omlet", "jajko")]);
        let mut session = ChatSession::new();
        assert!(session.respond(&index, &EchoGenerator::failing(), "Cześć").await.is_err());
        assert!(session.transcript().is_empty());
    }

    #[tokio::test]
    async fn test_empty_index_uses_fallback_context() -> Result<()> {
        let index = index(Vec::new());
        let generator = EchoGenerator::default();
        let mut session = ChatSession::new();
        session.respond(&index, &generator, "Cokolwiek").await?;

        let seen = generator.seen.lock().unwrap();
        assert_eq!(seen[0][1].content, NO_CONTEXT);
        Ok(())
    }
}
