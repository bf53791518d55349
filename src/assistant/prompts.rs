use crate::api_connection::ChatMessage;
use crate::recipe::Recipe;
use crate::search::Retrieved;

pub const INSTRUCTION_PERSONA: &str = "Jesteś asystentem kulinarnym podającym zwięzłe instrukcje.";
pub const CHAT_PERSONA: &str = "Jesteś pomocnym kuchennym asystentem AI. Odpowiadasz po polsku. \
                                Udzielaj odpowiedzi bazując na dostępnych przepisach:";
pub const NO_CONTEXT: &str = "Brak podobnych przepisów.";

/// Asks for short numbered cooking steps for one recipe.
pub fn instruction_messages(title: &str, ingredients: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(INSTRUCTION_PERSONA),
        ChatMessage::user(format!(
            "Przepis: '{}'. Składniki: {}. Podaj krótką instrukcję przygotowania krok po kroku w punktach.",
            title, ingredients
        )),
    ]
}

pub fn recipe_context(recipe: &Recipe) -> String {
    format!(
        "Przepis: {}\nSkładniki: {}\nOpis: {}",
        recipe.title,
        recipe.ingredients.as_flat_text(),
        recipe.description.as_deref().unwrap_or_default()
    )
}

/// One block per retrieved recipe, blank-line separated.
pub fn context_block(retrieved: &[Retrieved<'_>]) -> String {
    if retrieved.is_empty() {
        return NO_CONTEXT.to_string();
    }
    retrieved
        .iter()
        .map(|r| recipe_context(r.recipe))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// `[persona, context, history.., user message]`.
pub fn chat_messages(context: &str, history: &[ChatMessage], user_message: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 3);
    messages.push(ChatMessage::system(CHAT_PERSONA));
    messages.push(ChatMessage::system(context));
    messages.extend_from_slice(history);
    messages.push(ChatMessage::user(user_message));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::{IngredientEntry, Ingredients};

    fn soup() -> Recipe {
        Recipe {
            title: "Zupa pomidorowa".into(),
            category: "wege".into(),
            ingredients: Ingredients::Structured(vec![
                IngredientEntry { item: "pomidor".into(), quantity: Some(4.0) },
                IngredientEntry { item: "cebula".into(), quantity: None },
            ]),
            description: Some("Klasyczna zupa.".into()),
        }
    }

    #[test]
    fn test_instruction_prompt_mentions_recipe() {
        let messages = instruction_messages("Omlet", "jajko, masło");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert!(messages[1].content.contains("'Omlet'"));
        assert!(messages[1].content.contains("jajko, masło"));
    }

    #[test]
    fn test_context_block() {
        assert_eq!(context_block(&[]), NO_CONTEXT);

        let recipe = soup();
        let mut plain = soup();
        plain.title = "Zupa 2".into();
        plain.description = None;
        let retrieved = [
            Retrieved { recipe: &recipe, distance: 0.1 },
            Retrieved { recipe: &plain, distance: 0.2 },
        ];
        let block = context_block(&retrieved);
        assert!(block.starts_with("Przepis: Zupa pomidorowa\nSkładniki: pomidor, cebula\nOpis: Klasyczna zupa."));
        assert!(block.ends_with("Przepis: Zupa 2\nSkładniki: pomidor, cebula\nOpis: "));
        assert_eq!(block.matches("\n\n").count(), 1);
    }

    #[test]
    fn test_chat_message_layout() {
        let history = vec![ChatMessage::user("Co na obiad?"), ChatMessage::assistant("Zupa.")];
        let messages = chat_messages("ctx", &history, "A na kolację?");
        let roles: Vec<&str> = messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, ["system", "system", "user", "assistant", "user"]);
        assert_eq!(messages[1].content, "ctx");
        assert_eq!(messages[4].content, "A na kolację?");
    }
}
