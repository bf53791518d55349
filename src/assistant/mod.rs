pub mod cache;
pub mod chat;
pub mod generation;
pub mod prompts;
pub mod suggest;

pub use cache::InstructionCache;
pub use chat::ChatSession;
pub use generation::{OpenRouterGenerator, TextGenerator};
pub use suggest::suggest;
