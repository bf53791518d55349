use anyhow::Result;
use std::future::Future;
use std::time::Duration;

use crate::api_connection::{ChatMessage, Provider};

/// Anything that turns a chat transcript into a reply.
pub trait TextGenerator {
    fn generate(&self, messages: &[ChatMessage]) -> impl Future<Output = Result<String>> + Send;
}

/// `TextGenerator` backed by the OpenRouter chat-completion endpoint.
#[derive(Clone, Debug)]
pub struct OpenRouterGenerator {
    provider: Provider,
}

impl OpenRouterGenerator {
    pub fn new(api_key_env_var: &str, model: &str, timeout: Duration) -> Self {
        Self {
            provider: Provider::openrouter(api_key_env_var)
                .with_model(model)
                .with_timeout(timeout),
        }
    }

    pub fn from_provider(provider: Provider) -> Self {
        Self { provider }
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }
}

impl TextGenerator for OpenRouterGenerator {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String> {
        let reply = self.provider.complete(messages.to_vec()).await?;
        Ok(reply)
    }
}
