//! OpenAI-compatible provider implementation

use super::{ChatRequest, ChatResponse, Completion, Provider, ProviderError};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Instant;

/// OpenAI-compatible chat-completions provider
#[derive(Debug, Clone)]
pub struct OpenAIProvider {
    client: Client,
    api_key: String,
    base_url: String,
    user_agent: Option<String>,
}

impl OpenAIProvider {
    /// Create a new provider; a trailing slash on `base_url` is ignored
    pub fn new(api_key: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            user_agent: None,
        }
    }

    /// Send a custom User-Agent header
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Get the chat completions endpoint URL
    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl Provider for OpenAIProvider {
    async fn complete(&self, request: &ChatRequest) -> Result<Completion, ProviderError> {
        let start = Instant::now();

        let mut builder = self
            .client
            .post(self.chat_url())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json");
        if let Some(ref agent) = self.user_agent {
            builder = builder.header("User-Agent", agent);
        }

        let response = builder.json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let response_body: ChatResponse = response.json().await?;
        tracing::debug!(
            "{} responded in {} ms",
            request.model,
            start.elapsed().as_millis()
        );

        let choice = response_body
            .choices
            .into_iter()
            .next()
            .ok_or(ProviderError::NoChoices)?;

        Ok(Completion {
            content: choice.message.content.unwrap_or_default(),
            total_tokens: response_body.usage.map(|u| u.total_tokens),
        })
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_provider_creation() {
        let provider = OpenAIProvider::new(
            "test-key".to_string(),
            "https://api.openai.com/v1".to_string(),
        );
        assert_eq!(provider.name(), "openai");
        assert!(provider.user_agent.is_none());
    }

    #[test]
    fn test_chat_url() {
        let provider = OpenAIProvider::new(
            "test-key".to_string(),
            "https://open.bigmodel.cn/api/paas/v4/".to_string(),
        );
        assert_eq!(
            provider.chat_url(),
            "https://open.bigmodel.cn/api/paas/v4/chat/completions"
        );
    }

    #[test]
    fn test_user_agent() {
        let provider = OpenAIProvider::new("k".to_string(), "http://localhost".to_string())
            .with_user_agent("Mozilla/5.0");
        assert_eq!(provider.user_agent.as_deref(), Some("Mozilla/5.0"));
    }
}
