//! LLM provider implementations
//!
//! A provider turns a prompt into free-form completion text. Only
//! OpenAI-compatible chat-completion endpoints are implemented; the
//! Zhipu/GLM, vLLM and SGLang gateways used for the experiments speak the
//! same protocol.

pub mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Common request structure for chat completions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl ChatRequest {
    /// Single-turn request with one user message
    pub fn user(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.into(),
            }],
            max_tokens: None,
            temperature: None,
        }
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Message in a chat conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

/// Common response structure for chat completions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    pub choices: Vec<Choice>,
    pub usage: Option<Usage>,
}

/// A single completion choice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub index: u32,
    pub message: ResponseMessage,
    pub finish_reason: Option<String>,
}

/// Assistant message; some gateways send `null` content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// Token usage information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Text returned by a provider
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    /// Content of the first choice
    pub content: String,
    /// Token usage, when reported
    pub total_tokens: Option<u32>,
}

/// Provider errors
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP/network error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status from the API
    #[error("API error ({status}): {body}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// The response carried no choices
    #[error("response contained no choices")]
    NoChoices,
}

/// Provider trait that all LLM providers must implement
#[async_trait]
pub trait Provider: Send + Sync {
    /// Send a chat completion request and return the completion text
    async fn complete(&self, request: &ChatRequest) -> Result<Completion, ProviderError>;

    /// Get the provider name
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_request_serialization() {
        let request = ChatRequest::user("glm-4.5", "hello").with_temperature(Some(0.7));
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["model"], json!("glm-4.5"));
        assert_eq!(value["messages"][0]["role"], json!("user"));
        assert_eq!(value["messages"][0]["content"], json!("hello"));
        assert!(value.get("max_tokens").is_none());
        assert!((value["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_response_with_null_content() {
        let response: ChatResponse = serde_json::from_value(json!({
            "choices": [{"message": {"role": "assistant", "content": null}, "finish_reason": "stop"}],
            "usage": null
        }))
        .unwrap();

        assert!(response.choices[0].message.content.is_none());
        assert!(response.usage.is_none());
    }
}
