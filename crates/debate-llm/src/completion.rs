//! Completion request and response types
//!
//! The debate protocol is text-only, so requests carry a model id, the
//! conversation, an optional system prompt, and sampling parameters.

use crate::ChatMessage;
use serde::{Deserialize, Serialize};

/// One completion request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Provider-specific model identifier
    pub model: String,

    /// Conversation history
    pub messages: Vec<ChatMessage>,

    /// System prompt, when the caller sets one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Generation cap in tokens
    pub max_tokens: usize,

    /// Sampling temperature; the provider's default applies when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    /// Start building a request for the given model
    pub fn builder(model: impl Into<String>) -> CompletionRequestBuilder {
        CompletionRequestBuilder {
            model: model.into(),
            messages: Vec::new(),
            system: None,
            max_tokens: 1024,
            temperature: None,
        }
    }
}

/// Builder for [`CompletionRequest`]
pub struct CompletionRequestBuilder {
    model: String,
    messages: Vec<ChatMessage>,
    system: Option<String>,
    max_tokens: usize,
    temperature: Option<f32>,
}

impl CompletionRequestBuilder {
    /// Append one message to the conversation
    pub fn add_message(mut self, message: ChatMessage) -> Self {
        self.messages.push(message);
        self
    }

    /// Set the system prompt
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the generation cap
    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the sampling temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn build(self) -> CompletionRequest {
        CompletionRequest {
            model: self.model,
            messages: self.messages,
            system: self.system,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

/// Completion returned by a provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// The assistant's generated message
    pub message: ChatMessage,

    /// Token accounting for the call
    pub usage: TokenUsage,
}

impl CompletionResponse {
    /// Trimmed text of the generated message
    pub fn text(&self) -> &str {
        self.message.text()
    }
}

/// Token accounting for one completion
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: usize,
    pub output_tokens: usize,
}

impl TokenUsage {
    /// Input plus output tokens
    pub fn total(&self) -> usize {
        self.input_tokens + self.output_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_collects_fields() {
        let request = CompletionRequest::builder("qwen-plus")
            .system("You are a market analyst")
            .add_message(ChatMessage::user("Summarize today's session."))
            .max_tokens(2048)
            .temperature(0.3)
            .build();

        assert_eq!(request.model, "qwen-plus");
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.system.as_deref(), Some("You are a market analyst"));
        assert_eq!(request.max_tokens, 2048);
        assert_eq!(request.temperature, Some(0.3));
    }

    #[test]
    fn test_unset_fields_are_skipped_in_json() {
        let request = CompletionRequest::builder("qwen-plus")
            .add_message(ChatMessage::user("hi"))
            .build();
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("temperature"));
        assert!(!json.contains("system"));
    }

    #[test]
    fn test_response_text_and_usage() {
        let response = CompletionResponse {
            message: ChatMessage::assistant("  hold steady \n"),
            usage: TokenUsage {
                input_tokens: 100,
                output_tokens: 50,
            },
        };
        assert_eq!(response.text(), "hold steady");
        assert_eq!(response.usage.total(), 150);
    }
}
