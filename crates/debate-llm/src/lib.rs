//! LLM collaborator abstraction for debate-rs
//!
//! This crate provides the language-model boundary used by the analysis core:
//!
//! - Message and completion request/response types
//! - Provider trait for concrete LLM clients
//! - Error taxonomy separating transient transport failures from terminal
//!   malformed responses
//! - Retry policy with exponential backoff for transient failures
//! - An OpenAI-compatible HTTP provider (behind the `openai` feature)

pub mod completion;
pub mod error;
pub mod messages;
pub mod provider;
pub mod retry;

// Re-export main types
pub use completion::{CompletionRequest, CompletionResponse, TokenUsage};
pub use error::{LlmError, Result};
pub use messages::{ChatMessage, Role};
pub use provider::LLMProvider;
pub use retry::RetryPolicy;

// Provider implementations (feature-gated)
#[cfg(feature = "openai")]
pub mod providers;
