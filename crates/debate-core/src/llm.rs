//! Language-model client with timeout and retry wrapping
//!
//! All LLM traffic from the core flows through [`LlmClient`]: one place for
//! the per-call timeout, the transient-only retry policy, and the
//! empty-response check. The underlying provider is any
//! [`debate_llm::LLMProvider`].

use crate::config::AnalysisConfig;
use crate::debate::TurnRole;
use crate::prompts;
use debate_llm::{ChatMessage, CompletionRequest, LLMProvider, LlmError, RetryPolicy};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Provider wrapper shared by sources, the orchestrator, and the debate engine
pub struct LlmClient {
    provider: Arc<dyn LLMProvider>,
    retry: RetryPolicy,
    timeout: Duration,
    model: String,
    max_tokens: usize,
    temperature: f32,
}

impl LlmClient {
    /// Create a client from a provider and the shared configuration
    pub fn new(provider: Arc<dyn LLMProvider>, config: &AnalysisConfig) -> Self {
        Self {
            provider,
            retry: RetryPolicy::new(
                config.max_retries,
                config.retry_backoff_base,
                Duration::from_secs(10),
                2.0,
            ),
            timeout: config.llm_timeout,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }

    /// Override the retry policy (used by tests for fast backoff)
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// One completion call with timeout, retry, and empty-response check
    async fn complete_text(
        &self,
        operation: &str,
        system: &str,
        user_prompt: &str,
    ) -> Result<String, LlmError> {
        let response = self
            .retry
            .execute(operation, || {
                let request = CompletionRequest::builder(&self.model)
                    .system(system)
                    .add_message(ChatMessage::user(user_prompt))
                    .max_tokens(self.max_tokens)
                    .temperature(self.temperature)
                    .build();

                async {
                    tokio::time::timeout(self.timeout, self.provider.complete(request))
                        .await
                        .map_err(|_| LlmError::Timeout(self.timeout.as_secs()))?
                }
            })
            .await?;

        let text = response.text().to_string();
        if text.is_empty() {
            return Err(LlmError::MalformedResponse(format!(
                "{operation} returned an empty completion"
            )));
        }

        debug!(
            "LLM operation '{}' used {} tokens",
            operation,
            response.usage.total()
        );
        Ok(text)
    }

    /// Summarize arbitrary content under a given system prompt
    pub async fn summarize(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        self.complete_text("summarize", system, prompt).await
    }

    /// Produce one bull or bear debate turn
    pub async fn argue_turn(
        &self,
        role: TurnRole,
        symbol: &str,
        round: usize,
        context: &str,
        transcript: &str,
    ) -> Result<String, LlmError> {
        let (operation, system) = match role {
            TurnRole::Bull => ("bull_turn", prompts::BULL_SYSTEM),
            TurnRole::Bear => ("bear_turn", prompts::BEAR_SYSTEM),
            TurnRole::Synthesizer => ("synthesizer_turn", prompts::SYNTHESIZER_SYSTEM),
        };

        let prompt = prompts::argue_prompt(role, symbol, round, context, transcript);
        self.complete_text(operation, system, &prompt).await
    }

    /// Produce the synthesizer verdict text over the full transcript
    pub async fn verdict(
        &self,
        symbol: &str,
        context: &str,
        transcript: &str,
    ) -> Result<String, LlmError> {
        let prompt = prompts::verdict_prompt(symbol, context, transcript);
        self.complete_text("verdict", prompts::SYNTHESIZER_SYSTEM, &prompt)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use debate_llm::{CompletionResponse, TokenUsage};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Provider that fails transiently a fixed number of times, then succeeds
    struct FlakyProvider {
        failures: usize,
        calls: AtomicUsize,
        reply: String,
    }

    #[async_trait]
    impl LLMProvider for FlakyProvider {
        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> debate_llm::Result<CompletionResponse> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                return Err(LlmError::RequestFailed("connection reset".to_string()));
            }
            Ok(CompletionResponse {
                message: ChatMessage::assistant(self.reply.clone()),
                usage: TokenUsage::default(),
            })
        }

        fn name(&self) -> &str {
            "flaky"
        }
    }

    fn client(provider: FlakyProvider) -> LlmClient {
        let config = AnalysisConfig::default();
        LlmClient::new(Arc::new(provider), &config).with_retry_policy(RetryPolicy::fast())
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let client = client(FlakyProvider {
            failures: 2,
            calls: AtomicUsize::new(0),
            reply: "market looks flat".to_string(),
        });

        let text = client.summarize("sys", "prompt").await.unwrap();
        assert_eq!(text, "market looks flat");
    }

    #[tokio::test]
    async fn test_empty_completion_is_malformed() {
        let client = client(FlakyProvider {
            failures: 0,
            calls: AtomicUsize::new(0),
            reply: "   ".to_string(),
        });

        let err = client.summarize("sys", "prompt").await.unwrap_err();
        assert!(matches!(err, LlmError::MalformedResponse(_)));
    }
}
