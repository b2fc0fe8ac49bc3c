//! Configuration for analysis and debate operations

use crate::error::AnalysisError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the analysis core
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Model identifier passed to the LLM provider
    pub model: String,

    /// Maximum tokens per LLM completion
    pub max_tokens: usize,

    /// Sampling temperature for LLM calls
    pub temperature: f32,

    /// Root directory for the persistent cache; None keeps the cache
    /// in memory only
    pub cache_root: Option<PathBuf>,

    /// Timeout for a single data-source call (fetch plus summary)
    pub source_timeout: Duration,

    /// Overall deadline for one orchestrator fan-out
    pub overall_deadline: Duration,

    /// Timeout for a single LLM call
    pub llm_timeout: Duration,

    /// Maximum number of attempts for transient LLM transport failures
    pub max_retries: u32,

    /// Initial backoff duration for retries
    pub retry_backoff_base: Duration,

    /// Default number of debate rounds (one bull plus one bear turn each)
    pub max_rounds: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            model: "qwen-plus".to_string(),
            max_tokens: 3000,
            temperature: 0.3,
            cache_root: Some(PathBuf::from("data_cache")),
            source_timeout: Duration::from_secs(60),
            overall_deadline: Duration::from_secs(120),
            llm_timeout: Duration::from_secs(90),
            max_retries: 3,
            retry_backoff_base: Duration::from_millis(500),
            max_rounds: 2,
        }
    }
}

impl AnalysisConfig {
    /// Create a new configuration builder
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.model.trim().is_empty() {
            return Err(AnalysisError::Config("model must not be empty".to_string()));
        }

        if self.max_retries == 0 {
            return Err(AnalysisError::Config(
                "max_retries must be greater than 0".to_string(),
            ));
        }

        if self.max_rounds == 0 {
            return Err(AnalysisError::Config(
                "max_rounds must be greater than 0".to_string(),
            ));
        }

        if self.overall_deadline < self.source_timeout {
            return Err(AnalysisError::Config(
                "overall_deadline must not be shorter than source_timeout".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for AnalysisConfig
#[derive(Debug, Default)]
pub struct AnalysisConfigBuilder {
    model: Option<String>,
    max_tokens: Option<usize>,
    temperature: Option<f32>,
    cache_root: Option<Option<PathBuf>>,
    source_timeout: Option<Duration>,
    overall_deadline: Option<Duration>,
    llm_timeout: Option<Duration>,
    max_retries: Option<u32>,
    retry_backoff_base: Option<Duration>,
    max_rounds: Option<usize>,
}

impl AnalysisConfigBuilder {
    /// Set the model identifier
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set maximum tokens per completion
    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the sampling temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the cache root directory
    pub fn cache_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.cache_root = Some(Some(root.into()));
        self
    }

    /// Keep the cache in memory only
    pub fn in_memory_cache(mut self) -> Self {
        self.cache_root = Some(None);
        self
    }

    /// Set the per-source timeout
    pub fn source_timeout(mut self, duration: Duration) -> Self {
        self.source_timeout = Some(duration);
        self
    }

    /// Set the overall fan-out deadline
    pub fn overall_deadline(mut self, duration: Duration) -> Self {
        self.overall_deadline = Some(duration);
        self
    }

    /// Set the per-call LLM timeout
    pub fn llm_timeout(mut self, duration: Duration) -> Self {
        self.llm_timeout = Some(duration);
        self
    }

    /// Set maximum retries
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    /// Set retry backoff base duration
    pub fn retry_backoff_base(mut self, duration: Duration) -> Self {
        self.retry_backoff_base = Some(duration);
        self
    }

    /// Set the default number of debate rounds
    pub fn max_rounds(mut self, rounds: usize) -> Self {
        self.max_rounds = Some(rounds);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<AnalysisConfig, AnalysisError> {
        let defaults = AnalysisConfig::default();

        let config = AnalysisConfig {
            model: self.model.unwrap_or(defaults.model),
            max_tokens: self.max_tokens.unwrap_or(defaults.max_tokens),
            temperature: self.temperature.unwrap_or(defaults.temperature),
            cache_root: self.cache_root.unwrap_or(defaults.cache_root),
            source_timeout: self.source_timeout.unwrap_or(defaults.source_timeout),
            overall_deadline: self.overall_deadline.unwrap_or(defaults.overall_deadline),
            llm_timeout: self.llm_timeout.unwrap_or(defaults.llm_timeout),
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            retry_backoff_base: self.retry_backoff_base.unwrap_or(defaults.retry_backoff_base),
            max_rounds: self.max_rounds.unwrap_or(defaults.max_rounds),
        };

        config.validate()?;
        Ok(config)
    }
}
