//! Error types for LLM operations

use thiserror::Error;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LlmError>;

/// Errors that can occur during LLM operations
#[derive(Error, Debug)]
pub enum LlmError {
    /// API request failed at the transport level
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Request did not complete within the configured timeout
    #[error("LLM call timed out after {0} seconds")]
    Timeout(u64),

    /// Invalid API key or authentication failed
    #[error("Invalid API key or authentication failed")]
    AuthenticationFailed,

    /// Rate limit exceeded
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Model returned an empty or unparseable response; never retried
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl LlmError {
    /// Whether a failure is a transient transport problem worth retrying.
    ///
    /// Malformed or empty responses are terminal: retrying them would only
    /// re-spend tokens on the same broken output.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RequestFailed(_) | Self::Timeout(_) | Self::RateLimitExceeded(_)
        )
    }
}

#[cfg(feature = "openai")]
impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(0)
        } else {
            Self::RequestFailed(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(LlmError::RequestFailed("boom".into()).is_transient());
        assert!(LlmError::Timeout(30).is_transient());
        assert!(LlmError::RateLimitExceeded("429".into()).is_transient());

        assert!(!LlmError::MalformedResponse("empty".into()).is_transient());
        assert!(!LlmError::AuthenticationFailed.is_transient());
        assert!(!LlmError::InvalidRequest("bad".into()).is_transient());
        assert!(!LlmError::ConfigurationError("no key".into()).is_transient());
    }

    #[test]
    fn test_error_display() {
        let err = LlmError::Timeout(30);
        assert_eq!(err.to_string(), "LLM call timed out after 30 seconds");
    }
}
