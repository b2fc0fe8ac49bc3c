//! Error types for market analysis operations

use crate::debate::DebateTurn;
use debate_llm::LlmError;
use thiserror::Error;

/// Result type alias for analysis operations
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Per-source fetch failures.
///
/// Clone is required: single-flight waiters all receive the same failure.
/// These errors stay contained inside the orchestrator boundary, where they
/// become `missing_sources` entries instead of propagating.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Data-provider call failed
    #[error("provider error for {source_id}: {reason}")]
    Provider { source_id: String, reason: String },

    /// Source call did not finish within its timeout
    #[error("{source_id} timed out after {secs} seconds")]
    Timeout { source_id: String, secs: u64 },

    /// Language-model failure while deriving a source summary
    #[error("summary generation failed for {source_id}: {reason}")]
    Summary { source_id: String, reason: String },

    /// Cache serialization or storage error
    #[error("cache error: {0}")]
    Cache(String),
}

/// Errors surfaced to callers of the analysis core
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// A per-source fetch failure escaping outside orchestration (e.g. a
    /// direct `CachedSource` call)
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Language-model failure terminal for the enclosing operation
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// The debate protocol failed mid-session; carries the partial
    /// transcript, never a Decision
    #[error("debate for {symbol} aborted after {} turns: {reason}", turns.len())]
    DebateAborted {
        symbol: String,
        turns: Vec<DebateTurn>,
        reason: String,
    },

    /// Missing credentials or invalid configuration; fatal at startup
    #[error("configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_display() {
        let err = FetchError::Timeout {
            source_id: "news".to_string(),
            secs: 30,
        };
        assert_eq!(err.to_string(), "news timed out after 30 seconds");
    }

    #[test]
    fn test_fetch_error_is_clone() {
        let err = FetchError::Provider {
            source_id: "price".to_string(),
            reason: "connection refused".to_string(),
        };
        let copy = err.clone();
        assert_eq!(err.to_string(), copy.to_string());
    }

    // A field named `source` would be claimed by thiserror as the error
    // cause; `source_id` must stay a plain string usable in Display
    #[test]
    fn test_fetch_error_has_no_cause_chain() {
        let err = FetchError::Provider {
            source_id: "price".to_string(),
            reason: "connection refused".to_string(),
        };
        assert!(std::error::Error::source(&err).is_none());
        assert_eq!(
            err.to_string(),
            "provider error for price: connection refused"
        );
    }

    #[test]
    fn test_debate_aborted_display() {
        let err = AnalysisError::DebateAborted {
            symbol: "000001".to_string(),
            turns: Vec::new(),
            reason: "LLM call timed out after 30 seconds".to_string(),
        };
        assert!(err.to_string().contains("000001"));
        assert!(err.to_string().contains("0 turns"));
    }
}
