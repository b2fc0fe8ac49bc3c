//! Comprehensive market analyzer: concurrent fan-out over all registered
//! data sources, order-stable fan-in into one bundle
//!
//! Per-source failures never escape this module; they become entries in
//! `missing_sources`. Only a failure of the final narrative call (a
//! protocol-level LLM failure) is surfaced as an error.

use crate::cache::CacheStore;
use crate::config::AnalysisConfig;
use crate::dates::smart_trading_date;
use crate::error::{AnalysisError, FetchError};
use crate::frame::Frame;
use crate::llm::LlmClient;
use crate::prompts;
use crate::source::{CachedSource, SourceKind, SourceRegistry};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Narrative used when every configured source failed
const NO_DATA_NARRATIVE: &str = "No market data available for this session.";

/// Outcome marker for one source fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    /// Fetch and summary both succeeded
    Ok,
    /// The source failed or timed out
    Failed,
}

/// One source's contribution to a bundle; immutable once produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSourceResult {
    /// Which source produced this result
    pub source_id: SourceKind,
    /// Trigger time the fetch was keyed on
    pub trigger_time: NaiveDateTime,
    /// Raw tabular payload
    pub raw_frame: Frame,
    /// Derived natural-language summary
    pub summary_text: String,
    /// Outcome marker
    pub status: SourceStatus,
}

/// Consolidated, order-stable result of one orchestrator invocation.
///
/// `results` always follows the fixed [`SourceKind`] priority order,
/// independent of which source finished first; repeated runs over identical
/// cached inputs produce identical bundles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisBundle {
    /// Trigger time of the invocation
    pub trigger_time: NaiveDateTime,
    /// Trading session the data belongs to
    pub trade_date: NaiveDate,
    /// Successful per-source results in fixed priority order
    pub results: Vec<DataSourceResult>,
    /// Merged market narrative over the available summaries
    pub narrative: String,
    /// Sources that failed, timed out, or were cancelled
    pub missing_sources: BTreeSet<SourceKind>,
}

impl AnalysisBundle {
    /// Merged per-source summary sections, skipping missing sources
    pub fn merged_sections(&self) -> String {
        let mut sections = Vec::with_capacity(self.results.len());
        for result in &self.results {
            sections.push(format!(
                "## {}\n{}",
                result.source_id.title(),
                result.summary_text
            ));
        }
        sections.join("\n\n")
    }

    /// Summary text for one source, if it is present in the bundle
    pub fn summary_for(&self, kind: SourceKind) -> Option<&str> {
        self.results
            .iter()
            .find(|r| r.source_id == kind)
            .map(|r| r.summary_text.as_str())
    }
}

/// Fans out concurrent calls across all registered sources and fans the
/// results back in as one [`AnalysisBundle`]
pub struct MarketAnalyzer {
    sources: Vec<CachedSource>,
    llm: Arc<LlmClient>,
    config: Arc<AnalysisConfig>,
}

impl MarketAnalyzer {
    /// Create an analyzer over a registry, sharing one cache and LLM client
    pub fn new(
        registry: &SourceRegistry,
        cache: &CacheStore,
        llm: Arc<LlmClient>,
        config: Arc<AnalysisConfig>,
    ) -> Self {
        let sources = registry
            .ordered()
            .into_iter()
            .map(|source| CachedSource::new(source, cache.clone(), Arc::clone(&llm)))
            .collect();

        Self {
            sources,
            llm,
            config,
        }
    }

    /// Spawn one fetch-and-summarize task per source, each with its own timeout
    fn spawn_source_tasks(
        &self,
        trigger_time: NaiveDateTime,
    ) -> Vec<(SourceKind, JoinHandle<Result<DataSourceResult, FetchError>>)> {
        self.sources
            .iter()
            .map(|source| {
                let kind = source.kind();
                let source = source.clone();
                let timeout = self.config.source_timeout;

                let handle = tokio::spawn(async move {
                    let work = async {
                        let raw_frame = source.raw_frame(trigger_time).await?;
                        let summary_text = source.summary(trigger_time).await?;
                        Ok(DataSourceResult {
                            source_id: kind,
                            trigger_time,
                            raw_frame,
                            summary_text,
                            status: SourceStatus::Ok,
                        })
                    };

                    match tokio::time::timeout(timeout, work).await {
                        Ok(result) => result,
                        Err(_) => Err(FetchError::Timeout {
                            source_id: kind.id().to_string(),
                            secs: timeout.as_secs(),
                        }),
                    }
                });

                (kind, handle)
            })
            .collect()
    }

    /// Run one full fan-out and return the consolidated bundle.
    ///
    /// Sources that fail or miss the overall deadline are recorded in
    /// `missing_sources`; an all-sources failure still yields a bundle.
    pub async fn comprehensive_analysis(
        &self,
        trigger_time: NaiveDateTime,
    ) -> Result<AnalysisBundle, AnalysisError> {
        let trade_date = smart_trading_date(trigger_time);
        info!(
            "Starting comprehensive analysis for the {} session across {} sources",
            trade_date,
            self.sources.len()
        );

        let handles = self.spawn_source_tasks(trigger_time);
        let deadline = tokio::time::Instant::now() + self.config.overall_deadline;

        let mut results = Vec::new();
        let mut missing_sources = BTreeSet::new();

        // Collect in spawn order, which is the fixed priority order; the
        // shared absolute deadline bounds the total wait
        for (kind, mut handle) in handles {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(Ok(result))) => results.push(result),
                Ok(Ok(Err(e))) => {
                    warn!("Source {} failed: {}", kind, e);
                    missing_sources.insert(kind);
                }
                Ok(Err(join_err)) => {
                    warn!("Source {} task aborted: {}", kind, join_err);
                    missing_sources.insert(kind);
                }
                Err(_) => {
                    warn!("Overall deadline elapsed, cancelling source {}", kind);
                    handle.abort();
                    missing_sources.insert(kind);
                }
            }
        }

        let mut bundle = AnalysisBundle {
            trigger_time,
            trade_date,
            results,
            narrative: String::new(),
            missing_sources,
        };

        if bundle.results.is_empty() {
            warn!("All sources missing for the {} session", trade_date);
            bundle.narrative = NO_DATA_NARRATIVE.to_string();
            return Ok(bundle);
        }

        let prompt = prompts::narrative_prompt(trade_date, &bundle.merged_sections());
        bundle.narrative = self
            .llm
            .summarize(prompts::SUMMARIZER_SYSTEM, &prompt)
            .await?;

        info!(
            "Comprehensive analysis done: {}/{} sources available",
            bundle.results.len(),
            self.sources.len()
        );
        Ok(bundle)
    }

    /// Shorter digest over the price and hot-money sources only
    pub async fn quick_summary(
        &self,
        trigger_time: NaiveDateTime,
    ) -> Result<String, AnalysisError> {
        let trade_date = smart_trading_date(trigger_time);
        let quick_kinds = [SourceKind::Price, SourceKind::HotMoney];

        let tasks = self
            .sources
            .iter()
            .filter(|s| quick_kinds.contains(&s.kind()))
            .map(|source| {
                let source = source.clone();
                let timeout = self.config.source_timeout;
                async move {
                    let kind = source.kind();
                    let summary =
                        tokio::time::timeout(timeout, source.summary(trigger_time)).await;
                    (kind, summary)
                }
            });

        let mut sections = Vec::new();
        for (kind, outcome) in futures::future::join_all(tasks).await {
            match outcome {
                Ok(Ok(summary)) => sections.push(format!("## {}\n{}", kind.title(), summary)),
                Ok(Err(e)) => warn!("Source {} failed during quick summary: {}", kind, e),
                Err(_) => warn!("Source {} timed out during quick summary", kind),
            }
        }

        if sections.is_empty() {
            return Ok(NO_DATA_NARRATIVE.to_string());
        }

        let prompt = prompts::quick_summary_prompt(trade_date, &sections.join("\n\n"));
        let digest = self
            .llm
            .summarize(prompts::SUMMARIZER_SYSTEM, &prompt)
            .await?;
        Ok(digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Granularity;
    use crate::source::DataSource;
    use async_trait::async_trait;
    use debate_llm::{
        ChatMessage, CompletionRequest, CompletionResponse, LLMProvider, RetryPolicy, TokenUsage,
    };
    use std::sync::Mutex;
    use std::time::Duration;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    /// Provider that records prompts and answers with canned text
    struct EchoProvider {
        prompts: Mutex<Vec<String>>,
    }

    impl EchoProvider {
        fn new() -> Self {
            Self {
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LLMProvider for EchoProvider {
        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> debate_llm::Result<CompletionResponse> {
            let prompt = request
                .messages
                .first()
                .map(|m| m.content.clone())
                .unwrap_or_default();
            self.prompts.lock().unwrap().push(prompt);
            Ok(CompletionResponse {
                message: ChatMessage::assistant("analysis text"),
                usage: TokenUsage::default(),
            })
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    /// Source that optionally fails or delays before answering
    struct TestSource {
        kind: SourceKind,
        delay: Duration,
        fail: bool,
    }

    impl TestSource {
        fn ok(kind: SourceKind, delay_ms: u64) -> Arc<dyn DataSource> {
            Arc::new(Self {
                kind,
                delay: Duration::from_millis(delay_ms),
                fail: false,
            })
        }

        fn failing(kind: SourceKind) -> Arc<dyn DataSource> {
            Arc::new(Self {
                kind,
                delay: Duration::ZERO,
                fail: true,
            })
        }
    }

    #[async_trait]
    impl DataSource for TestSource {
        fn kind(&self) -> SourceKind {
            self.kind
        }

        fn granularity(&self) -> Granularity {
            Granularity::Hour
        }

        async fn fetch_raw(&self, _trigger_time: NaiveDateTime) -> Result<Frame, FetchError> {
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(FetchError::Provider {
                    source_id: self.kind.id().to_string(),
                    reason: "upstream unavailable".to_string(),
                });
            }
            let mut frame = Frame::new(["title", "content"]);
            frame.push_row([self.kind.title(), "some data"]);
            Ok(frame)
        }
    }

    fn analyzer_with(
        sources: Vec<Arc<dyn DataSource>>,
        provider: Arc<EchoProvider>,
    ) -> MarketAnalyzer {
        let config = Arc::new(
            AnalysisConfig::builder()
                .in_memory_cache()
                .source_timeout(Duration::from_secs(5))
                .overall_deadline(Duration::from_secs(10))
                .build()
                .unwrap(),
        );
        let cache = CacheStore::new(None);
        let llm = Arc::new(
            LlmClient::new(provider, &config).with_retry_policy(RetryPolicy::no_retry()),
        );

        let mut registry = SourceRegistry::new();
        for source in sources {
            registry.register(source);
        }

        MarketAnalyzer::new(&registry, &cache, llm, config)
    }

    #[tokio::test]
    async fn test_partial_failure_bundle() {
        let provider = Arc::new(EchoProvider::new());
        let analyzer = analyzer_with(
            vec![
                TestSource::ok(SourceKind::Price, 0),
                TestSource::ok(SourceKind::HotMoney, 0),
                TestSource::failing(SourceKind::News),
                TestSource::ok(SourceKind::Macro, 0),
            ],
            Arc::clone(&provider),
        );

        let bundle = analyzer
            .comprehensive_analysis(dt("2024-08-19 16:00:00"))
            .await
            .unwrap();

        assert_eq!(bundle.results.len(), 3);
        assert_eq!(
            bundle.missing_sources.iter().copied().collect::<Vec<_>>(),
            vec![SourceKind::News]
        );
        assert_eq!(bundle.narrative, "analysis text");

        // The narrative prompt must skip the missing source entirely
        let narrative_prompt = provider.prompts.lock().unwrap().last().cloned().unwrap();
        assert!(narrative_prompt.contains(SourceKind::Price.title()));
        assert!(!narrative_prompt.contains(SourceKind::News.title()));
    }

    #[tokio::test]
    async fn test_all_sources_failing_still_yields_bundle() {
        let provider = Arc::new(EchoProvider::new());
        let analyzer = analyzer_with(
            vec![
                TestSource::failing(SourceKind::Price),
                TestSource::failing(SourceKind::News),
            ],
            Arc::clone(&provider),
        );

        let bundle = analyzer
            .comprehensive_analysis(dt("2024-08-19 16:00:00"))
            .await
            .unwrap();

        assert!(bundle.results.is_empty());
        assert_eq!(bundle.missing_sources.len(), 2);
        assert_eq!(bundle.narrative, NO_DATA_NARRATIVE);
        // No LLM call happens when there is nothing to narrate
        assert!(provider.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_merge_order_stable_under_varied_completion_order() {
        let order_of = |delays: [u64; 4]| async move {
            let provider = Arc::new(EchoProvider::new());
            let analyzer = analyzer_with(
                vec![
                    TestSource::ok(SourceKind::Price, delays[0]),
                    TestSource::ok(SourceKind::HotMoney, delays[1]),
                    TestSource::ok(SourceKind::News, delays[2]),
                    TestSource::ok(SourceKind::Macro, delays[3]),
                ],
                provider,
            );
            let bundle = analyzer
                .comprehensive_analysis(dt("2024-08-19 16:00:00"))
                .await
                .unwrap();
            bundle
                .results
                .iter()
                .map(|r| r.source_id)
                .collect::<Vec<_>>()
        };

        let slow_first = order_of([80, 40, 20, 0]).await;
        let fast_first = order_of([0, 20, 40, 80]).await;

        assert_eq!(slow_first, fast_first);
        assert_eq!(
            slow_first,
            vec![
                SourceKind::Price,
                SourceKind::HotMoney,
                SourceKind::News,
                SourceKind::Macro
            ]
        );
    }

    #[tokio::test]
    async fn test_deadline_cancels_stragglers() {
        let provider = Arc::new(EchoProvider::new());
        let config = Arc::new(
            AnalysisConfig::builder()
                .in_memory_cache()
                .source_timeout(Duration::from_millis(200))
                .overall_deadline(Duration::from_millis(200))
                .build()
                .unwrap(),
        );
        let cache = CacheStore::new(None);
        let llm = Arc::new(
            LlmClient::new(Arc::clone(&provider) as Arc<dyn LLMProvider>, &config)
                .with_retry_policy(RetryPolicy::no_retry()),
        );
        let mut registry = SourceRegistry::new();
        registry.register(TestSource::ok(SourceKind::Price, 0));
        registry.register(TestSource::ok(SourceKind::News, 5_000));
        let analyzer = MarketAnalyzer::new(&registry, &cache, llm, config);

        let bundle = analyzer
            .comprehensive_analysis(dt("2024-08-19 16:00:00"))
            .await
            .unwrap();

        assert_eq!(bundle.results.len(), 1);
        assert!(bundle.missing_sources.contains(&SourceKind::News));
    }

    #[tokio::test]
    async fn test_quick_summary_uses_two_sources() {
        let provider = Arc::new(EchoProvider::new());
        let analyzer = analyzer_with(
            vec![
                TestSource::ok(SourceKind::Price, 0),
                TestSource::ok(SourceKind::HotMoney, 0),
                TestSource::ok(SourceKind::News, 0),
            ],
            Arc::clone(&provider),
        );

        let digest = analyzer.quick_summary(dt("2024-08-19 16:00:00")).await.unwrap();
        assert_eq!(digest, "analysis text");

        let last_prompt = provider.prompts.lock().unwrap().last().cloned().unwrap();
        assert!(last_prompt.contains(SourceKind::Price.title()));
        assert!(!last_prompt.contains(SourceKind::News.title()));
    }
}
