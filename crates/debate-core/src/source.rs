//! Data-source capability interface and registry
//!
//! Concrete providers (market-data APIs, scrapers) live outside the core;
//! they implement [`DataSource`] and are registered explicitly in a
//! [`SourceRegistry`]. [`CachedSource`] wraps a registered source and routes
//! both its raw fetches and its derived summaries through the shared
//! [`CacheStore`](crate::cache::CacheStore).

use crate::cache::{CacheStore, Granularity};
use crate::error::FetchError;
use crate::frame::Frame;
use crate::llm::LlmClient;
use crate::prompts;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// The fixed set of data-source identifiers, in priority order.
///
/// Bundle results are always merged in this order regardless of which
/// source finished first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Index and price market data
    Price,
    /// Capital-flow / speculative-money activity
    HotMoney,
    /// News and announcements
    News,
    /// Macroeconomic indicators
    Macro,
    /// Financial statements
    Financials,
    /// Per-symbol analysis data
    StockAnalysis,
}

impl SourceKind {
    /// All kinds in merge-priority order
    pub const ALL: [SourceKind; 6] = [
        SourceKind::Price,
        SourceKind::HotMoney,
        SourceKind::News,
        SourceKind::Macro,
        SourceKind::Financials,
        SourceKind::StockAnalysis,
    ];

    /// Stable identifier used for cache partitions and logs
    pub fn id(&self) -> &'static str {
        match self {
            SourceKind::Price => "price",
            SourceKind::HotMoney => "hot_money",
            SourceKind::News => "news",
            SourceKind::Macro => "macro",
            SourceKind::Financials => "financials",
            SourceKind::StockAnalysis => "stock_analysis",
        }
    }

    /// Human-readable section title for reports and prompts
    pub fn title(&self) -> &'static str {
        match self {
            SourceKind::Price => "Price Market Data",
            SourceKind::HotMoney => "Hot Money Activity",
            SourceKind::News => "News & Announcements",
            SourceKind::Macro => "Macro Economic Indicators",
            SourceKind::Financials => "Financial Statements",
            SourceKind::StockAnalysis => "Per-Symbol Analysis Data",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Capability interface for one external data provider
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Which source slot this provider fills
    fn kind(&self) -> SourceKind;

    /// Cache granularity the provider's data refreshes at
    fn granularity(&self) -> Granularity;

    /// Fetch the raw tabular frame for a trigger time
    async fn fetch_raw(&self, trigger_time: NaiveDateTime) -> Result<Frame, FetchError>;
}

/// Explicit mapping from source identifiers to adapters; no implicit
/// subclass discovery
#[derive(Default)]
pub struct SourceRegistry {
    sources: HashMap<SourceKind, Arc<dyn DataSource>>,
}

impl SourceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under its declared kind, replacing any previous one
    pub fn register(&mut self, source: Arc<dyn DataSource>) {
        let kind = source.kind();
        if self.sources.insert(kind, source).is_some() {
            warn!("Replacing previously registered source adapter for {kind}");
        }
    }

    /// Get the adapter for a kind
    pub fn get(&self, kind: SourceKind) -> Option<Arc<dyn DataSource>> {
        self.sources.get(&kind).cloned()
    }

    /// Registered adapters in fixed priority order
    pub fn ordered(&self) -> Vec<Arc<dyn DataSource>> {
        SourceKind::ALL
            .iter()
            .filter_map(|kind| self.sources.get(kind).cloned())
            .collect()
    }

    /// Number of registered adapters
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// A registered source with cache and summarization wired in.
///
/// Both operations are routed through the shared cache under the adapter's
/// own identifier; derived summaries live in a sibling `<id>.summary`
/// partition with the same bucketing rule.
#[derive(Clone)]
pub struct CachedSource {
    source: Arc<dyn DataSource>,
    cache: CacheStore,
    llm: Arc<LlmClient>,
}

impl CachedSource {
    /// Wrap a source with the shared cache and LLM client
    pub fn new(source: Arc<dyn DataSource>, cache: CacheStore, llm: Arc<LlmClient>) -> Self {
        Self { source, cache, llm }
    }

    /// The wrapped source's kind
    pub fn kind(&self) -> SourceKind {
        self.source.kind()
    }

    /// Raw tabular frame for a trigger time, served from cache when the
    /// bucket is already populated
    pub async fn raw_frame(&self, trigger_time: NaiveDateTime) -> Result<Frame, FetchError> {
        let source = Arc::clone(&self.source);
        let kind = source.kind();
        let value = self
            .cache
            .get_or_compute(kind.id(), trigger_time, source.granularity(), move || {
                async move {
                    let frame = source.fetch_raw(trigger_time).await?;
                    serde_json::to_value(&frame).map_err(|e| FetchError::Cache(e.to_string()))
                }
            })
            .await?;

        serde_json::from_value(value).map_err(|e| FetchError::Cache(e.to_string()))
    }

    /// Natural-language summary of the raw frame, cached with the same
    /// bucketing rule as the fetch itself
    pub async fn summary(&self, trigger_time: NaiveDateTime) -> Result<String, FetchError> {
        let kind = self.kind();
        let summary_id = format!("{}.summary", kind.id());
        let this = self.clone();

        let value = self
            .cache
            .get_or_compute(
                &summary_id,
                trigger_time,
                self.source.granularity(),
                move || async move {
                    let frame = this.raw_frame(trigger_time).await?;
                    if frame.is_empty() {
                        return Err(FetchError::Provider {
                            source_id: kind.id().to_string(),
                            reason: "provider returned no rows".to_string(),
                        });
                    }

                    let prompt = prompts::source_summary_prompt(kind, trigger_time, &frame.render());
                    let text = this
                        .llm
                        .summarize(prompts::SUMMARIZER_SYSTEM, &prompt)
                        .await
                        .map_err(|e| FetchError::Summary {
                            source_id: kind.id().to_string(),
                            reason: e.to_string(),
                        })?;
                    Ok(serde_json::Value::String(text))
                },
            )
            .await?;

        match value {
            serde_json::Value::String(text) => Ok(text),
            other => Err(FetchError::Cache(format!(
                "summary partition held a non-string payload: {other}"
            ))),
        }
    }
}
