//! Market analysis core: cached data orchestration and bull/bear debate
//!
//! This crate aggregates heterogeneous market data (prices, capital-flow
//! signals, news, macro indicators, financials) and runs an adversarial
//! two-agent debate that ends in an automated trading decision. It provides:
//!
//! - A time-bucketed, single-flight [`CacheStore`](cache::CacheStore) shared
//!   by all data sources
//! - The [`DataSource`](source::DataSource) capability interface plus an
//!   explicit [`SourceRegistry`](source::SourceRegistry)
//! - The [`MarketAnalyzer`](orchestrator::MarketAnalyzer) fan-out/fan-in
//!   orchestrator producing order-stable analysis bundles
//! - The [`DebateEngine`](debate::DebateEngine) fixed-protocol state machine
//!   that alternates bull and bear turns and synthesizes a
//!   [`Decision`](debate::Decision)
//!
//! Concrete provider clients (market-data APIs, scrapers, LLM inference) are
//! external collaborators: data sources implement `DataSource`, language
//! models implement `debate_llm::LLMProvider`.
//!
//! # Example
//!
//! ```rust,ignore
//! use debate_core::{AnalysisConfig, DebateEngine, MarketAnalyzer, SourceRegistry};
//! use debate_core::cache::CacheStore;
//! use debate_core::llm::LlmClient;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Arc::new(AnalysisConfig::builder().model("qwen-plus").build()?);
//!     let cache = CacheStore::new(Some("data_cache".into()));
//!     let llm = Arc::new(LlmClient::new(/* your provider */, &config));
//!
//!     let mut registry = SourceRegistry::new();
//!     // registry.register(Arc::new(MyPriceSource::new(..)));
//!
//!     let analyzer = MarketAnalyzer::new(&registry, &cache, Arc::clone(&llm), Arc::clone(&config));
//!     let engine = DebateEngine::new(analyzer, llm, config);
//!
//!     let report = engine
//!         .conduct_full_analysis("000001", chrono::Local::now().naive_local(), 2)
//!         .await?;
//!     println!("{:?}", report.decision.action);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod dates;
pub mod debate;
pub mod error;
pub mod frame;
pub mod llm;
pub mod logging;
pub mod orchestrator;
pub mod prompts;
pub mod source;

// Re-export main types for convenience
pub use cache::{CacheStore, Granularity};
pub use config::AnalysisConfig;
pub use debate::{Confidence, DebateEngine, DebateReport, Decision, TradeAction};
pub use error::{AnalysisError, FetchError, Result};
pub use frame::Frame;
pub use orchestrator::{AnalysisBundle, MarketAnalyzer};
pub use source::{DataSource, SourceKind, SourceRegistry};
