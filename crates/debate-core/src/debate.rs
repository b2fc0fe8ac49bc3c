//! Adversarial bull/bear debate engine with a fixed turn protocol
//!
//! One session runs INIT -> (BULL_ARGUE -> BEAR_ARGUE) x max_rounds ->
//! SYNTHESIZE -> DONE. The bull always opens a round and the bear always
//! answers it; the synthesizer speaks exactly once, after the final round.
//! A language-model failure mid-session aborts the debate and hands the
//! partial transcript back to the caller, never a decision.

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::llm::LlmClient;
use crate::orchestrator::{AnalysisBundle, MarketAnalyzer};
use crate::source::SourceKind;
use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Speaker of one debate turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    Bull,
    Bear,
    Synthesizer,
}

impl std::fmt::Display for TurnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Bull => "Bull",
            Self::Bear => "Bear",
            Self::Synthesizer => "Synthesizer",
        };
        write!(f, "{label}")
    }
}

/// Protocol state of a debate session.
///
/// `Done` is terminal; a finished session is never resumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebateState {
    Init,
    BullArgue,
    BearArgue,
    Synthesize,
    Done,
}

/// One utterance in the transcript
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateTurn {
    /// Round the turn belongs to; the synthesizer turn carries the last round
    pub round: usize,
    /// Who spoke
    pub role: TurnRole,
    /// Verbatim model output
    pub text: String,
    /// Data sources that were available in the context for this turn
    pub data_refs: Vec<SourceKind>,
}

/// Recommended trade direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeAction {
    Buy,
    Sell,
    Hold,
}

/// Stated conviction behind a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// Final synthesized trading decision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub action: TradeAction,
    pub confidence: Confidence,
    /// Why the winning side prevailed
    pub rationale: String,
    /// Main risks and responses named by the synthesizer
    pub risk_notes: String,
}

impl Decision {
    /// Extract a decision from free-form verdict text.
    ///
    /// Missing fields fall back to conservative defaults (hold, medium
    /// confidence); only fully empty text is rejected upstream before this
    /// is reached, so parsing itself is infallible.
    pub fn parse(text: &str) -> Self {
        let action = match first_match(text, r"(?im)^\s*decision\s*[:：]\s*(buy|sell|hold)") {
            Some(word) => match word.to_ascii_lowercase().as_str() {
                "buy" => TradeAction::Buy,
                "sell" => TradeAction::Sell,
                _ => TradeAction::Hold,
            },
            None => {
                warn!("Verdict text carries no decision line, defaulting to hold");
                TradeAction::Hold
            }
        };

        let confidence = match first_match(text, r"(?im)^\s*confidence\s*[:：]\s*(high|medium|low)")
        {
            Some(word) => match word.to_ascii_lowercase().as_str() {
                "high" => Confidence::High,
                "low" => Confidence::Low,
                _ => Confidence::Medium,
            },
            None => Confidence::Medium,
        };

        let rationale =
            match first_match(text, r"(?is)rationale\s*[:：]\s*(.*?)(?:\n\s*risks\s*[:：]|\z)")
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
            {
                Some(r) => r,
                None => text.trim().to_string(),
            };

        let risk_notes = first_match(text, r"(?is)risks\s*[:：]\s*(.*)\z")
            .map(|s| s.trim().to_string())
            .unwrap_or_default();

        Self {
            action,
            confidence,
            rationale,
            risk_notes,
        }
    }
}

/// First capture group of `pattern` in `text`, if the pattern matches
fn first_match(text: &str, pattern: &str) -> Option<String> {
    if let Ok(re) = Regex::new(pattern) {
        re.captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    } else {
        None
    }
}

/// Full record of one debate session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateSession {
    /// Symbol under debate
    pub symbol: String,
    /// Turns in speaking order
    pub turns: Vec<DebateTurn>,
    /// Protocol state; Done once the decision is made
    pub state: DebateState,
    /// Present only once the session reaches Done
    pub decision: Option<Decision>,
}

impl DebateSession {
    /// Start a fresh session in the Init state
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            turns: Vec::new(),
            state: DebateState::Init,
            decision: None,
        }
    }
}

/// Everything one full run of the engine produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateReport {
    pub symbol: String,
    pub trigger_time: NaiveDateTime,
    pub trade_date: NaiveDate,
    /// The consolidated market data the debate argued over
    pub bundle: AnalysisBundle,
    /// Completed session transcript
    pub turns: Vec<DebateTurn>,
    /// The synthesized decision
    pub decision: Decision,
}

/// Drives one adversarial debate over a fresh analysis bundle
pub struct DebateEngine {
    analyzer: MarketAnalyzer,
    llm: Arc<LlmClient>,
    config: Arc<AnalysisConfig>,
}

impl DebateEngine {
    /// Create an engine over an analyzer and a shared LLM client
    pub fn new(
        analyzer: MarketAnalyzer,
        llm: Arc<LlmClient>,
        config: Arc<AnalysisConfig>,
    ) -> Self {
        Self {
            analyzer,
            llm,
            config,
        }
    }

    /// Run the full pipeline: gather data, debate, synthesize a decision.
    ///
    /// `max_rounds = 0` falls back to the configured default. With
    /// `max_rounds = 2` the transcript holds exactly five turns: bull, bear,
    /// bull, bear, synthesizer.
    pub async fn conduct_full_analysis(
        &self,
        symbol: &str,
        trigger_time: NaiveDateTime,
        max_rounds: usize,
    ) -> Result<DebateReport, AnalysisError> {
        let rounds = if max_rounds == 0 {
            self.config.max_rounds
        } else {
            max_rounds
        };

        let bundle = self.analyzer.comprehensive_analysis(trigger_time).await?;
        let context = debate_context(&bundle);
        let data_refs: Vec<SourceKind> = bundle.results.iter().map(|r| r.source_id).collect();

        info!(
            "Starting debate for {} over {} rounds ({} sources available)",
            symbol,
            rounds,
            data_refs.len()
        );

        let mut session = DebateSession::new(symbol);

        for round in 1..=rounds {
            for role in [TurnRole::Bull, TurnRole::Bear] {
                session.state = match role {
                    TurnRole::Bull => DebateState::BullArgue,
                    _ => DebateState::BearArgue,
                };

                let transcript = render_transcript(&session.turns);
                let text = match self
                    .llm
                    .argue_turn(role, symbol, round, &context, &transcript)
                    .await
                {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("Debate for {} aborted during round {}: {}", symbol, round, e);
                        return Err(AnalysisError::DebateAborted {
                            symbol: symbol.to_string(),
                            turns: session.turns,
                            reason: e.to_string(),
                        });
                    }
                };

                session.turns.push(DebateTurn {
                    round,
                    role,
                    text,
                    data_refs: data_refs.clone(),
                });
            }
        }

        session.state = DebateState::Synthesize;

        let transcript = render_transcript(&session.turns);
        let verdict_text = match self.llm.verdict(symbol, &context, &transcript).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Debate for {} aborted during synthesis: {}", symbol, e);
                return Err(AnalysisError::DebateAborted {
                    symbol: symbol.to_string(),
                    turns: session.turns,
                    reason: e.to_string(),
                });
            }
        };

        session.turns.push(DebateTurn {
            round: rounds,
            role: TurnRole::Synthesizer,
            text: verdict_text.clone(),
            data_refs,
        });

        let decision = Decision::parse(&verdict_text);
        session.decision = Some(decision.clone());
        session.state = DebateState::Done;

        info!(
            "Debate for {} done: {:?} with {:?} confidence after {} turns",
            symbol,
            decision.action,
            decision.confidence,
            session.turns.len()
        );

        Ok(DebateReport {
            symbol: session.symbol,
            trigger_time,
            trade_date: bundle.trade_date,
            bundle,
            turns: session.turns,
            decision,
        })
    }
}

/// Market context handed to every debate turn
fn debate_context(bundle: &AnalysisBundle) -> String {
    let mut context = format!(
        "# Market narrative ({})\n{}",
        bundle.trade_date.format("%Y-%m-%d"),
        bundle.narrative
    );
    let sections = bundle.merged_sections();
    if !sections.is_empty() {
        context.push_str("\n\n");
        context.push_str(&sections);
    }
    context
}

/// Transcript rendering shared by all prompts
fn render_transcript(turns: &[DebateTurn]) -> String {
    turns
        .iter()
        .map(|t| format!("{} (round {}): {}", t.role, t.round, t.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}
