//! Prompt templates for summarization, narrative, and debate turns
//!
//! English renditions of the original analyst prompts: the summarizer digests
//! one source's table, the narrative call merges all available sections, and
//! the bull/bear/synthesizer prompts drive the debate protocol.

use crate::debate::TurnRole;
use crate::source::SourceKind;
use chrono::{NaiveDate, NaiveDateTime};

/// System prompt for per-source and merged-market summaries
pub const SUMMARIZER_SYSTEM: &str = "You are a senior quantitative market analyst. \
Summarize the provided market data factually and concisely. \
Do not speculate beyond the data, avoid emotional or absolute judgements, \
and never invent figures that are not present in the input.";

/// System prompt for the bullish debate analyst
pub const BULL_SYSTEM: &str = "You are a seasoned bullish equity analyst taking part \
in an investment debate. Argue the upside case from the data you are given, \
and rebut the bear's most recent points directly.";

/// System prompt for the bearish debate analyst
pub const BEAR_SYSTEM: &str = "You are a seasoned bearish equity analyst taking part \
in an investment debate. Argue the downside case from the data you are given, \
focus on risks and negative factors, and rebut the bull's most recent points directly.";

/// System prompt for the synthesizing portfolio manager
pub const SYNTHESIZER_SYSTEM: &str = "You are a portfolio manager moderating an \
investment debate. Critically weigh both sides and commit to a clear, actionable \
recommendation. Do not default to holding merely because both sides made valid points.";

/// Prompt asking for a structured summary of one source's raw frame
pub fn source_summary_prompt(
    kind: SourceKind,
    trigger_time: NaiveDateTime,
    rendered_frame: &str,
) -> String {
    format!(
        "Summarize the following {title} as of {time} in under 800 characters. \
Highlight the facts most relevant for a trading decision.\n\n{frame}",
        title = kind.title(),
        time = trigger_time.format("%Y-%m-%d %H:%M"),
        frame = rendered_frame,
    )
}

/// Prompt merging per-source summaries into one market narrative
pub fn narrative_prompt(trade_date: NaiveDate, merged_sections: &str) -> String {
    format!(
        "Based on the following market data for the {date} trading session, write a \
professional market analysis report (under 3000 characters).\n\n{sections}\n\n\
Cover: the macro environment, index and price action, speculative-money activity, \
and the impact of the day's news. Judge whether the market is trending up, trending \
down, or range-bound, name the sectors most worth watching, and flag the main risks. \
Base every statement on the data above; do not reference data sources that are not \
listed.",
        date = trade_date.format("%Y-%m-%d"),
        sections = merged_sections,
    )
}

/// Prompt for the shorter two-source market digest
pub fn quick_summary_prompt(trade_date: NaiveDate, merged_sections: &str) -> String {
    format!(
        "Based on the following data for the {date} trading session, write a concise \
market digest (under 1000 characters). Cover index performance, volume, and \
speculative-money activity only.\n\n{sections}",
        date = trade_date.format("%Y-%m-%d"),
        sections = merged_sections,
    )
}

/// Prompt for one bull or bear debate turn
pub fn argue_prompt(
    role: TurnRole,
    symbol: &str,
    round: usize,
    context: &str,
    transcript: &str,
) -> String {
    let (stance, opponent) = match role {
        TurnRole::Bull => ("bullish", "bear"),
        TurnRole::Bear => ("bearish", "bull"),
        TurnRole::Synthesizer => ("synthesizing", "either side"),
    };

    format!(
        "You are arguing the {stance} case for {symbol} (round {round}).\n\n\
## Market data context\n{context}\n\n\
## Debate so far\n{transcript}\n\n\
Requirements:\n\
1. Open by naming the symbol {symbol}.\n\
2. Ground every claim in the market data context above.\n\
3. If the {opponent} has already spoken, rebut their latest argument directly.\n\
4. Keep a natural conversational tone, no special formatting, under 800 characters.",
        stance = stance,
        symbol = symbol,
        round = round,
        context = context,
        transcript = if transcript.is_empty() { "(none yet)" } else { transcript },
        opponent = opponent,
    )
}

/// Prompt for the final synthesizer verdict
pub fn verdict_prompt(symbol: &str, context: &str, transcript: &str) -> String {
    format!(
        "The debate over {symbol} has concluded. Evaluate both sides and commit to a \
final decision.\n\n\
## Market data context\n{context}\n\n\
## Full debate transcript\n{transcript}\n\n\
Your answer must contain, each on its own line:\n\
Decision: buy, sell, or hold (pick the side with the strongest arguments).\n\
Confidence: high, medium, or low.\n\
Rationale: why the winning arguments prevail.\n\
Risks: the main risks to this decision and how to respond to them.",
        symbol = symbol,
        context = context,
        transcript = transcript,
    )
}
