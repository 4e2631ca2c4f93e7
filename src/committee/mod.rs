pub mod critic;
pub mod explain;
pub mod fallback;
pub mod prompts;
pub mod schema;

use crate::config::Config;
use crate::llm::LlmAdapter;
use crate::market::{Indicators, Quote, Signals};
use crate::store::portfolio::PortfolioState;
use schema::{parse_committee_output, CommitteeOutput};
use std::collections::HashMap;

/// One full committee cycle: ask the LLM, sanitize, fall back to the rule-based
/// plan on any failure, synthesize an explanation if needed, and score the result.
/// Never fails — always returns something the Think worker can act on.
pub async fn run_committee(
    cfg: &Config,
    adapter: &LlmAdapter,
    prices: &HashMap<String, Quote>,
    indicators: &HashMap<String, Indicators>,
    signals: &Signals,
    portfolio: &PortfolioState,
    trade_history: &str,
) -> (CommitteeOutput, f64) {
    let user = prompts::build_user_prompt(cfg, prices, indicators, signals, portfolio, trade_history);
    let (parsed, _raw) = adapter.chat_json(prompts::SYSTEM_PROMPT, &user).await;

    let mut output = parsed
        .as_ref()
        .and_then(|v| parse_committee_output(v, cfg))
        .filter(|o| !o.decisions.is_empty());

    if output.is_none() {
        output = Some(fallback::rule_based_fallback(cfg, indicators, signals.risk_off));
    }
    let mut output = output.unwrap();

    if output.explanation.is_empty() {
        output.explanation =
            explain::synthesize_explanation(&output.agents, &output.decisions, cfg.explanation_min_length);
    }

    let score = critic::critic_score(
        &output.explanation,
        &output.decisions,
        output.confidence,
        cfg.explanation_min_length,
    );

    (output, score)
}

/// Picks an insight title from the dominant signal, per the think-worker dispatch rule.
pub fn title_for_signals(signals: &Signals) -> &'static str {
    if signals.risk_off > 0.62 {
        "Agent plan: risk-off posture"
    } else if signals.semi_pulse > 0.62 {
        "Agent plan: lean semis/QQQ impulse"
    } else if signals.oil_shock > 0.62 {
        "Agent plan: inflation/oil impulse"
    } else {
        "Agent committee plan"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_picks_dominant_signal() {
        assert_eq!(title_for_signals(&Signals { risk_off: 0.70, ..Default::default() }), "Agent plan: risk-off posture");
        assert_eq!(title_for_signals(&Signals { semi_pulse: 0.70, ..Default::default() }), "Agent plan: lean semis/QQQ impulse");
        assert_eq!(title_for_signals(&Signals::default()), "Agent committee plan");
    }
}
