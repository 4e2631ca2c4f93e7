//! Rule-based fallback used when the LLM adapter fails or returns an empty
//! (post-sanitize) decision list. No network calls, pure function of the latest
//! snapshot data.

use super::schema::{Action, CommitteeOutput, Decision};
use crate::config::Config;
use crate::market::Indicators;
use serde_json::json;
use std::collections::HashMap;

const HEALTH_SECTOR_ETF: &str = "XLV";

pub fn rule_based_fallback(
    cfg: &Config,
    indicators: &HashMap<String, Indicators>,
    risk_off: f64,
) -> CommitteeOutput {
    let mut ranked: Vec<(f64, &str)> = cfg
        .investibles
        .iter()
        .map(|t| {
            let ind = indicators.get(t).copied().unwrap_or_default();
            let mut score = ind.mom20 - 2.0 * ind.volatility;
            if ind.rsi > 72.0 {
                score -= 0.01;
            }
            (score, t.as_str())
        })
        .collect();
    ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    let top: Vec<&str> = ranked.iter().take(5).map(|(_, t)| *t).collect();
    let bottom: Vec<&str> = ranked.iter().rev().take(4).map(|(_, t)| *t).collect();

    let mut decisions = Vec::with_capacity(cfg.investibles.len());
    for t in &cfg.investibles {
        let decision = if risk_off > 0.62 {
            if bottom.contains(&t.as_str()) {
                Decision {
                    ticker: t.clone(),
                    action: Action::Sell,
                    allocation_pct: 15.0,
                    note: "risk-off: trim weak/volatile".to_string(),
                }
            } else if t == HEALTH_SECTOR_ETF && cfg.investibles.iter().any(|x| x == HEALTH_SECTOR_ETF) {
                Decision {
                    ticker: t.clone(),
                    action: Action::Buy,
                    allocation_pct: 6.0,
                    note: "risk-off: tilt defensive".to_string(),
                }
            } else {
                Decision { ticker: t.clone(), action: Action::Hold, allocation_pct: 0.0, note: "risk-off: hold".to_string() }
            }
        } else if top.contains(&t.as_str()) {
            Decision {
                ticker: t.clone(),
                action: Action::Buy,
                allocation_pct: 7.0,
                note: "momentum leader: add small".to_string(),
            }
        } else if bottom.contains(&t.as_str()) {
            Decision { ticker: t.clone(), action: Action::Sell, allocation_pct: 12.0, note: "laggard: trim".to_string() }
        } else {
            Decision { ticker: t.clone(), action: Action::Hold, allocation_pct: 0.0, note: "neutral".to_string() }
        };
        decisions.push(decision);
    }

    let regime = if risk_off > 0.62 { "risk-off" } else { "risk-on" };
    let agents = json!({
        "macro": {"regime": regime, "risk_off": risk_off},
        "technical": {"top": top, "bottom": bottom},
        "risk": {"cash_buffer_pct": cfg.min_cash_buffer_pct, "guardrails": "fallback"},
    });

    let explanation = format!(
        "Fallback plan (no LLM): regime={regime}. Adds focus on leaders ({}); trims laggards ({}). \
         Kept small sizes to limit churn and preserve cash buffer.",
        top.iter().take(3).cloned().collect::<Vec<_>>().join(", "),
        bottom.iter().take(2).cloned().collect::<Vec<_>>().join(", "),
    );

    CommitteeOutput { agents, decisions, explanation, confidence: 0.42 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg_with_investibles(tickers: &[&str]) -> Config {
        let mut cfg = Config::from_env().unwrap();
        cfg.investibles = tickers.iter().map(|s| s.to_string()).collect();
        cfg
    }

    #[test]
    fn risk_off_trims_laggards_and_buys_health_etf() {
        let cfg = cfg_with_investibles(&["AAPL", "MSFT", "XLV", "JPM", "CAT"]);
        let mut indicators = HashMap::new();
        indicators.insert("AAPL".to_string(), Indicators { mom20: 0.10, ..Default::default() });
        indicators.insert("CAT".to_string(), Indicators { mom20: -0.20, ..Default::default() });

        let out = rule_based_fallback(&cfg, &indicators, 0.80);
        assert_eq!(out.confidence, 0.42);
        let xlv = out.decisions.iter().find(|d| d.ticker == "XLV").unwrap();
        assert_eq!(xlv.action, Action::Buy);
        assert_eq!(xlv.allocation_pct, 6.0);
    }

    #[test]
    fn risk_on_adds_to_momentum_leaders() {
        let cfg = cfg_with_investibles(&["AAPL", "MSFT", "JPM", "CAT", "XLV", "UNH"]);
        let mut indicators = HashMap::new();
        indicators.insert("AAPL".to_string(), Indicators { mom20: 0.30, ..Default::default() });
        let out = rule_based_fallback(&cfg, &indicators, 0.3);
        let aapl = out.decisions.iter().find(|d| d.ticker == "AAPL").unwrap();
        assert_eq!(aapl.action, Action::Buy);
    }
}
