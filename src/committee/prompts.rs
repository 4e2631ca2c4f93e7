//! Prompt text for the multi-agent committee call.

use crate::config::Config;
use crate::market::{Indicators, Signals};
use crate::store::portfolio::PortfolioState;
use std::collections::HashMap;

pub const SYSTEM_PROMPT: &str = r#"You are a four-agent investing committee: macro, technical, risk, and allocator.
Read the market context and respond with ONLY one JSON object shaped as:
{"agents": {"macro": {...}, "technical": {...}, "risk": {...}, "allocator": {...}},
 "decisions": [{"ticker": "XXX", "action": "BUY|SELL|HOLD", "allocation_pct": 0-80, "note": "..."}],
 "explanation": "plain-English summary of the plan",
 "confidence": 0.0-1.0}
Only propose tickers from the investible universe given below. Keep notes under 260 characters."#;

pub fn build_user_prompt(
    cfg: &Config,
    prices: &HashMap<String, crate::market::Quote>,
    indicators: &HashMap<String, Indicators>,
    signals: &Signals,
    portfolio: &PortfolioState,
    trade_history: &str,
) -> String {
    let bell_lines: Vec<String> = cfg
        .bellwethers
        .iter()
        .filter_map(|b| prices.get(b).map(|p| format!("{b}: {:+.2}% 1d (px {:.2})", p.change_pct, p.current)))
        .collect();

    let inv_lines: Vec<String> = cfg
        .investibles
        .iter()
        .filter_map(|t| {
            let p = prices.get(t)?;
            let ind = indicators.get(t).copied().unwrap_or_default();
            Some(format!(
                "{t}: ${:.2} ({:+.2}% 1d), mom5 {:+.2}%, mom20 {:+.2}%, RSI {:.1}, z {:+.1}, vol {:.3}",
                p.current, p.change_pct, ind.mom5 * 100.0, ind.mom20 * 100.0, ind.rsi, ind.zscore, ind.volatility
            ))
        })
        .collect();

    let pos_lines: Vec<String> = portfolio
        .positions
        .iter()
        .filter(|p| p.qty > 0.0)
        .map(|p| format!("- {}: {:.4} sh (~${:.2})", p.symbol, p.qty, p.market_value))
        .collect();

    format!(
        "Bellwethers:\n{}\n\nSignals: risk_off={:.2} rates_up={:.2} oil_shock={:.2} semi_pulse={:.2}\n\n\
         Investibles:\n{}\n\nCash: ${:.2}\nEquity: ${:.2}\nPositions:\n{}\n\nRecent trades:\n{}\n\n\
         Guard rails: min_cash_buffer={:.1}% max_buy_per_cycle={:.1}% max_sell_per_cycle={:.1}% max_symbol_weight={:.1}%",
        if bell_lines.is_empty() { "(missing)".to_string() } else { bell_lines.join("\n") },
        signals.risk_off, signals.rates_up, signals.oil_shock, signals.semi_pulse,
        if inv_lines.is_empty() { "(missing)".to_string() } else { inv_lines.join("\n") },
        portfolio.cash, portfolio.equity,
        if pos_lines.is_empty() { "- None".to_string() } else { pos_lines.join("\n") },
        trade_history,
        cfg.min_cash_buffer_pct, cfg.max_buy_equity_pct_per_cycle, cfg.max_sell_holding_pct_per_cycle,
        cfg.max_symbol_weight_pct,
    )
}
