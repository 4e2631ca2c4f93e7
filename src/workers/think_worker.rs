//! Think worker: reads the latest snapshot, runs the committee, stars the result
//! against `critic_score`, and — when auto-trading and the trading window allows —
//! hands the sanitized decisions to the Executor in the same logical step.

use crate::committee::{run_committee, title_for_signals};
use crate::config::Config;
use crate::executor::execute_trades;
use crate::llm::LlmAdapter;
use crate::market::{Indicators, Quote, Signals};
use crate::store::insights::InsightStatus;
use crate::store::Store;
use anyhow::Result;
use std::collections::HashMap;

const RECENT_TRADES_FOR_PROMPT: i64 = 20;

/// `true` iff executing right now is allowed: either the operator opted into
/// trading anytime, or regular market hours are closed (the design trades on daily
/// bars outside market hours by default).
pub fn trading_window_allows(cfg: &Config, at: chrono::DateTime<chrono::Utc>) -> bool {
    cfg.trade_anytime || !crate::clock::market_is_open(at)
}

pub async fn step_once(store: &Store, cfg: &Config, adapter: &LlmAdapter) -> Result<()> {
    let Some(snapshot) = store.latest_snapshot().await? else {
        return Ok(());
    };

    let prices: HashMap<String, Quote> = serde_json::from_str(&snapshot.prices_json).unwrap_or_default();
    let indicators: HashMap<String, Indicators> = serde_json::from_str(&snapshot.indicators_json).unwrap_or_default();
    let signals: Signals = serde_json::from_str(&snapshot.signals_json).unwrap_or_default();

    let mark_prices: HashMap<String, f64> = prices.iter().map(|(k, v)| (k.clone(), v.current)).collect();
    let portfolio = store.portfolio_state(Some(&mark_prices)).await?;
    let trade_history = store.recent_trade_summary(RECENT_TRADES_FOR_PROMPT).await?;

    let (output, critic_score) =
        run_committee(cfg, adapter, &prices, &indicators, &signals, &portfolio, &trade_history).await;

    let starred = critic_score >= cfg.star_threshold;
    let title = title_for_signals(&signals);
    let ts = crate::clock::utc_now_iso();
    let agents_json = output.agents.to_string();
    let decisions_json = serde_json::to_string(&output.decisions)?;

    let window_allows = trading_window_allows(cfg, crate::clock::now());
    let status = if cfg.auto_trade && starred && window_allows {
        InsightStatus::Applied
    } else if cfg.auto_trade && starred {
        InsightStatus::Queued
    } else {
        InsightStatus::New
    };

    let insight_id = store
        .insert_insight(
            &ts,
            title,
            &output.explanation,
            &agents_json,
            &decisions_json,
            output.confidence,
            critic_score,
            starred,
            status,
            Some(snapshot.snapshot_id),
        )
        .await?;

    if status == InsightStatus::Applied {
        execute_trades(store, cfg, &output.decisions, &prices, "think_worker insight", insight_id).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::budget::LlmBudget;
    use crate::llm::provider::ChatProvider;
    use async_trait::async_trait;

    struct SilentProvider;
    #[async_trait]
    impl ChatProvider for SilentProvider {
        async fn chat(&self, _system: &str, _user: &str) -> anyhow::Result<String> {
            anyhow::bail!("no llm in this test")
        }
    }

    #[tokio::test]
    async fn no_snapshot_is_a_clean_no_op() {
        let store = Store::open_in_memory().unwrap();
        store.init_db(1000.0).await.unwrap();
        let cfg = Config::from_env().unwrap();
        let adapter = LlmAdapter::new(Box::new(SilentProvider), LlmBudget::new(8), 0);
        step_once(&store, &cfg, &adapter).await.unwrap();
        assert_eq!(store.snapshot_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn falls_back_and_records_an_insight_when_llm_is_unavailable() {
        let store = Store::open_in_memory().unwrap();
        store.init_db(10_000.0).await.unwrap();
        let mut cfg = Config::from_env().unwrap();
        cfg.investibles = vec!["AAPL".to_string()];
        cfg.bellwethers = vec!["SPY".to_string()];
        cfg.auto_trade = false;

        let mut prices = HashMap::new();
        let hist: Vec<f64> = (0..25).map(|i| 100.0 + i as f64).collect();
        prices.insert("AAPL".to_string(), Quote { current: *hist.last().unwrap(), previous: 0.0, change_pct: 0.01, history: hist, volume: 0 });
        let prices_json = serde_json::to_string(&prices).unwrap();
        store.insert_snapshot("t0", &prices_json, "{}", "{}", "{}").await.unwrap();

        let adapter = LlmAdapter::new(Box::new(SilentProvider), LlmBudget::new(8), 0);
        step_once(&store, &cfg, &adapter).await.unwrap();

        let insight = store.get_insight(1).await.unwrap();
        assert!(insight.is_some());
    }
}
