//! Dream worker: one assessment per tick — pick a category and pair (§4.4 dispatch),
//! derive heuristic channels from recent price history, optionally let the LLM
//! adjudicator override them, then replace the edge's channel set.

use crate::config::Config;
use crate::kg::dispatch::{self, DispatchCategory, OptionPairInputs};
use crate::llm::LlmAdapter;
use crate::market::Quote;
use crate::store::Store;
use anyhow::Result;
use rand::Rng;
use std::collections::HashMap;

/// Arbitrary small positive bump applied to both endpoints' `score` on every
/// assessment — keeps frequently-touched nodes ranked above stale ones without
/// letting any single tick dominate.
const SCORE_TOUCH_DELTA: f64 = 0.02;

pub async fn step_once(store: &Store, cfg: &Config, adapter: &LlmAdapter) -> Result<()> {
    let category = dispatch::pick_category(cfg.options_enabled);
    let Some((node_a, node_b)) = dispatch::pick_pair(store, category).await? else {
        return Ok(());
    };

    let histories = latest_histories(store).await?;
    let heuristic = match category {
        DispatchCategory::InvestibleBellwether => {
            let hist_a = histories.get(&node_a).cloned().unwrap_or_default();
            let hist_b = histories.get(&node_b).cloned().unwrap_or_default();
            dispatch::derive_heuristic_channels(&node_b, &hist_a, &hist_b)
        }
        DispatchCategory::OptionBellwether | DispatchCategory::OptionOption => {
            let inputs = OptionPairInputs {
                underlying_history_a: histories.get(&node_a).cloned().unwrap_or_default(),
                underlying_history_b: histories.get(&node_b).cloned().unwrap_or_default(),
                cross_underlying: matches!(category, DispatchCategory::OptionBellwether),
                ..Default::default()
            };
            dispatch::derive_option_channels(&inputs)
        }
    };

    let roll: f64 = rand::thread_rng().gen_range(0.0..1.0);
    let channels = if roll < dispatch::adjudication_probability(category) {
        let context = format!("category={category:?}");
        match dispatch::adjudicate(adapter, &node_a, &node_b, &context).await {
            Some(adjudicated) => adjudicated,
            None => heuristic,
        }
    } else {
        heuristic
    };

    let edge_id = store.ensure_edge_id(&node_a, &node_b).await?;
    store.replace_edge_channels(edge_id, &channels, SCORE_TOUCH_DELTA).await?;
    store
        .log_event(
            "dream",
            "assess",
            &format!("{node_a}<->{node_b} category={category:?} channels={}", channels.len()),
        )
        .await?;
    Ok(())
}

/// Pulls the latest snapshot's `prices_json` and returns each symbol's close history,
/// the only per-symbol series the Market worker persists.
async fn latest_histories(store: &Store) -> Result<HashMap<String, Vec<f64>>> {
    let Some(snapshot) = store.latest_snapshot().await? else {
        return Ok(HashMap::new());
    };
    let prices: HashMap<String, Quote> = serde_json::from_str(&snapshot.prices_json).unwrap_or_default();
    Ok(prices.into_iter().map(|(sym, q)| (sym, q.history)).collect())
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
    async fn skips_cleanly_when_no_bellwethers_or_investibles_exist() {
        let store = Store::open_in_memory().unwrap();
        store.init_db(1000.0).await.unwrap();
        let cfg = Config::from_env().unwrap();
        let adapter = LlmAdapter::new(Box::new(SilentProvider), LlmBudget::new(8), 0);
        // No bootstrap run, so active_investibles()/active_bellwethers() are empty —
        // pick_pair returns None and step_once must not error.
        step_once(&store, &cfg, &adapter).await.unwrap();
    }

    #[tokio::test]
    async fn assesses_and_persists_an_edge_when_nodes_exist() {
        let store = Store::open_in_memory().unwrap();
        store.init_db(1000.0).await.unwrap();
        let mut cfg = Config::from_env().unwrap();
        cfg.investibles = vec!["AAPL".to_string()];
        cfg.bellwethers = vec!["SPY".to_string()];
        store.bootstrap_if_empty(&cfg.investibles, &cfg.bellwethers).await.unwrap();

        let mut prices = HashMap::new();
        let hist_a: Vec<f64> = (0..25).map(|i| 100.0 + i as f64).collect();
        let hist_b: Vec<f64> = (0..25).map(|i| 50.0 + i as f64 * 0.4).collect();
        prices.insert("AAPL".to_string(), Quote { current: *hist_a.last().unwrap(), previous: 0.0, change_pct: 0.0, history: hist_a, volume: 0 });
        prices.insert("SPY".to_string(), Quote { current: *hist_b.last().unwrap(), previous: 0.0, change_pct: 0.0, history: hist_b, volume: 0 });
        let prices_json = serde_json::to_string(&prices).unwrap();
        store.insert_snapshot("t0", &prices_json, "{}", "{}", "{}").await.unwrap();

        let adapter = LlmAdapter::new(Box::new(SilentProvider), LlmBudget::new(8), 0);
        step_once(&store, &cfg, &adapter).await.unwrap();

        let edge = store.get_edge_between("AAPL", "SPY").await.unwrap();
        assert!(edge.is_some());
    }
}
