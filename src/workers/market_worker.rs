//! Market worker: one tick fetches the primary universe plus the Yahoo-only
//! bellwethers, computes indicators/signals, and commits everything in the single
//! `apply_market_tick` transaction (mark-to-market, snapshot+trim, ticker lookups,
//! event log).

use crate::config::Config;
use crate::market::{compute_indicators, compute_signals, pool::MarketPool, yahoo::YahooProvider, Indicators, Quote, Signals};
use crate::store::Store;
use anyhow::{bail, Result};
use std::collections::HashMap;

pub async fn step_once(store: &Store, cfg: &Config, pool: &MarketPool, yahoo: &YahooProvider) -> Result<()> {
    let universe = cfg.all_tickers();
    let mut prices: HashMap<String, Quote> = pool.fetch_many(&universe).await;

    // Always fetch the Yahoo-only bellwethers through Yahoo regardless of the
    // configured primary provider.
    for sym in &cfg.bellwethers_yf {
        if !prices.contains_key(sym) {
            if let Some(q) = yahoo.fetch_single(sym).await {
                prices.insert(sym.clone(), q);
            }
        }
    }

    if prices.is_empty() {
        bail!("market fetch returned an empty price map");
    }

    let indicators: HashMap<String, Indicators> = cfg
        .investibles
        .iter()
        .filter_map(|sym| prices.get(sym).map(|q| (sym.clone(), compute_indicators(&q.history))))
        .collect();

    let bell_changes: HashMap<String, f64> = cfg
        .bellwethers
        .iter()
        .chain(cfg.bellwethers_yf.iter())
        .filter_map(|sym| prices.get(sym).map(|q| (sym.clone(), q.change_pct)))
        .collect();
    let signals: Signals = compute_signals(&bell_changes);

    let mark_prices: HashMap<String, f64> = prices.iter().map(|(k, v)| (k.clone(), v.current)).collect();
    let lookups: Vec<(String, bool, Option<f64>, Option<f64>, Option<i64>)> = universe
        .iter()
        .map(|sym| match prices.get(sym) {
            Some(q) => (sym.clone(), true, Some(q.current), Some(q.change_pct), Some(q.volume)),
            None => (sym.clone(), false, None, None, None),
        })
        .collect();

    let ts = crate::clock::utc_now_iso();
    let prices_json = serde_json::to_string(&prices)?;
    let bells_json = serde_json::to_string(&bell_changes)?;
    let indicators_json = serde_json::to_string(&indicators)?;
    let signals_json = serde_json::to_string(&signals)?;

    store
        .apply_market_tick(
            &ts,
            &prices_json,
            &bells_json,
            &indicators_json,
            &signals_json,
            &mark_prices,
            &lookups,
            prices.len(),
            universe.len(),
        )
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::{MarketDataProvider, Series};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct FixedProvider;

    #[async_trait]
    impl MarketDataProvider for FixedProvider {
        async fn fetch_series(&self, _symbol: &str, _days: u32) -> Series {
            Series::default()
        }
        async fn fetch_single(&self, symbol: &str) -> Option<Quote> {
            let history: Vec<f64> = (0..25).map(|i| 100.0 + i as f64).collect();
            Some(Quote {
                current: *history.last().unwrap(),
                previous: history[history.len() - 2],
                change_pct: 0.01,
                history,
                volume: 1000,
            })
        }
    }

    #[tokio::test]
    async fn one_tick_writes_a_snapshot() {
        let store = Store::open_in_memory().unwrap();
        store.init_db(1000.0).await.unwrap();
        let mut cfg = Config::from_env().unwrap();
        cfg.investibles = vec!["AAPL".to_string()];
        cfg.bellwethers = vec!["SPY".to_string()];
        cfg.bellwethers_yf = vec![];

        let pool = MarketPool::new(Arc::new(FixedProvider), None, 4);
        let yahoo = YahooProvider::new(5, 60);

        step_once(&store, &cfg, &pool, &yahoo).await.unwrap();
        assert_eq!(store.snapshot_count().await.unwrap(), 1);
    }
}
