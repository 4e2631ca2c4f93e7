pub mod alpaca;
pub mod guardrails;
pub mod paper;
pub mod reconcile;

use crate::committee::schema::Decision;
use crate::config::{BrokerProvider, Config};
use crate::market::Quote;
use crate::store::trades::Side;
use crate::store::Store;
use anyhow::Result;
use std::collections::HashMap;

#[derive(Debug, Clone, serde::Serialize)]
pub struct ExecutedTrade {
    pub symbol: String,
    pub side: Side,
    pub shares: f64,
    pub price: f64,
    pub notional: f64,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ExecutionResult {
    pub executed: Vec<ExecutedTrade>,
    pub skipped: Vec<(String, String)>,
    pub cash: f64,
}

/// Routes to the configured broker. Both backends enforce identical guard rails
/// (see `guardrails::plan_trades`); only the broker-backed path syncs positions
/// first and submits live orders.
pub async fn execute_trades(
    store: &Store,
    cfg: &Config,
    decisions: &[Decision],
    prices: &HashMap<String, Quote>,
    reason: &str,
    insight_id: i64,
) -> Result<ExecutionResult> {
    match cfg.broker_provider {
        BrokerProvider::Paper => paper::execute_paper_trades(store, cfg, decisions, prices, reason, insight_id).await,
        BrokerProvider::Alpaca => {
            let key_id = cfg.alpaca_key_id.clone().unwrap_or_default();
            let secret = cfg.alpaca_secret_key.clone().unwrap_or_default();
            let broker = alpaca::AlpacaBroker::new(cfg.alpaca_base_url.clone(), key_id, secret);
            broker.execute(store, cfg, decisions, prices, reason, insight_id).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::committee::schema::Action;

    #[tokio::test]
    async fn paper_guardrail_cap_executes_and_debits_cash() {
        let store = Store::open_in_memory().unwrap();
        store.init_db(1000.0).await.unwrap();
        let mut cfg = Config::from_env().unwrap();
        cfg.broker_provider = BrokerProvider::Paper;
        cfg.min_trade_notional = 10.0;

        let decisions = vec![Decision {
            ticker: "AAPL".to_string(),
            action: Action::Buy,
            allocation_pct: 10.0,
            note: String::new(),
        }];
        let mut prices = HashMap::new();
        prices.insert(
            "AAPL".to_string(),
            Quote { current: 100.0, previous: 100.0, change_pct: 0.0, history: vec![], volume: 0 },
        );

        let result = execute_trades(&store, &cfg, &decisions, &prices, "test", 1).await.unwrap();
        assert_eq!(result.executed.len(), 1);
        assert!(result.cash < 1000.0);
    }
}
