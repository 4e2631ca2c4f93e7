//! Offline reconciliation: recompute each symbol's expected quantity from the local
//! trade ledger since a date, diff against broker-reported positions, and synthesize
//! the delta orders that would bring the broker back in line. Never mutates the
//! `positions` table directly — this only proposes orders for an operator (or the
//! `reconcile` binary) to submit.

use super::alpaca::AlpacaBroker;
use crate::store::trades::Side;
use crate::store::Store;
use anyhow::Result;
use std::collections::HashMap;

const QTY_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileAction {
    pub symbol: String,
    pub side: Side,
    pub qty: f64,
    pub expected_qty: f64,
    pub broker_qty: f64,
}

/// `expected_qty` is the running sum of signed trade quantities since `since_ts`
/// (BUY adds, SELL subtracts), not the `positions` table — catching any drift a bug
/// elsewhere may have introduced into the maintained row.
pub async fn expected_quantities(store: &Store, since_ts: &str) -> Result<HashMap<String, f64>> {
    let trades = store.trades_since(since_ts).await?;
    let mut expected: HashMap<String, f64> = HashMap::new();
    for (symbol, side, qty) in trades {
        let signed = match side {
            Side::Buy => qty,
            Side::Sell => -qty,
        };
        *expected.entry(symbol).or_insert(0.0) += signed;
    }
    Ok(expected)
}

pub async fn plan_reconciliation(
    store: &Store,
    broker: &AlpacaBroker,
    since_ts: &str,
) -> Result<Vec<ReconcileAction>> {
    let expected = expected_quantities(store, since_ts).await?;
    let broker_positions = broker.fetch_positions().await?;

    let mut symbols: Vec<&String> = expected.keys().chain(broker_positions.keys()).collect();
    symbols.sort();
    symbols.dedup();

    let mut actions = Vec::new();
    for symbol in symbols {
        let expected_qty = expected.get(symbol).copied().unwrap_or(0.0);
        let broker_qty = broker_positions.get(symbol).copied().unwrap_or(0.0);
        let delta = expected_qty - broker_qty;
        if delta.abs() <= QTY_EPSILON {
            continue;
        }
        let side = if delta > 0.0 { Side::Buy } else { Side::Sell };
        actions.push(ReconcileAction {
            symbol: symbol.clone(),
            side,
            qty: delta.abs(),
            expected_qty,
            broker_qty,
        });
    }
    Ok(actions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::trades::Side as TSide;

    #[tokio::test]
    async fn expected_quantities_sum_signed_trades() {
        let store = Store::open_in_memory().unwrap();
        store.init_db(1000.0).await.unwrap();
        store.insert_trade("t0", "AAPL", TSide::Buy, 10.0, 100.0, "r", None).await.unwrap();
        store.insert_trade("t1", "AAPL", TSide::Sell, 4.0, 110.0, "r", None).await.unwrap();
        let expected = expected_quantities(&store, "t0").await.unwrap();
        assert!((expected["AAPL"] - 6.0).abs() < 1e-9);
    }
}
