//! Paper broker: applies a guard-rail plan directly against the local store, no
//! network round trip.

use super::guardrails::{plan_trades, GuardrailPlan};
use super::{ExecutionResult, ExecutedTrade};
use crate::committee::schema::Decision;
use crate::config::Config;
use crate::market::Quote;
use crate::store::trades::Side;
use crate::store::Store;
use anyhow::Result;
use std::collections::HashMap;

pub async fn execute_paper_trades(
    store: &Store,
    cfg: &Config,
    decisions: &[Decision],
    prices: &HashMap<String, Quote>,
    reason: &str,
    insight_id: i64,
) -> Result<ExecutionResult> {
    let cash = store.get_cash().await?;
    let positions = store.positions_as_map().await?;
    let plan: GuardrailPlan = plan_trades(cfg, decisions, prices, &positions, cash);
    let now = crate::clock::utc_now_iso();

    let mut executed = Vec::new();

    for sell in &plan.sells {
        store.apply_sell(&sell.symbol, sell.shares, sell.price, &now).await?;
        store
            .insert_trade(&now, &sell.symbol, Side::Sell, sell.shares, sell.price, reason, Some(insight_id))
            .await?;
        executed.push(ExecutedTrade {
            symbol: sell.symbol.clone(),
            side: Side::Sell,
            shares: sell.shares,
            price: sell.price,
            notional: sell.notional,
        });
    }

    for buy in &plan.buys {
        store.apply_buy(&buy.symbol, buy.shares, buy.price, &now).await?;
        store
            .insert_trade(&now, &buy.symbol, Side::Buy, buy.shares, buy.price, reason, Some(insight_id))
            .await?;
        executed.push(ExecutedTrade {
            symbol: buy.symbol.clone(),
            side: Side::Buy,
            shares: buy.shares,
            price: buy.price,
            notional: buy.notional,
        });
    }

    store.set_cash(plan.final_cash).await?;

    Ok(ExecutionResult { executed, skipped: plan.skipped, cash: plan.final_cash })
}
