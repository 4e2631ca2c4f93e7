//! Alpaca-routed broker: same guard rails as paper, but positions are synced from
//! the broker before planning (broker is the source of truth) and every slice is
//! submitted as a market DAY order. A submit failure skips that slice without
//! mutating local state for it.

use super::guardrails::{plan_trades, GuardrailPlan, PlannedTrade};
use super::{ExecutedTrade, ExecutionResult};
use crate::committee::schema::Decision;
use crate::config::Config;
use crate::market::Quote;
use crate::store::trades::Side;
use crate::store::Store;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

pub struct AlpacaBroker {
    http: reqwest::Client,
    base_url: String,
    key_id: String,
    secret_key: String,
}

impl AlpacaBroker {
    pub fn new(base_url: String, key_id: String, secret_key: String) -> Self {
        Self { http: reqwest::Client::new(), base_url, key_id, secret_key }
    }

    /// Pulls current broker positions and overwrites the local table — the broker
    /// is the source of truth before a trading cycle runs.
    pub async fn sync_positions(&self, store: &Store) -> Result<()> {
        let resp = self
            .http
            .get(format!("{}/v2/positions", self.base_url))
            .header("APCA-API-KEY-ID", &self.key_id)
            .header("APCA-API-SECRET-KEY", &self.secret_key)
            .timeout(Duration::from_secs(10))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Ok(());
        }
        let positions: Vec<AlpacaPosition> = resp.json().await.unwrap_or_default();
        let now = crate::clock::utc_now_iso();
        for p in positions {
            let qty: f64 = p.qty.parse().unwrap_or(0.0);
            let avg: f64 = p.avg_entry_price.parse().unwrap_or(0.0);
            let last: f64 = p.current_price.parse().unwrap_or(avg);
            store.upsert_broker_position(&p.symbol, qty, avg, last, &now).await?;
        }
        Ok(())
    }

    /// Raw broker-reported quantities, keyed by symbol. Used both by `sync_positions`
    /// and by the offline reconciliation utility.
    pub async fn fetch_positions(&self) -> Result<HashMap<String, f64>> {
        let resp = self
            .http
            .get(format!("{}/v2/positions", self.base_url))
            .header("APCA-API-KEY-ID", &self.key_id)
            .header("APCA-API-SECRET-KEY", &self.secret_key)
            .timeout(Duration::from_secs(10))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Ok(HashMap::new());
        }
        let positions: Vec<AlpacaPosition> = resp.json().await.unwrap_or_default();
        Ok(positions
            .into_iter()
            .map(|p| (p.symbol, p.qty.parse().unwrap_or(0.0)))
            .collect())
    }

    pub async fn submit_order(&self, symbol: &str, side: Side, qty: f64) -> Result<String> {
        let req = OrderRequest {
            symbol: symbol.to_string(),
            qty: format!("{qty:.6}"),
            side: side.as_str().to_ascii_lowercase(),
            order_type: "market".to_string(),
            time_in_force: "day".to_string(),
        };
        let resp = self
            .http
            .post(format!("{}/v2/orders", self.base_url))
            .header("APCA-API-KEY-ID", &self.key_id)
            .header("APCA-API-SECRET-KEY", &self.secret_key)
            .timeout(Duration::from_secs(10))
            .json(&req)
            .send()
            .await?;
        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("alpaca order rejected: {body}");
        }
        let order: OrderResponse = resp.json().await?;
        Ok(order.id)
    }

    async fn submit_plan_slice(
        &self,
        store: &Store,
        side: Side,
        trade: &PlannedTrade,
        base_reason: &str,
        insight_id: i64,
        executed: &mut Vec<ExecutedTrade>,
        skipped: &mut Vec<(String, String)>,
    ) -> Result<()> {
        match self.submit_order(&trade.symbol, side, trade.shares).await {
            Ok(order_id) => {
                let now = crate::clock::utc_now_iso();
                match side {
                    Side::Sell => {
                        store.apply_sell(&trade.symbol, trade.shares, trade.price, &now).await?;
                    }
                    Side::Buy => {
                        store.apply_buy(&trade.symbol, trade.shares, trade.price, &now).await?;
                    }
                }
                let reason = format!("{base_reason} (order={order_id})");
                store
                    .insert_trade(&now, &trade.symbol, side, trade.shares, trade.price, &reason, Some(insight_id))
                    .await?;
                executed.push(ExecutedTrade {
                    symbol: trade.symbol.clone(),
                    side,
                    shares: trade.shares,
                    price: trade.price,
                    notional: trade.notional,
                });
            }
            Err(e) => skipped.push((trade.symbol.clone(), format!("order_submit_failed: {e}"))),
        }
        Ok(())
    }

    pub async fn execute(
        &self,
        store: &Store,
        cfg: &Config,
        decisions: &[Decision],
        prices: &HashMap<String, Quote>,
        reason: &str,
        insight_id: i64,
    ) -> Result<ExecutionResult> {
        self.sync_positions(store).await.ok();

        let cash = store.get_cash().await?;
        let positions = store.positions_as_map().await?;
        let plan: GuardrailPlan = plan_trades(cfg, decisions, prices, &positions, cash);

        let mut executed = Vec::new();
        let mut skipped = plan.skipped.clone();

        for sell in &plan.sells {
            self.submit_plan_slice(store, Side::Sell, sell, reason, insight_id, &mut executed, &mut skipped).await?;
        }
        for buy in &plan.buys {
            self.submit_plan_slice(store, Side::Buy, buy, reason, insight_id, &mut executed, &mut skipped).await?;
        }

        let cash = store.get_cash().await?;
        Ok(ExecutionResult { executed, skipped, cash })
    }
}

#[derive(Deserialize, Default)]
struct AlpacaPosition {
    symbol: String,
    qty: String,
    avg_entry_price: String,
    current_price: String,
}

#[derive(Serialize)]
struct OrderRequest {
    symbol: String,
    qty: String,
    side: String,
    #[serde(rename = "type")]
    order_type: String,
    time_in_force: String,
}

#[derive(Deserialize)]
struct OrderResponse {
    id: String,
}
