use super::Store;
use anyhow::Result;
use rusqlite::params;
use std::collections::HashMap;

#[derive(Debug, Clone, serde::Serialize)]
pub struct Position {
    pub symbol: String,
    pub qty: f64,
    pub avg_cost: f64,
    pub last_price: f64,
    pub updated_at: Option<String>,
    pub executed_at: Option<String>,
}

const QTY_EPSILON: f64 = 1e-8;

impl Store {
    pub async fn get_position(&self, symbol: &str) -> Result<Option<Position>> {
        let conn = self.conn.lock().await;
        let row = conn.query_row(
            "SELECT symbol, qty, avg_cost, last_price, updated_at, executed_at \
             FROM positions WHERE symbol = ?1",
            params![symbol],
            |row| {
                Ok(Position {
                    symbol: row.get(0)?,
                    qty: row.get(1)?,
                    avg_cost: row.get(2)?,
                    last_price: row.get(3)?,
                    updated_at: row.get(4)?,
                    executed_at: row.get(5)?,
                })
            },
        );
        Ok(row.ok())
    }

    pub async fn all_positions(&self) -> Result<Vec<Position>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare_cached(
            "SELECT symbol, qty, avg_cost, last_price, updated_at, executed_at FROM positions",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Position {
                symbol: row.get(0)?,
                qty: row.get(1)?,
                avg_cost: row.get(2)?,
                last_price: row.get(3)?,
                updated_at: row.get(4)?,
                executed_at: row.get(5)?,
            })
        })?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    pub async fn positions_as_map(&self) -> Result<HashMap<String, Position>> {
        Ok(self
            .all_positions()
            .await?
            .into_iter()
            .map(|p| (p.symbol.clone(), p))
            .collect())
    }

    /// `new_avg = (avg*have + price*shares) / new_qty`; `executed_at` preserved if the
    /// position already existed, else set to `now`.
    pub async fn apply_buy(&self, symbol: &str, shares: f64, price: f64, now: &str) -> Result<f64> {
        let conn = self.conn.lock().await;
        let existing: Option<(f64, f64, Option<String>)> = conn
            .query_row(
                "SELECT qty, avg_cost, executed_at FROM positions WHERE symbol = ?1",
                params![symbol],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .ok();

        let (have, avg, executed_at) = existing.unwrap_or((0.0, 0.0, None));
        let new_qty = have + shares;
        let new_avg = if new_qty > QTY_EPSILON {
            (avg * have + price * shares) / new_qty
        } else {
            avg
        };
        let executed_at = executed_at.unwrap_or_else(|| now.to_string());

        conn.execute(
            "INSERT INTO positions (symbol, qty, avg_cost, last_price, updated_at, executed_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
             ON CONFLICT(symbol) DO UPDATE SET \
                qty = excluded.qty, avg_cost = excluded.avg_cost, \
                last_price = excluded.last_price, updated_at = excluded.updated_at, \
                executed_at = excluded.executed_at",
            params![symbol, new_qty, new_avg, price, now, executed_at],
        )?;
        Ok(new_avg)
    }

    /// `avg_cost`/`executed_at` are never touched by a SELL. Deletes the row once
    /// residual qty drops to or below epsilon.
    pub async fn apply_sell(&self, symbol: &str, shares: f64, price: f64, now: &str) -> Result<f64> {
        let conn = self.conn.lock().await;
        let (have, _avg): (f64, f64) = conn.query_row(
            "SELECT qty, avg_cost FROM positions WHERE symbol = ?1",
            params![symbol],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let remaining = have - shares;
        if remaining <= QTY_EPSILON {
            conn.execute("DELETE FROM positions WHERE symbol = ?1", params![symbol])?;
        } else {
            conn.execute(
                "UPDATE positions SET qty = ?1, last_price = ?2, updated_at = ?3 WHERE symbol = ?4",
                params![remaining, price, now, symbol],
            )?;
        }
        Ok(remaining.max(0.0))
    }

    /// Overwrites a position wholesale from broker-reported state (qty/avg_cost/
    /// last_price), used by the Alpaca backend's pre-cycle sync where the broker is
    /// the source of truth. Does not touch `executed_at`.
    pub async fn upsert_broker_position(
        &self,
        symbol: &str,
        qty: f64,
        avg_cost: f64,
        last_price: f64,
        now: &str,
    ) -> Result<()> {
        let conn = self.conn.lock().await;
        if qty.abs() <= QTY_EPSILON {
            conn.execute("DELETE FROM positions WHERE symbol = ?1", params![symbol])?;
            return Ok(());
        }
        conn.execute(
            "INSERT INTO positions (symbol, qty, avg_cost, last_price, updated_at, executed_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?5) \
             ON CONFLICT(symbol) DO UPDATE SET \
                qty = excluded.qty, avg_cost = excluded.avg_cost, \
                last_price = excluded.last_price, updated_at = excluded.updated_at",
            params![symbol, qty, avg_cost, last_price, now],
        )?;
        Ok(())
    }

    /// Marks positions to market for any symbol present in `prices` — used by the
    /// Market worker's snapshot transaction.
    pub fn mark_to_market_tx(
        tx: &rusqlite::Transaction<'_>,
        prices: &HashMap<String, f64>,
        now: &str,
    ) -> Result<()> {
        for (symbol, price) in prices {
            tx.execute(
                "UPDATE positions SET last_price = ?1, updated_at = ?2 WHERE symbol = ?3",
                params![price, now, symbol],
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn buy_then_buy_computes_size_weighted_average_and_preserves_executed_at() {
        let store = Store::open_in_memory().unwrap();
        store.init_db(1000.0).await.unwrap();
        store.apply_buy("AAPL", 10.0, 100.0, "t0").await.unwrap();
        let pos1 = store.get_position("AAPL").await.unwrap().unwrap();
        assert_eq!(pos1.executed_at.as_deref(), Some("t0"));

        let new_avg = store.apply_buy("AAPL", 10.0, 120.0, "t1").await.unwrap();
        assert!((new_avg - 110.0).abs() < 1e-9);
        let pos2 = store.get_position("AAPL").await.unwrap().unwrap();
        assert_eq!(pos2.executed_at.as_deref(), Some("t0"), "executed_at must not advance on a later BUY");
    }

    #[tokio::test]
    async fn sell_preserves_avg_cost_and_deletes_on_exhaustion() {
        let store = Store::open_in_memory().unwrap();
        store.init_db(1000.0).await.unwrap();
        store.apply_buy("AAPL", 10.0, 100.0, "t0").await.unwrap();
        store.apply_sell("AAPL", 4.0, 150.0, "t1").await.unwrap();
        let pos = store.get_position("AAPL").await.unwrap().unwrap();
        assert!((pos.avg_cost - 100.0).abs() < 1e-9);
        assert!((pos.qty - 6.0).abs() < 1e-9);

        store.apply_sell("AAPL", 6.0, 150.0, "t2").await.unwrap();
        assert!(store.get_position("AAPL").await.unwrap().is_none());
    }
}
