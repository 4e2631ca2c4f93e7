use super::Store;
use anyhow::Result;
use rusqlite::params;
use std::collections::HashMap;

#[derive(Debug, Clone, serde::Serialize)]
pub struct PositionView {
    pub symbol: String,
    pub qty: f64,
    pub avg_cost: f64,
    pub last_price: f64,
    pub market_value: f64,
    pub unrealized_pnl: f64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct PortfolioState {
    pub cash: f64,
    pub equity: f64,
    pub positions: Vec<PositionView>,
}

impl Store {
    pub async fn kv_get(&self, k: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().await;
        Ok(conn
            .query_row("SELECT v FROM meta WHERE k = ?1", params![k], |r| r.get(0))
            .ok())
    }

    pub async fn kv_set(&self, k: &str, v: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO meta (k, v) VALUES (?1, ?2) \
             ON CONFLICT(k) DO UPDATE SET v = excluded.v",
            params![k, v],
        )?;
        Ok(())
    }

    pub async fn get_cash(&self) -> Result<f64> {
        let conn = self.conn.lock().await;
        let v: Option<String> = conn
            .query_row("SELECT v FROM portfolio WHERE k = 'cash'", [], |r| r.get(0))
            .ok();
        Ok(v.and_then(|s| s.parse::<f64>().ok()).unwrap_or(0.0))
    }

    pub async fn set_cash(&self, cash: f64) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO portfolio (k, v) VALUES ('cash', ?1) \
             ON CONFLICT(k) DO UPDATE SET v = excluded.v",
            params![cash.to_string()],
        )?;
        Ok(())
    }

    /// Mark-to-market using `prices` where present, falling back to the position's
    /// stored `last_price`. `equity` is always derived here, never persisted as truth.
    pub async fn portfolio_state(&self, prices: Option<&HashMap<String, f64>>) -> Result<PortfolioState> {
        let cash = self.get_cash().await?;
        let positions = self.all_positions().await?;
        let mut views = Vec::with_capacity(positions.len());
        let mut total_mv = 0.0f64;
        for p in positions {
            let last_price = prices
                .and_then(|m| m.get(&p.symbol).copied())
                .unwrap_or(p.last_price);
            let mv = p.qty * last_price;
            total_mv += mv;
            views.push(PositionView {
                symbol: p.symbol,
                qty: p.qty,
                avg_cost: p.avg_cost,
                last_price,
                market_value: mv,
                unrealized_pnl: (last_price - p.avg_cost) * p.qty,
            });
        }
        Ok(PortfolioState {
            cash,
            equity: cash + total_mv,
            positions: views,
        })
    }
}
