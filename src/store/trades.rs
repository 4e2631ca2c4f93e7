use super::Store;
use anyhow::Result;
use rusqlite::params;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl Store {
    pub async fn insert_trade(
        &self,
        ts: &str,
        symbol: &str,
        side: Side,
        qty: f64,
        price: f64,
        reason: &str,
        insight_id: Option<i64>,
    ) -> Result<i64> {
        let notional = qty * price;
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO trades (ts, symbol, side, qty, price, notional, reason, insight_id) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![ts, symbol, side.as_str(), qty, price, notional, reason, insight_id],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Raw `(symbol, side, qty)` rows since (and including) `since_ts`, oldest first —
    /// used by the reconciliation utility to recompute expected quantities from the
    /// ledger rather than trusting the `positions` table.
    pub async fn trades_since(&self, since_ts: &str) -> Result<Vec<(String, Side, f64)>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare_cached(
            "SELECT symbol, side, qty FROM trades WHERE ts >= ?1 ORDER BY trade_id ASC",
        )?;
        let rows = stmt.query_map(params![since_ts], |row| {
            let symbol: String = row.get(0)?;
            let side_str: String = row.get(1)?;
            let qty: f64 = row.get(2)?;
            let side = if side_str == "SELL" { Side::Sell } else { Side::Buy };
            Ok((symbol, side, qty))
        })?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    /// Reverse-chronological summary capped at `limit`, formatted
    /// `"{ts}: {side} {symbol} notional={notional:.2f}"` one per line, oldest-first
    /// within the window (matches the prototype's fetch-then-re-reverse order).
    pub async fn recent_trade_summary(&self, limit: i64) -> Result<String> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare_cached(
            "SELECT ts, side, symbol, notional FROM trades ORDER BY trade_id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            let ts: String = row.get(0)?;
            let side: String = row.get(1)?;
            let symbol: String = row.get(2)?;
            let notional: f64 = row.get(3)?;
            Ok(format!("{ts}: {side} {symbol} notional={notional:.2}"))
        })?;
        let mut lines: Vec<String> = Vec::new();
        for r in rows {
            lines.push(r?);
        }
        if lines.is_empty() {
            return Ok("No recent trades.".to_string());
        }
        lines.reverse();
        Ok(lines.join("\n"))
    }
}
