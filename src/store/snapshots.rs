use super::Store;
use anyhow::Result;
use rusqlite::params;
use std::collections::HashMap;

pub const SNAPSHOT_TAIL_WINDOW: i64 = 1500;

#[derive(Debug, Clone, serde::Serialize)]
pub struct Snapshot {
    pub snapshot_id: i64,
    pub ts: String,
    pub prices_json: String,
    pub bells_json: String,
    pub indicators_json: String,
    pub signals_json: String,
}

impl Store {
    /// Inserts one snapshot and trims the tail within the same transaction — the
    /// trim predicate is a single statement comparing against a subquery computed
    /// in the same transaction, so the max-then-delete race cannot straddle two
    /// separate commits here.
    pub async fn insert_snapshot(
        &self,
        ts: &str,
        prices_json: &str,
        bells_json: &str,
        indicators_json: &str,
        signals_json: &str,
    ) -> Result<i64> {
        let conn = self.conn.lock().await;
        let tx = conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO snapshots (ts, prices_json, bells_json, indicators_json, signals_json) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![ts, prices_json, bells_json, indicators_json, signals_json],
        )?;
        let snapshot_id = tx.last_insert_rowid();
        tx.execute(
            "DELETE FROM snapshots WHERE snapshot_id < (SELECT MAX(snapshot_id) - ?1 FROM snapshots)",
            params![SNAPSHOT_TAIL_WINDOW],
        )?;
        tx.commit()?;
        Ok(snapshot_id)
    }

    /// The Market worker's single atomic tick: mark-to-market positions,
    /// insert one snapshot + trim, append per-symbol
    /// ticker-lookup rows, and log a `market/tick` event — all in one transaction.
    #[allow(clippy::too_many_arguments)]
    pub async fn apply_market_tick(
        &self,
        ts: &str,
        prices_json: &str,
        bells_json: &str,
        indicators_json: &str,
        signals_json: &str,
        mark_prices: &HashMap<String, f64>,
        lookups: &[(String, bool, Option<f64>, Option<f64>, Option<i64>)],
        have_count: usize,
        universe_count: usize,
    ) -> Result<i64> {
        let conn = self.conn.lock().await;
        let tx = conn.unchecked_transaction()?;

        Store::mark_to_market_tx(&tx, mark_prices, ts)?;

        tx.execute(
            "INSERT INTO snapshots (ts, prices_json, bells_json, indicators_json, signals_json) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![ts, prices_json, bells_json, indicators_json, signals_json],
        )?;
        let snapshot_id = tx.last_insert_rowid();
        tx.execute(
            "DELETE FROM snapshots WHERE snapshot_id < (SELECT MAX(snapshot_id) - ?1 FROM snapshots)",
            params![SNAPSHOT_TAIL_WINDOW],
        )?;

        for (ticker, success, price, change_pct, volume) in lookups {
            tx.execute(
                "INSERT INTO ticker_lookups (ts, ticker, success, price, change_pct, volume) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![ts, ticker, *success as i64, price, change_pct, volume],
            )?;
        }

        Store::log_event_tx(
            &tx,
            "market",
            "tick",
            &format!("snapshot_id={snapshot_id} have={have_count}/{universe_count}"),
            ts,
        )?;

        tx.commit()?;
        Ok(snapshot_id)
    }

    pub async fn latest_snapshot(&self) -> Result<Option<Snapshot>> {
        let conn = self.conn.lock().await;
        let row = conn.query_row(
            "SELECT snapshot_id, ts, prices_json, bells_json, indicators_json, signals_json \
             FROM snapshots ORDER BY snapshot_id DESC LIMIT 1",
            [],
            |row| {
                Ok(Snapshot {
                    snapshot_id: row.get(0)?,
                    ts: row.get(1)?,
                    prices_json: row.get(2)?,
                    bells_json: row.get(3)?,
                    indicators_json: row.get(4)?,
                    signals_json: row.get(5)?,
                })
            },
        );
        Ok(row.ok())
    }

    pub async fn snapshot_count(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        Ok(conn.query_row("SELECT COUNT(*) FROM snapshots", [], |r| r.get(0))?)
    }

    pub async fn insert_ticker_lookup(
        &self,
        ts: &str,
        ticker: &str,
        success: bool,
        price: Option<f64>,
        change_pct: Option<f64>,
        volume: Option<i64>,
    ) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO ticker_lookups (ts, ticker, success, price, change_pct, volume) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![ts, ticker, success as i64, price, change_pct, volume],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn trim_keeps_tail_within_window() {
        let store = Store::open_in_memory().unwrap();
        store.init_db(1000.0).await.unwrap();
        for i in 0..(SNAPSHOT_TAIL_WINDOW + 50) {
            store
                .insert_snapshot(&format!("t{i}"), "{}", "{}", "{}", "{}")
                .await
                .unwrap();
        }
        let count = store.snapshot_count().await.unwrap();
        assert!(count <= SNAPSHOT_TAIL_WINDOW + 1);
    }
}
