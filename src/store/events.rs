use super::Store;
use anyhow::Result;
use rusqlite::params;

const DETAIL_MAX_LEN: usize = 1600;

impl Store {
    pub async fn log_event(&self, actor: &str, action: &str, detail: &str) -> Result<()> {
        let ts = crate::clock::utc_now_iso();
        let truncated: String = detail.chars().take(DETAIL_MAX_LEN).collect();
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO dream_log (ts, actor, action, detail) VALUES (?1, ?2, ?3, ?4)",
            params![ts, actor, action, truncated],
        )?;
        Ok(())
    }

    /// Same truncation/insert, usable from inside a transaction already holding the
    /// connection lock (e.g. the Market worker's single-transaction tick).
    pub fn log_event_tx(tx: &rusqlite::Transaction<'_>, actor: &str, action: &str, detail: &str, ts: &str) -> Result<()> {
        let truncated: String = detail.chars().take(DETAIL_MAX_LEN).collect();
        tx.execute(
            "INSERT INTO dream_log (ts, actor, action, detail) VALUES (?1, ?2, ?3, ?4)",
            params![ts, actor, action, truncated],
        )?;
        Ok(())
    }
}
