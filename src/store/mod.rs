//! Persistent store: a single SQLite connection behind a reentrant write lock,
//! WAL journaling, and one writer. All durable state lives here; workers hold no
//! long-lived references to rows, only a handle to this `Store`.

pub mod edges;
pub mod events;
pub mod insights;
pub mod nodes;
pub mod portfolio;
pub mod positions;
pub mod schema;
pub mod snapshots;
pub mod trades;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::sync::Arc;
use tokio::sync::Mutex;

/// `tokio::sync::Mutex` gives every writer a fair, cooperatively-scheduled queue —
/// a process-wide reentrant write lock, without blocking the executor thread while
/// a write is queued.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    pub fn open(db_path: &str) -> Result<Self> {
        if let Some(parent) = std::path::Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).ok();
            }
        }
        let conn = Connection::open(db_path).context("open store db")?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .context("set WAL journal mode")?;
        conn.pragma_update(None, "synchronous", "NORMAL").ok();
        conn.pragma_update(None, "busy_timeout", 8000i64).ok();
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory store db")?;
        conn.pragma_update(None, "synchronous", "NORMAL").ok();
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Creates all tables idempotently and seeds `cash = START_CASH` if absent.
    pub async fn init_db(&self, start_cash: f64) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute_batch(schema::CREATE_TABLES_SQL)
            .context("create tables")?;
        let existing: Option<String> = conn
            .query_row(
                "SELECT v FROM portfolio WHERE k = 'cash'",
                [],
                |row| row.get(0),
            )
            .ok();
        if existing.is_none() {
            conn.execute(
                "INSERT INTO portfolio (k, v) VALUES ('cash', ?1)",
                [start_cash.to_string()],
            )?;
        }
        Ok(())
    }

    /// Seeds nodes/edges only when the node table is empty. A no-op after the first
    /// successful run (idempotence guaranteed by the `node count > 0` guard).
    pub async fn bootstrap_if_empty(&self, investibles: &[String], bellwethers: &[String]) -> Result<()> {
        let count: i64 = {
            let conn = self.conn.lock().await;
            conn.query_row("SELECT COUNT(*) FROM nodes", [], |row| row.get(0))?
        };
        if count > 0 {
            return Ok(());
        }

        let now = crate::clock::utc_now_iso();
        let conn = self.conn.lock().await;
        let tx = conn.unchecked_transaction()?;

        for sym in investibles {
            tx.execute(
                "INSERT OR IGNORE INTO nodes (node_id, kind, label, description, created_at) \
                 VALUES (?1, 'investible', ?1, '', ?2)",
                rusqlite::params![sym, now],
            )?;
        }
        for sym in bellwethers {
            tx.execute(
                "INSERT OR IGNORE INTO nodes (node_id, kind, label, description, created_at) \
                 VALUES (?1, 'bellwether', ?1, '', ?2)",
                rusqlite::params![sym, now],
            )?;
        }
        for (node_id, kind, label, desc) in schema::DERIVED {
            tx.execute(
                "INSERT OR IGNORE INTO nodes (node_id, kind, label, description, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![node_id, kind, label, desc, now],
            )?;
        }
        for (node_id, kind, label, desc) in schema::AGENTS {
            tx.execute(
                "INSERT OR IGNORE INTO nodes (node_id, kind, label, description, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![node_id, kind, label, desc, now],
            )?;
        }

        for (a, b, channels) in schema::BOOT_EDGES {
            let (node_a, node_b) = edges::norm_pair(a, b);
            tx.execute(
                "INSERT OR IGNORE INTO edges (node_a, node_b, created_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![node_a, node_b, now],
            )?;
            let edge_id: i64 = tx.query_row(
                "SELECT edge_id FROM edges WHERE node_a = ?1 AND node_b = ?2",
                rusqlite::params![node_a, node_b],
                |row| row.get(0),
            )?;
            tx.execute(
                "DELETE FROM edge_channels WHERE edge_id = ?1",
                [edge_id],
            )?;
            let mut weight = 0.0f64;
            let mut best: (f64, Option<&str>) = (0.0, None);
            for (channel, strength) in *channels {
                tx.execute(
                    "INSERT INTO edge_channels (edge_id, channel, strength) VALUES (?1, ?2, ?3)",
                    rusqlite::params![edge_id, channel, strength],
                )?;
                let base = channel.split(':').next().unwrap_or(channel);
                weight += schema::channel_base_weight(base) * strength;
                if *strength > best.0 {
                    best = (*strength, Some(channel));
                }
            }
            tx.execute(
                "UPDATE edges SET weight = ?1, top_channel = ?2, last_assessed = ?3 WHERE edge_id = ?4",
                rusqlite::params![weight, best.1, now, edge_id],
            )?;
        }

        tx.execute(
            "UPDATE nodes SET degree = (\
                SELECT COUNT(*) FROM edges WHERE edges.node_a = nodes.node_id OR edges.node_b = nodes.node_id\
             )",
            [],
        )?;

        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bootstrap_is_idempotent_and_seeds_expected_counts() {
        let store = Store::open_in_memory().unwrap();
        store.init_db(10_000.0).await.unwrap();
        let investibles: Vec<String> = crate::config::DEFAULT_INVESTIBLES
            .iter()
            .map(|s| s.to_string())
            .collect();
        let bellwethers: Vec<String> = crate::config::DEFAULT_BELLWETHERS
            .iter()
            .map(|s| s.to_string())
            .collect();
        store
            .bootstrap_if_empty(&investibles, &bellwethers)
            .await
            .unwrap();

        let conn = store.conn.lock().await;
        let node_count: i64 = conn.query_row("SELECT COUNT(*) FROM nodes", [], |r| r.get(0)).unwrap();
        assert_eq!(
            node_count as usize,
            investibles.len() + bellwethers.len() + schema::DERIVED.len() + schema::AGENTS.len()
        );
        let edge_count: i64 = conn.query_row("SELECT COUNT(*) FROM edges", [], |r| r.get(0)).unwrap();
        assert_eq!(edge_count as usize, schema::BOOT_EDGES.len());
        drop(conn);

        // Second bootstrap call must be a no-op.
        store
            .bootstrap_if_empty(&investibles, &bellwethers)
            .await
            .unwrap();
        let conn = store.conn.lock().await;
        let node_count_2: i64 = conn.query_row("SELECT COUNT(*) FROM nodes", [], |r| r.get(0)).unwrap();
        assert_eq!(node_count, node_count_2);
    }
}
