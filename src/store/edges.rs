//! Edge CRUD: normalized undirected pairs, atomic channel replacement, degree upkeep.

use super::{schema, Store};
use anyhow::Result;
use rusqlite::params;
use std::collections::HashMap;

#[derive(Debug, Clone, serde::Serialize)]
pub struct Edge {
    pub edge_id: i64,
    pub node_a: String,
    pub node_b: String,
    pub weight: f64,
    pub top_channel: Option<String>,
    pub last_assessed: Option<String>,
    pub assessment_count: i64,
}

/// Lexicographic normalization so an edge is always stored `node_a <= node_b`.
pub fn norm_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// `weight = sum(base_weight(base(channel)) * strength)`; `top_channel` is the channel
/// with the highest raw strength (not weight*strength — matches the source exactly).
pub fn edge_weight_top(channels: &HashMap<String, f64>) -> (f64, Option<String>) {
    let mut weight = 0.0f64;
    let mut best: (f64, Option<String>) = (0.0, None);
    for (channel, strength) in channels {
        let base = channel.split(':').next().unwrap_or(channel);
        weight += schema::channel_base_weight(base) * strength;
        if *strength > best.0 {
            best = (*strength, Some(channel.clone()));
        }
    }
    (weight, best.1)
}

impl Store {
    pub async fn ensure_edge_id(&self, a: &str, b: &str) -> Result<i64> {
        let (node_a, node_b) = norm_pair(a, b);
        let now = crate::clock::utc_now_iso();
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT OR IGNORE INTO edges (node_a, node_b, created_at) VALUES (?1, ?2, ?3)",
            params![node_a, node_b, now],
        )?;
        let edge_id: i64 = conn.query_row(
            "SELECT edge_id FROM edges WHERE node_a = ?1 AND node_b = ?2",
            params![node_a, node_b],
            |row| row.get(0),
        )?;
        Ok(edge_id)
    }

    pub async fn get_edge(&self, edge_id: i64) -> Result<Option<Edge>> {
        let conn = self.conn.lock().await;
        let row = conn.query_row(
            "SELECT edge_id, node_a, node_b, weight, top_channel, last_assessed, assessment_count \
             FROM edges WHERE edge_id = ?1",
            params![edge_id],
            |row| {
                Ok(Edge {
                    edge_id: row.get(0)?,
                    node_a: row.get(1)?,
                    node_b: row.get(2)?,
                    weight: row.get(3)?,
                    top_channel: row.get(4)?,
                    last_assessed: row.get(5)?,
                    assessment_count: row.get(6)?,
                })
            },
        );
        Ok(row.ok())
    }

    pub async fn get_edge_between(&self, a: &str, b: &str) -> Result<Option<Edge>> {
        let (node_a, node_b) = norm_pair(a, b);
        let conn = self.conn.lock().await;
        let row = conn.query_row(
            "SELECT edge_id, node_a, node_b, weight, top_channel, last_assessed, assessment_count \
             FROM edges WHERE node_a = ?1 AND node_b = ?2",
            params![node_a, node_b],
            |row| {
                Ok(Edge {
                    edge_id: row.get(0)?,
                    node_a: row.get(1)?,
                    node_b: row.get(2)?,
                    weight: row.get(3)?,
                    top_channel: row.get(4)?,
                    last_assessed: row.get(5)?,
                    assessment_count: row.get(6)?,
                })
            },
        );
        Ok(row.ok())
    }

    pub async fn edges_of_node(&self, node_id: &str) -> Result<Vec<Edge>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare_cached(
            "SELECT edge_id, node_a, node_b, weight, top_channel, last_assessed, assessment_count \
             FROM edges WHERE node_a = ?1 OR node_b = ?1 ORDER BY weight DESC",
        )?;
        let rows = stmt.query_map(params![node_id], |row| {
            Ok(Edge {
                edge_id: row.get(0)?,
                node_a: row.get(1)?,
                node_b: row.get(2)?,
                weight: row.get(3)?,
                top_channel: row.get(4)?,
                last_assessed: row.get(5)?,
                assessment_count: row.get(6)?,
            })
        })?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    pub async fn get_edge_channels(&self, edge_id: i64) -> Result<HashMap<String, f64>> {
        let conn = self.conn.lock().await;
        let mut stmt =
            conn.prepare_cached("SELECT channel, strength FROM edge_channels WHERE edge_id = ?1")?;
        let rows = stmt.query_map(params![edge_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?;
        let mut out = HashMap::new();
        for r in rows {
            let (channel, strength) = r?;
            out.insert(channel, strength);
        }
        Ok(out)
    }

    /// Atomically replaces an edge's channel set (delete-all + insert-new), recomputes
    /// `weight`/`top_channel`/`last_assessed`/`assessment_count`, and bumps both
    /// endpoints' `last_touched`/`score`/`degree`. One DB transaction.
    pub async fn replace_edge_channels(
        &self,
        edge_id: i64,
        channels: &HashMap<String, f64>,
        touch_score_delta: f64,
    ) -> Result<()> {
        let now = crate::clock::utc_now_iso();
        let (weight, top_channel) = edge_weight_top(channels);

        let conn = self.conn.lock().await;
        let tx = conn.unchecked_transaction()?;

        tx.execute("DELETE FROM edge_channels WHERE edge_id = ?1", params![edge_id])?;
        for (channel, strength) in channels {
            tx.execute(
                "INSERT INTO edge_channels (edge_id, channel, strength) VALUES (?1, ?2, ?3)",
                params![edge_id, channel, strength],
            )?;
        }
        tx.execute(
            "UPDATE edges SET weight = ?1, top_channel = ?2, last_assessed = ?3, \
             assessment_count = assessment_count + 1 WHERE edge_id = ?4",
            params![weight, top_channel, now, edge_id],
        )?;

        let (node_a, node_b): (String, String) = tx.query_row(
            "SELECT node_a, node_b FROM edges WHERE edge_id = ?1",
            params![edge_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        for node_id in [&node_a, &node_b] {
            tx.execute(
                "UPDATE nodes SET last_touched = ?1, score = score + ?2 WHERE node_id = ?3",
                params![now, touch_score_delta, node_id],
            )?;
            tx.execute(
                "UPDATE nodes SET degree = (\
                    SELECT COUNT(*) FROM edges WHERE edges.node_a = nodes.node_id OR edges.node_b = nodes.node_id\
                 ) WHERE node_id = ?1",
                params![node_id],
            )?;
        }

        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn norm_pair_is_lexicographic() {
        assert_eq!(norm_pair("SPY", "AAPL"), ("AAPL", "SPY"));
        assert_eq!(norm_pair("AAPL", "SPY"), ("AAPL", "SPY"));
    }

    #[test]
    fn edge_weight_top_uses_raw_strength_not_weighted() {
        let mut channels = HashMap::new();
        // narrative_supports has base weight 0.50, correlates has 1.00 — but the
        // raw strength of narrative_supports is higher, so it must win top_channel.
        channels.insert("narrative_supports".to_string(), 0.9);
        channels.insert("correlates".to_string(), 0.2);
        let (weight, top) = edge_weight_top(&channels);
        assert!((weight - (0.50 * 0.9 + 1.00 * 0.2)).abs() < 1e-9);
        assert_eq!(top.as_deref(), Some("narrative_supports"));
    }

    #[tokio::test]
    async fn replace_channels_recomputes_degree_for_endpoints() {
        let store = Store::open_in_memory().unwrap();
        store.init_db(1000.0).await.unwrap();
        let now = crate::clock::utc_now_iso();
        {
            let conn = store.conn.lock().await;
            conn.execute(
                "INSERT INTO nodes (node_id, kind, label, created_at) VALUES ('AAPL','investible','AAPL',?1)",
                params![now],
            ).unwrap();
            conn.execute(
                "INSERT INTO nodes (node_id, kind, label, created_at) VALUES ('SPY','bellwether','SPY',?1)",
                params![now],
            ).unwrap();
        }
        let edge_id = store.ensure_edge_id("AAPL", "SPY").await.unwrap();
        let mut channels = HashMap::new();
        channels.insert("correlates".to_string(), 0.6);
        store.replace_edge_channels(edge_id, &channels, 0.01).await.unwrap();

        let conn = store.conn.lock().await;
        let degree: i64 = conn
            .query_row("SELECT degree FROM nodes WHERE node_id = 'AAPL'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(degree, 1);
    }
}
