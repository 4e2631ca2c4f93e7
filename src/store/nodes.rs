use super::Store;
use anyhow::Result;
use rusqlite::params;

#[derive(Debug, Clone, serde::Serialize)]
pub struct Node {
    pub node_id: String,
    pub kind: String,
    pub label: String,
    pub description: String,
    pub score: f64,
    pub degree: i64,
    pub created_at: String,
    pub last_touched: Option<String>,
}

impl Store {
    pub async fn get_node(&self, node_id: &str) -> Result<Option<Node>> {
        let conn = self.conn.lock().await;
        let row = conn.query_row(
            "SELECT node_id, kind, label, description, score, degree, created_at, last_touched \
             FROM nodes WHERE node_id = ?1",
            params![node_id],
            |row| {
                Ok(Node {
                    node_id: row.get(0)?,
                    kind: row.get(1)?,
                    label: row.get(2)?,
                    description: row.get(3)?,
                    score: row.get(4)?,
                    degree: row.get(5)?,
                    created_at: row.get(6)?,
                    last_touched: row.get(7)?,
                })
            },
        );
        Ok(row.ok())
    }

    pub async fn nodes_of_kind(&self, kind: &str) -> Result<Vec<String>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare_cached("SELECT node_id FROM nodes WHERE kind = ?1")?;
        let rows = stmt.query_map(params![kind], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    pub async fn active_investibles(&self) -> Result<Vec<String>> {
        self.nodes_of_kind("investible").await
    }

    pub async fn active_bellwethers(&self) -> Result<Vec<String>> {
        self.nodes_of_kind("bellwether").await
    }

    pub async fn monitored_options(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare_cached(
            "SELECT node_id FROM nodes WHERE kind = 'option_call' OR kind = 'option_put'",
        )?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    /// Ensures an options-monitoring node exists (created by the options workflow
    /// collaborator, not by this core); idempotent.
    pub async fn ensure_option_node(
        &self,
        node_id: &str,
        kind: &str,
        label: &str,
        description: &str,
    ) -> Result<()> {
        let now = crate::clock::utc_now_iso();
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT OR IGNORE INTO nodes (node_id, kind, label, description, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![node_id, kind, label, description, now],
        )?;
        Ok(())
    }
}
