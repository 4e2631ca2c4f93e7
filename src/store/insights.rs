use super::Store;
use anyhow::Result;
use rusqlite::params;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsightStatus {
    New,
    Applied,
    Queued,
}

impl InsightStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsightStatus::New => "new",
            InsightStatus::Applied => "applied",
            InsightStatus::Queued => "queued",
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct Insight {
    pub insight_id: i64,
    pub ts: String,
    pub title: String,
    pub body: String,
    pub agents_json: String,
    pub decisions_json: String,
    pub confidence: f64,
    pub critic_score: f64,
    pub starred: bool,
    pub status: String,
    pub evidence_snapshot_id: Option<i64>,
}

impl Store {
    #[allow(clippy::too_many_arguments)]
    pub async fn insert_insight(
        &self,
        ts: &str,
        title: &str,
        body: &str,
        agents_json: &str,
        decisions_json: &str,
        confidence: f64,
        critic_score: f64,
        starred: bool,
        status: InsightStatus,
        evidence_snapshot_id: Option<i64>,
    ) -> Result<i64> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO insights \
             (ts, title, body, agents_json, decisions_json, confidence, critic_score, starred, status, evidence_snapshot_id) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                ts,
                title,
                body,
                agents_json,
                decisions_json,
                confidence,
                critic_score,
                starred as i64,
                status.as_str(),
                evidence_snapshot_id,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub async fn set_insight_status(&self, insight_id: i64, status: InsightStatus) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE insights SET status = ?1 WHERE insight_id = ?2",
            params![status.as_str(), insight_id],
        )?;
        Ok(())
    }

    pub async fn get_insight(&self, insight_id: i64) -> Result<Option<Insight>> {
        let conn = self.conn.lock().await;
        let row = conn.query_row(
            "SELECT insight_id, ts, title, body, agents_json, decisions_json, confidence, \
             critic_score, starred, status, evidence_snapshot_id FROM insights WHERE insight_id = ?1",
            params![insight_id],
            |row| {
                Ok(Insight {
                    insight_id: row.get(0)?,
                    ts: row.get(1)?,
                    title: row.get(2)?,
                    body: row.get(3)?,
                    agents_json: row.get(4)?,
                    decisions_json: row.get(5)?,
                    confidence: row.get(6)?,
                    critic_score: row.get(7)?,
                    starred: row.get::<_, i64>(8)? != 0,
                    status: row.get(9)?,
                    evidence_snapshot_id: row.get(10)?,
                })
            },
        );
        Ok(row.ok())
    }
}
