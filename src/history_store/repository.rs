//! MySQL-backed score history (hazard_history table)

use super::HistoryStore;
use crate::error::Result;
use crate::models::HazardUpdate;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::MySqlPool;

/// DbHistoryStore instance
pub struct DbHistoryStore {
    pool: MySqlPool,
}

impl DbHistoryStore {
    /// Create a new DbHistoryStore
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Create the backing table when it does not exist yet
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS hazard_history (
                history_id BIGINT UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY,
                location_id VARCHAR(190) NOT NULL,
                score DOUBLE NOT NULL,
                recorded_at DATETIME(3) NOT NULL,
                INDEX idx_location_recorded (location_id, recorded_at)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        tracing::info!("hazard_history schema ready");
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for DbHistoryStore {
    async fn average(&self, location_id: &str, limit: usize) -> Result<f64> {
        let rows: Vec<(f64,)> = sqlx::query_as(
            r#"
            SELECT score
            FROM hazard_history
            WHERE location_id = ?
            ORDER BY recorded_at DESC, history_id DESC
            LIMIT ?
            "#,
        )
        .bind(location_id)
        .bind(limit as u32)
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Ok(0.0);
        }
        Ok(rows.iter().map(|(score,)| score).sum::<f64>() / rows.len() as f64)
    }

    async fn record(&self, update: &HazardUpdate) -> Result<()> {
        let recorded_at = DateTime::parse_from_rfc3339(&update.timestamp)
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        sqlx::query(
            r#"
            INSERT INTO hazard_history (location_id, score, recorded_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(&update.id)
        .bind(update.score)
        .bind(recorded_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
