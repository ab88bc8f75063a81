use anyhow::Result;
use chrono::Utc;
use sqlx::SqlitePool;

use crate::api::models::Alert;

/// Журнал доставленных алертов: watcher по нему отсеивает уже
/// отправленные, maintenance чистит хвост.
pub struct DeliveryLog;

impl DeliveryLog {
    pub async fn record_delivery(pool: &SqlitePool, alert: &Alert) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO delivered_alerts (alert_id, alert_number, severity, delivered_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(alert.id)
        .bind(&alert.alert_number)
        .bind(alert.severity.as_str())
        .bind(Utc::now())
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn was_delivered(pool: &SqlitePool, alert_id: i64) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM delivered_alerts WHERE alert_id = ?)",
        )
        .bind(alert_id)
        .fetch_one(pool)
        .await?;
        Ok(exists)
    }

    pub async fn purge_old(pool: &SqlitePool, ttl_days: u64) -> Result<u64> {
        let horizon = Utc::now() - chrono::Duration::days(ttl_days as i64);
        let result = sqlx::query(
            "DELETE FROM delivered_alerts WHERE DATETIME(delivered_at) < DATETIME(?)",
        )
        .bind(horizon)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }
}
