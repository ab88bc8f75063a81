use sqlx::SqlitePool;

use crate::api::models::AlertSeverity;

/// Порог push-подписки оператора. None — подписки нет.
pub async fn get_min_severity(pool: &SqlitePool, user_id: i64) -> Option<AlertSeverity> {
    let row = sqlx::query_scalar::<_, String>(
        "SELECT min_severity FROM subscriptions WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .unwrap_or(None);

    row.as_deref().and_then(AlertSeverity::parse)
}

/// None удаляет подписку, Some(порог) создает или обновляет.
pub async fn set_subscription(
    pool: &SqlitePool,
    user_id: i64,
    min_severity: Option<AlertSeverity>,
) -> anyhow::Result<()> {
    match min_severity {
        None => {
            sqlx::query("DELETE FROM subscriptions WHERE user_id = ?")
                .bind(user_id)
                .execute(pool)
                .await?;
        }
        Some(severity) => {
            sqlx::query(
                r#"
                INSERT INTO subscriptions (user_id, min_severity)
                VALUES (?1, ?2)
                ON CONFLICT(user_id) DO UPDATE SET min_severity = ?2
                "#,
            )
            .bind(user_id)
            .bind(severity.as_str())
            .execute(pool)
            .await?;
        }
    }
    Ok(())
}

/// Получатели push-а для алерта данной серьезности.
/// Ранг сравниваем в коде: LOW < MEDIUM < HIGH < CRITICAL.
pub async fn recipients_for(
    pool: &SqlitePool,
    severity: AlertSeverity,
) -> anyhow::Result<Vec<i64>> {
    let rows = sqlx::query_as::<_, (i64, String)>("SELECT user_id, min_severity FROM subscriptions")
        .fetch_all(pool)
        .await?;

    Ok(rows
        .into_iter()
        .filter(|(_, min)| {
            AlertSeverity::parse(min).map_or(false, |threshold| severity >= threshold)
        })
        .map(|(user_id, _)| user_id)
        .collect())
}
