use anyhow::Result;
use sqlx::SqlitePool;

pub async fn is_allowed(pool: &SqlitePool, user_id: u64) -> bool {
    let result = sqlx::query_scalar::<_, i32>("SELECT 1 FROM users WHERE id = ? LIMIT 1")
        .bind(user_id as i64)
        .fetch_optional(pool)
        .await;

    match result {
        Ok(maybe_one) => maybe_one.is_some(),
        Err(e) => {
            error!("Error check user {} in DB: {}", user_id, e);
            false
        }
    }
}

pub async fn add_user(pool: &SqlitePool, user_id: u64, added_by: u64) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO users (id, added_by) VALUES (?, ?)")
        .bind(user_id as i64)
        .bind(added_by as i64)
        .execute(pool)
        .await?;
    Ok(())
}

/// Вместе с оператором умирают его подписка и сессия.
pub async fn remove_user(pool: &SqlitePool, user_id: u64) -> Result<()> {
    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(user_id as i64)
        .execute(pool)
        .await?;
    sqlx::query("DELETE FROM subscriptions WHERE user_id = ?")
        .bind(user_id as i64)
        .execute(pool)
        .await?;
    sqlx::query("DELETE FROM sessions WHERE user_id = ?")
        .bind(user_id as i64)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn list_users(pool: &SqlitePool) -> Result<Vec<i64>> {
    let rows = sqlx::query_as::<_, (i64,)>("SELECT id FROM users ORDER BY created_at")
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(|r| r.0).collect())
}
