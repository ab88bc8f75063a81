pub(crate) mod alert_log;
pub(crate) mod subscriptions;
pub(crate) mod users;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use sqlx::migrate::Migrator;
use std::str::FromStr;
use std::path::Path;
use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use log::info;

use crate::models::UserSession;

pub async fn init(db_url: &str, migration_path: &str) -> Result<SqlitePool> {

    prepare_db_dir(db_url).context("Error preparing db dir")?;

    let opts = SqliteConnectOptions::from_str(db_url)
        .context("Unsupported format DATABASE_URL")?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal) // WAL режим для стабильности
        .busy_timeout(std::time::Duration::from_secs(5));

    let pool = SqlitePool::connect_with(opts)
        .await
        .context("Error connecting to database")?;

    let migrations_dir = Path::new(migration_path);
    if migrations_dir.exists() {
        let migrator = Migrator::new(migrations_dir)
            .await
            .with_context(|| format!("Error init migration: {:?}", migrations_dir))?;

        migrator.run(&pool)
            .await
            .context("Error running migrations")?;
        info!("Migrations applied.");
    } else {
        log::warn!("Migration folder missing {:?}. check env.", migrations_dir);
    }

    Ok(pool)
}

fn prepare_db_dir(uri: &str) -> Result<()> {
    if let Some(path_str) = uri.strip_prefix("sqlite://") {
        let path = Path::new(path_str);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                info!("Create DB folder: {:?}", parent);
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Fail create dir {:?}", parent))?;
            }
        }
    } else {
        return Err(anyhow!("DATABASE_URL start with 'sqlite://'"));
    }

    Ok(())
}

/// Сессия пишется best-effort: потеря записи не ломает UI,
/// heartbeat просто не обновит это меню после рестарта.
pub async fn save_user_session(pool: &SqlitePool, user_id: u64, msg_id: i32, context: &str) {
    let res = sqlx::query(
        r#"
        INSERT INTO sessions (user_id, last_menu_id, context, updated_at)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(user_id) DO UPDATE SET
            last_menu_id = ?2,
            context = ?3,
            updated_at = ?4
        "#,
    )
    .bind(user_id as i64)
    .bind(msg_id)
    .bind(context)
    .bind(Utc::now())
    .execute(pool)
    .await;

    if let Err(e) = res {
        error!("Failed to save session for {}: {}", user_id, e);
    }
}

pub async fn load_sessions(pool: &SqlitePool) -> Result<Vec<(u64, UserSession)>> {
    let rows = sqlx::query_as::<_, (i64, i64, String)>(
        "SELECT user_id, last_menu_id, context FROM sessions",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(user_id, menu_id, context)| {
            (
                user_id as u64,
                UserSession {
                    last_menu_id: menu_id as i32,
                    current_context: context,
                },
            )
        })
        .collect())
}
