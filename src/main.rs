use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::dispatching::Dispatcher;
use teloxide::dptree;

extern crate pretty_env_logger;
#[macro_use] extern crate log;

use crate::config::EnvPaths;
use crate::models::AppConfig;
use crate::options::AppOptions;

mod api;
mod bot;
mod config;
mod core;
mod db;
mod models;
mod options;

/// Мягкое обновление статистики: сервер пересчитывает агрегаты,
/// бот перечитывает их раз в 5 минут.
const STATS_REFRESH_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    pretty_env_logger::init();

    let cancel_token = CancellationToken::new();
    let main_cancel_token = cancel_token.clone();

    info!("🚀 Starting Trade Credit Monitoring BOT.");

    let paths = EnvPaths::load()
        .validate()
        .context("Error checking env variables.")?;

    let options = AppOptions::load(&paths.options)
        .context("Error load options.json.")?;

    let db_pool = db::init(&paths.db_url(), paths.migrations.to_str().context("Путь к миграциям не валиден")?)
        .await
        .context("Error initializing database pool.")?;

    let api: Arc<dyn api::CreditApi> = Arc::new(api::init(paths.api_url.clone(), paths.api_token.clone()));
    let stats = core::stats::StatsStore::new(api.clone(), STATS_REFRESH_INTERVAL);

    let app_config = Arc::new(AppConfig {
        api: api.clone(),
        db: db_pool,
        stats,
        root_user: options.root_user,
        page_size: options.page_size,
        delete_error_messages_timeout_s: 5,
        delete_notification_messages_timeout_s: 3600,
        maintenance_interval_s: 60,
        delivered_alerts_ttl_days: 7,
        sessions: dashmap::DashMap::new(),
    });

    // Восстанавливаем сессии после рестарта: heartbeat сможет
    // обновлять меню, отправленные прошлым процессом.
    for (user_id, session) in db::load_sessions(&app_config.db).await.unwrap_or_default() {
        app_config.sessions.insert(user_id, session);
    }

    let (tx, rx) = mpsc::channel::<api::NewAlertEvent>(100);
    api::spawn_alert_watcher(
        api.clone(),
        app_config.db.clone(),
        options.alert_poll_interval_s,
        cancel_token.clone(),
        tx,
    );

    info!("✅ Run Dispatcher...");

    tokio::spawn(async move {
        // Wait Ctrl+C or SIGTERM Docker/OS
        tokio::signal::ctrl_c().await.expect("Failed to listen for ctrl+c");
        info!("Received SIGTERM");
        main_cancel_token.cancel();
    });

    let storage = InMemStorage::<bot::State>::new();
    let bot = bot::init(options.bot_token);

    core::spawn_notification_processor(rx, bot.clone(), app_config.clone(), cancel_token.clone());
    core::spawn_background_maintenance(bot.clone(), app_config.clone(), cancel_token.clone());

    let mut dispatcher = Dispatcher::builder(bot, bot::schema())
        .dependencies(dptree::deps![app_config.clone(), storage])
        .enable_ctrlc_handler()
        .build();

    let bot_task = dispatcher.dispatch();

    tokio::select! {
        _ = bot_task => info!("Bot task completed successfully."),
        _ = cancel_token.cancelled() => info!("Bot task was canceled."),
    }

    info!("Graceful Shutdown...");

    app_config.db.close().await;

    info!("Database connection closed.");
    Ok(())
}
