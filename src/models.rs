use std::sync::Arc;
use dashmap::DashMap;

use crate::api::CreditApi;
use crate::core::stats::StatsStore;

pub struct UserSession {
    pub last_menu_id: i32,
    pub current_context: String,
}

/// Данные для push-уведомления об алерте.
pub struct NotificationData {
    pub title: String,
    pub body: String,
    pub recipients: Vec<i64>,
}

pub struct AppConfig {
    pub api: Arc<dyn CreditApi>,
    pub db: sqlx::SqlitePool,
    pub stats: Arc<StatsStore>,
    pub root_user: u64,

    pub page_size: u32,
    pub delete_error_messages_timeout_s: u64,
    pub delete_notification_messages_timeout_s: u64,
    pub maintenance_interval_s: u64,
    pub delivered_alerts_ttl_days: u64,

    pub sessions: DashMap<u64, UserSession>,
}
