pub(crate) mod alerts;
pub(crate) mod maintenance;
pub(crate) mod monitoring;
mod notifications;
pub(crate) mod presentation;
pub(crate) mod stats;

use std::sync::Arc;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use maintenance::spawn_background_maintenance;
pub use notifications::spawn_notification_processor;

use crate::core::presentation::StateFormatter;
use crate::db;
use crate::models::{AppConfig, UserSession};

#[derive(Clone, Serialize, Deserialize, Debug, Default)]
pub struct HeaderItem {
    pub icon: String,
    pub label: String,
    pub value: String,
    pub last_update: DateTime<Utc>,
}

impl AppConfig {
    /// Строки шапки любого экрана: бейдж непрочитанных и счетчик
    /// мониторингов из общего снапшота статистики. Чистая проекция,
    /// никакой своей mutable-копии у шапки нет.
    pub fn get_header_data(&self) -> Vec<HeaderItem> {
        let mut items = Vec::new();

        if let Some(snapshot) = self.stats.snapshot() {
            let stats = &snapshot.stats;

            if stats.unread_alerts > 0 {
                let mut value = format!("*{}*", StateFormatter::format_unread_badge(stats.unread_alerts));
                if stats.has_high_priority() {
                    value.push_str(" ⚠️");
                }

                items.push(HeaderItem {
                    icon: "🔔".into(),
                    label: "Непрочитанные".into(),
                    value,
                    last_update: snapshot.fetched_at,
                });
            }

            if stats.active_monitoring > 0 {
                items.push(HeaderItem {
                    icon: "📡".into(),
                    label: "Мониторинг".into(),
                    value: format!("{} активных", stats.active_monitoring),
                    last_update: snapshot.fetched_at,
                });
            }
        }

        // Снапшота еще нет или непрочитанных ноль — показываем «чистый» статус.
        if items.is_empty() {
            items.push(HeaderItem {
                icon: "✅".into(),
                label: "Система".into(),
                value: "Все спокойно".into(),
                last_update: Utc::now(),
            });
        }

        items
    }
}

pub async fn update_user_state(config: &Arc<AppConfig>, user_id: u64, msg_id: i32, context: &str) {
    debug!("UPDATE USER STATE: user: {}, context: {}", user_id, context);

    config.sessions.insert(user_id, UserSession {
        last_menu_id: msg_id,
        current_context: context.to_string(),
    });

    db::save_user_session(&config.db, user_id, msg_id, context).await;
}
