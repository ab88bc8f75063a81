use std::sync::Arc;
use serde::{Deserialize, Serialize};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD as B64, Engine};

use crate::api::models::AlertSeverity;
use crate::api::CreditApi;
use crate::bot::models::View;
use crate::core::alerts::{self, AlertFilter};
use crate::core::monitoring::MonitoringToggle;
use crate::core::HeaderItem;
use crate::db;
use crate::models::AppConfig;

#[derive(Clone)]
pub struct RenderContext {
    pub user_id: u64,
    pub config: Arc<AppConfig>,
    pub notifications: Vec<HeaderItem>,
    pub is_admin: bool,
}

/// Состояния диалогов (ввод текста пользователем).
#[derive(Clone, Serialize, Deserialize, Debug, Default)]
pub enum State {
    #[default]
    Idle,
    /// Комментарий к подтверждению алерта.
    WaitingForAckNotes {
        alert_id: i64,
        page: u32,
        filter: AlertFilter,
    },
    /// Текст поиска по текущей странице алертов.
    WaitingForSearchQuery { page: u32, filter: AlertFilter },
    /// Шаг 1 формы мониторинга: ID бизнеса.
    WaitingForBusinessId,
    /// Шаг 2 формы мониторинга: имя.
    WaitingForMonitoringName { business_id: i64 },
    /// Админка: ID нового оператора.
    WaitingForUserId,
}

#[derive(Default, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Payload {
    #[default]
    Home,
    /// Цикл порога push-подписки: ВЫКЛ → CRITICAL → … → LOW → ВЫКЛ.
    CycleSubscription,
    Alerts(AlertsPayload),
    Monitoring(MonitoringPayload),
    Admin(AdminPayload),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum AlertsPayload {
    List { page: u32, filter: AlertFilter },
    Detail { id: i64, page: u32, filter: AlertFilter },
    MarkRead { id: i64, page: u32, filter: AlertFilter },
    AskAcknowledge { id: i64, page: u32, filter: AlertFilter },
    CycleSeverity { page: u32, filter: AlertFilter },
    CycleType { page: u32, filter: AlertFilter },
    ToggleUnread { filter: AlertFilter },
    AskSearch { page: u32, filter: AlertFilter },
    ClearFilter { page: u32 },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum MonitoringPayload {
    List { page: u32 },
    Detail { id: i64, page: u32 },
    AskCreate,
    Toggle { id: i64, page: u32, toggle: MonitoringToggle },
    CycleFrequency { id: i64, page: u32 },
    Deactivate { id: i64, page: u32 },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum AdminPayload {
    ListUsers,
    AskAddUser,
    RemoveUser { id: u64 },
}

impl Payload {
    /// Сериализация в компактную Base64-строку: у callback data
    /// жесткий лимит 64 байта, JSON туда не влезает.
    pub fn to_string(&self) -> String {
        match postcard::to_allocvec(self) {
            Ok(bin) => B64.encode(bin),
            Err(e) => {
                log::error!("Serialization failed: {}", e);
                String::new()
            }
        }
    }

    pub fn from_string(s: &str) -> Result<Self, anyhow::Error> {
        let bin = B64.decode(s).map_err(|e| {
            anyhow::anyhow!("Base64 decode failed for '{}': {}", s, e)
        })?;

        postcard::from_bytes(&bin).map_err(|e| {
            anyhow::anyhow!("Binary decode failed. Bytes: {:?}, Error: {}", bin, e)
        })
    }
}

pub async fn router(
    payload: Payload,
    user_id: u64,
    config: Arc<AppConfig>,
) -> anyhow::Result<View> {
    let notifications = config.get_header_data();
    let is_admin = config.root_user == user_id;

    info!("ROUTER CALL: user_id={}, payload {}", user_id, payload.to_string());

    let ctx = RenderContext {
        user_id,
        config: config.clone(),
        notifications,
        is_admin,
    };

    // Любая ошибка экрана превращается в inline-блок с кнопкой
    // «Повторить» с тем же payload; упавший фетч не роняет процесс.
    let retry = payload.clone();
    match dispatch(ctx.clone(), payload).await {
        Ok(view) => Ok(view),
        Err(e) => Ok(super::screens::common::error_view(ctx, &format!("{:#}", e), retry)),
    }
}

async fn dispatch(ctx: RenderContext, payload: Payload) -> anyhow::Result<View> {
    match payload {
        Payload::Home => super::screens::home::render(ctx).await,
        Payload::CycleSubscription => {
            cycle_subscription(&ctx).await?;
            super::screens::home::render(ctx).await
        }
        Payload::Alerts(sub_payload) => router_alerts(ctx, sub_payload).await,
        Payload::Monitoring(sub_payload) => router_monitoring(ctx, sub_payload).await,
        Payload::Admin(sub_payload) if ctx.is_admin => router_admin(ctx, sub_payload).await,
        // Не админ — молча в главное меню.
        Payload::Admin(_) => super::screens::home::render(ctx).await,
    }
}

async fn router_alerts(ctx: RenderContext, payload: AlertsPayload) -> anyhow::Result<View> {
    use super::screens::alerts as screen;

    match payload {
        AlertsPayload::List { page, filter } => screen::render_list(ctx, page, filter).await,
        AlertsPayload::Detail { id, page, filter } => {
            screen::render_detail(ctx, id, page, filter).await
        }
        AlertsPayload::MarkRead { id, page, filter } => {
            let size = ctx.config.page_size;
            let (updated, refreshed) = alerts::mark_read_and_refresh(
                ctx.config.api.as_ref(),
                id,
                page,
                size,
                &filter,
            )
            .await?;
            Ok(screen::render_detail_refreshed(ctx, updated, refreshed, page, filter))
        }
        AlertsPayload::AskAcknowledge { id, page, filter } => {
            Ok(screen::render_ack_prompt(ctx, id, page, filter))
        }
        AlertsPayload::CycleSeverity { page, filter } => {
            screen::render_list(ctx, page, filter.cycle_severity()).await
        }
        AlertsPayload::CycleType { page, filter } => {
            screen::render_list(ctx, page, filter.cycle_type()).await
        }
        AlertsPayload::ToggleUnread { filter } => {
            let mut filter = filter;
            filter.unread_only = !filter.unread_only;
            // Серверный параметр меняется — начинаем с нулевой страницы.
            screen::render_list(ctx, 0, filter).await
        }
        AlertsPayload::AskSearch { page, filter } => {
            Ok(screen::render_search_prompt(ctx, page, filter))
        }
        AlertsPayload::ClearFilter { page } => {
            screen::render_list(ctx, page, AlertFilter::default()).await
        }
    }
}

async fn router_monitoring(ctx: RenderContext, payload: MonitoringPayload) -> anyhow::Result<View> {
    use super::screens::monitoring as screen;
    use crate::core::monitoring;

    match payload {
        MonitoringPayload::List { page } => screen::render_list(ctx, page).await,
        MonitoringPayload::Detail { id, page } => screen::render_detail(ctx, id, page).await,
        MonitoringPayload::AskCreate => Ok(screen::render_create_prompt(ctx)),
        MonitoringPayload::Toggle { id, page, toggle } => {
            let size = ctx.config.page_size;
            monitoring::toggle_and_update(ctx.config.api.as_ref(), id, page, size, toggle).await?;
            // Экран перечитывает страницу сам — сервер источник истины.
            screen::render_detail(ctx, id, page).await
        }
        MonitoringPayload::CycleFrequency { id, page } => {
            let size = ctx.config.page_size;
            monitoring::cycle_frequency_and_update(ctx.config.api.as_ref(), id, page, size).await?;
            screen::render_detail(ctx, id, page).await
        }
        MonitoringPayload::Deactivate { id, page } => {
            let message = ctx.config.api.deactivate_monitoring(id).await?;
            info!("Monitoring {} deactivated: {}", id, message);
            screen::render_list(ctx, page).await
        }
    }
}

async fn router_admin(ctx: RenderContext, payload: AdminPayload) -> anyhow::Result<View> {
    use super::screens::admin as screen;

    match payload {
        AdminPayload::ListUsers => screen::render(ctx).await,
        AdminPayload::AskAddUser => Ok(screen::render_add_prompt(ctx)),
        AdminPayload::RemoveUser { id } => {
            db::users::remove_user(&ctx.config.db, id).await?;
            screen::render(ctx).await
        }
    }
}

async fn cycle_subscription(ctx: &RenderContext) -> anyhow::Result<()> {
    let pool = &ctx.config.db;
    let user_id = ctx.user_id as i64;

    // Порог опускается с каждым нажатием: меньше порог — больше push-ей.
    let next = match db::subscriptions::get_min_severity(pool, user_id).await {
        None => Some(AlertSeverity::Critical),
        Some(AlertSeverity::Critical) => Some(AlertSeverity::High),
        Some(AlertSeverity::High) => Some(AlertSeverity::Medium),
        Some(AlertSeverity::Medium) => Some(AlertSeverity::Low),
        Some(AlertSeverity::Low) => None,
    };

    db::subscriptions::set_subscription(pool, user_id, next).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{AlertSeverity, AlertType};

    #[test]
    fn test_payload_integrity_and_size() {
        // Худший реалистичный случай: вложенный фильтр с поисковой строкой.
        let original = Payload::Alerts(AlertsPayload::Detail {
            id: 9_000_000_000,
            page: 4096,
            filter: AlertFilter {
                severity: Some(AlertSeverity::Critical),
                alert_type: Some(AlertType::PaymentDelay),
                unread_only: true,
                query: Some("steel supply ltd".to_string()),
            },
        });

        let encoded = original.to_string();
        let len = encoded.len();

        println!("Binary/B64 Buffer use: {}/64 bytes", len);
        println!("Encoded String: {}", encoded);

        assert!(len > 0, "Encoded string should not be empty");
        assert!(len <= 64, "🛑 Payload overflow: {} bytes used. Max is 64.", len);

        let restored = Payload::from_string(&encoded)
            .expect("Failed to decode payload from Base64/Binary");

        assert_eq!(restored, original, "Data corruption: restored payload differs from original");
    }

    #[test]
    fn monitoring_payload_round_trips() {
        let original = Payload::Monitoring(MonitoringPayload::Toggle {
            id: 12345,
            page: 2,
            toggle: MonitoringToggle::TradeReference,
        });

        let restored = Payload::from_string(&original.to_string()).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn garbage_callback_data_is_an_error_not_a_panic() {
        assert!(Payload::from_string("definitely not base64!!!").is_err());
    }
}
