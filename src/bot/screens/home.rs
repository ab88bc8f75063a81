use anyhow::Result;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::api::models::AlertStatistics;
use crate::bot::models::View;
use crate::bot::router::{AdminPayload, AlertsPayload, MonitoringPayload, Payload, RenderContext};
use crate::core::alerts::AlertFilter;
use crate::core::presentation::StateFormatter;
use crate::core::stats::StatsSnapshot;
use crate::db;

/// Дашборд: карточка статистики + меню. Счетчики — проекция общего
/// снапшота; если его еще нет (первый запуск), тянем статистику сразу.
pub async fn render(ctx: RenderContext) -> Result<View> {
    let (snapshot, fetch_error) = match ctx.config.stats.snapshot() {
        Some(snapshot) => (Some(snapshot), None),
        None => match ctx.config.stats.refresh_now().await {
            Ok(snapshot) => (Some(snapshot), None),
            Err(e) => (None, Some(e.to_string())),
        },
    };

    let text = match &snapshot {
        Some(snap) => format_dashboard(&snap.stats),
        None => "Главное меню".to_string(),
    };

    let min_severity = db::subscriptions::get_min_severity(&ctx.config.db, ctx.user_id as i64).await;
    let kb = make_keyboard(snapshot.as_ref(), min_severity, ctx.is_admin);

    Ok(View {
        notifications: ctx.notifications,
        text,
        kb,
        payload: Payload::Home,
        alert: fetch_error,
        ..Default::default()
    })
}

fn format_dashboard(stats: &AlertStatistics) -> String {
    let mut lines = vec![
        format!("📊 Всего алертов: {}", stats.total_alerts),
        format!("🔔 Непрочитанных: {}", StateFormatter::format_unread_badge(stats.unread_alerts)),
        format!("📋 Без подтверждения: {}", stats.unacknowledged_alerts),
        format!("📡 Активный мониторинг: {}", stats.active_monitoring),
        format!("🕐 За 7 дней: {}", stats.recent_alerts),
    ];

    if stats.has_high_priority() {
        lines.push(String::new());
        lines.push(format!(
            "⚠️ Высокий приоритет: {} критичных, {} высоких",
            stats.critical_alerts, stats.high_alerts
        ));
    }

    // Топ типов за 30 дней; сортировка для стабильного вывода.
    let mut distribution: Vec<(&String, &i64)> = stats.alert_type_distribution.iter().collect();
    distribution.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

    if !distribution.is_empty() {
        lines.push(String::new());
        lines.push("Типы за 30 дней:".to_string());
        for (label, count) in distribution.into_iter().take(3) {
            lines.push(format!(" • {}: {}", label, count));
        }
    }

    lines.join("\n")
}

fn make_keyboard(
    snapshot: Option<&StatsSnapshot>,
    min_severity: Option<crate::api::models::AlertSeverity>,
    is_admin: bool,
) -> InlineKeyboardMarkup {
    // Бейдж в подписи кнопки — одна из трех поверхностей со счетчиком.
    let alerts_label = match snapshot {
        Some(snap) if snap.stats.unread_alerts > 0 => format!(
            "🔔 Алерты ({})",
            StateFormatter::format_unread_badge(snap.stats.unread_alerts)
        ),
        _ => "🔔 Алерты".to_string(),
    };

    let subscription_label = match min_severity {
        None => "🔕 Push: ВЫКЛ".to_string(),
        Some(severity) => format!("🔔 Push: ≥ {}", StateFormatter::severity_label(severity)),
    };

    let mut rows = vec![
        vec![InlineKeyboardButton::callback(
            alerts_label,
            Payload::Alerts(AlertsPayload::List {
                page: 0,
                filter: AlertFilter::default(),
            })
            .to_string(),
        )],
        vec![InlineKeyboardButton::callback(
            "📡 Мониторинг",
            Payload::Monitoring(MonitoringPayload::List { page: 0 }).to_string(),
        )],
        vec![InlineKeyboardButton::callback(
            subscription_label,
            Payload::CycleSubscription.to_string(),
        )],
    ];

    if is_admin {
        rows.push(vec![InlineKeyboardButton::callback(
            "🛠 Админка",
            Payload::Admin(AdminPayload::ListUsers).to_string(),
        )]);
    }

    InlineKeyboardMarkup::new(rows)
}
