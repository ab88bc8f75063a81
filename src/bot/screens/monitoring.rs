use anyhow::Result;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::api::models::CreditMonitoringResponse;
use crate::api::CreditApi;
use crate::bot::models::View;
use crate::bot::router::{MonitoringPayload, Payload, RenderContext, State};
use crate::bot::screens::common;
use crate::core::monitoring::{self, MonitoringToggle};
use crate::core::presentation::StateFormatter;

pub async fn render_list(ctx: RenderContext, page: u32) -> Result<View> {
    let loaded = ctx
        .config
        .api
        .fetch_my_monitoring(page, ctx.config.page_size)
        .await?;

    let mut lines = vec![
        format!("📡 Мониторинг — стр. {}/{}", page + 1, loaded.total_pages.max(1)),
        format!("Всего настроек: {}", loaded.total_elements),
    ];
    if loaded.is_empty() {
        lines.push(String::new());
        lines.push("Настроек на этой странице нет.".to_string());
    }

    let mut rows: Vec<Vec<InlineKeyboardButton>> = Vec::new();

    for setup in &loaded.content {
        rows.push(vec![InlineKeyboardButton::callback(
            setup_button_label(setup),
            Payload::Monitoring(MonitoringPayload::Detail { id: setup.id, page }).to_string(),
        )]);
    }

    rows.push(vec![InlineKeyboardButton::callback(
        "➕ Новый мониторинг",
        Payload::Monitoring(MonitoringPayload::AskCreate).to_string(),
    )]);

    let mut nav = Vec::new();
    if loaded.has_previous {
        nav.push(InlineKeyboardButton::callback(
            "⬅️",
            Payload::Monitoring(MonitoringPayload::List { page: page - 1 }).to_string(),
        ));
    }
    if loaded.has_next {
        nav.push(InlineKeyboardButton::callback(
            "➡️",
            Payload::Monitoring(MonitoringPayload::List { page: page + 1 }).to_string(),
        ));
    }
    if !nav.is_empty() {
        rows.push(nav);
    }

    rows.push(vec![common::main_menu_button()]);

    Ok(View {
        notifications: ctx.notifications,
        text: lines.join("\n"),
        kb: InlineKeyboardMarkup::new(rows),
        payload: Payload::Monitoring(MonitoringPayload::List { page }),
        ..Default::default()
    })
}

pub async fn render_detail(ctx: RenderContext, id: i64, page: u32) -> Result<View> {
    let setup =
        monitoring::find_on_page(ctx.config.api.as_ref(), id, page, ctx.config.page_size).await?;

    let business = setup
        .business_name
        .clone()
        .unwrap_or_else(|| format!("#{}", setup.business_id));

    let mut lines = vec![
        format!("{} {}", active_icon(&setup), setup.monitoring_name),
        format!("Бизнес: {}", business),
        format!(
            "Тип: {}",
            StateFormatter::monitoring_type_label(setup.monitoring_type)
        ),
        String::new(),
    ];

    if let Some(min) = setup.score_min_threshold {
        lines.push(format!("Скор не ниже: {}", StateFormatter::format_value(min)));
    }
    if let Some(max) = setup.score_max_threshold {
        lines.push(format!("Скор не выше: {}", StateFormatter::format_value(max)));
    }
    if let Some(delta) = setup.score_change_threshold {
        lines.push(format!("Дельта скора: {}", StateFormatter::format_value(delta)));
    }
    if let Some(days) = setup.payment_delay_threshold_days {
        lines.push(format!("Просрочка: от {} дн.", days));
    }
    if let Some(amount) = setup.overdue_amount_threshold {
        lines.push(format!(
            "Сумма долга: от {}",
            StateFormatter::format_value(amount)
        ));
    }

    lines.push(format!(
        "Создан: {}",
        StateFormatter::format_last_update(setup.created_at)
    ));
    if !setup.is_active {
        lines.push(String::new());
        lines.push("Мониторинг деактивирован.".to_string());
    }

    let mut rows = vec![
        vec![InlineKeyboardButton::callback(
            toggle_label("Алерты по скору", setup.alert_on_score_change),
            Payload::Monitoring(MonitoringPayload::Toggle {
                id,
                page,
                toggle: MonitoringToggle::ScoreChange,
            })
            .to_string(),
        )],
        vec![InlineKeyboardButton::callback(
            toggle_label("Алерты по просрочкам", setup.alert_on_payment_delay),
            Payload::Monitoring(MonitoringPayload::Toggle {
                id,
                page,
                toggle: MonitoringToggle::PaymentDelay,
            })
            .to_string(),
        )],
        vec![InlineKeyboardButton::callback(
            toggle_label("Алерты по референсам", setup.alert_on_new_trade_reference),
            Payload::Monitoring(MonitoringPayload::Toggle {
                id,
                page,
                toggle: MonitoringToggle::TradeReference,
            })
            .to_string(),
        )],
        vec![
            InlineKeyboardButton::callback(
                toggle_label("📧 Email", setup.notify_email),
                Payload::Monitoring(MonitoringPayload::Toggle {
                    id,
                    page,
                    toggle: MonitoringToggle::Email,
                })
                .to_string(),
            ),
            InlineKeyboardButton::callback(
                toggle_label("📱 SMS", setup.notify_sms),
                Payload::Monitoring(MonitoringPayload::Toggle {
                    id,
                    page,
                    toggle: MonitoringToggle::Sms,
                })
                .to_string(),
            ),
        ],
        vec![InlineKeyboardButton::callback(
            format!(
                "🔁 Частота: {}",
                StateFormatter::frequency_label(setup.notification_frequency)
            ),
            Payload::Monitoring(MonitoringPayload::CycleFrequency { id, page }).to_string(),
        )],
    ];

    if setup.is_active {
        rows.push(vec![InlineKeyboardButton::callback(
            "🗑 Деактивировать",
            Payload::Monitoring(MonitoringPayload::Deactivate { id, page }).to_string(),
        )]);
    }

    rows.push(vec![common::back_button(Payload::Monitoring(
        MonitoringPayload::List { page },
    ))]);

    Ok(View {
        notifications: ctx.notifications,
        text: lines.join("\n"),
        kb: InlineKeyboardMarkup::new(rows),
        payload: Payload::Monitoring(MonitoringPayload::Detail { id, page }),
        ..Default::default()
    })
}

/// Первый шаг формы создания: диалог ждет ID бизнеса.
pub fn render_create_prompt(ctx: RenderContext) -> View {
    let rows = vec![vec![common::back_button(Payload::Monitoring(
        MonitoringPayload::List { page: 0 },
    ))]];

    View {
        notifications: ctx.notifications,
        text: "Введите ID бизнеса, за которым нужно следить:".to_string(),
        kb: InlineKeyboardMarkup::new(rows),
        payload: Payload::Monitoring(MonitoringPayload::List { page: 0 }),
        next_state: Some(State::WaitingForBusinessId),
        ..Default::default()
    }
}

fn setup_button_label(setup: &CreditMonitoringResponse) -> String {
    let business = setup
        .business_name
        .clone()
        .unwrap_or_else(|| format!("#{}", setup.business_id));
    format!("{} {} ({})", active_icon(setup), setup.monitoring_name, business)
}

fn active_icon(setup: &CreditMonitoringResponse) -> &'static str {
    if setup.is_active {
        "🟢"
    } else {
        "⚪"
    }
}

fn toggle_label(name: &str, enabled: bool) -> String {
    if enabled {
        format!("✅ {}", name)
    } else {
        format!("☐ {}", name)
    }
}
