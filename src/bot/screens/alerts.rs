use anyhow::Result;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::api::models::Alert;
use crate::bot::models::View;
use crate::bot::router::{AlertsPayload, Payload, RenderContext, State};
use crate::bot::screens::common;
use crate::core::alerts::{self, AlertFilter, AlertLifecycle, AlertPage};
use crate::core::presentation::StateFormatter;

const MAX_TITLE_CHARS: usize = 28;

pub async fn render_list(ctx: RenderContext, page: u32, filter: AlertFilter) -> Result<View> {
    let loaded = alerts::load_page(
        ctx.config.api.as_ref(),
        page,
        ctx.config.page_size,
        &filter,
    )
    .await?;

    Ok(build_list_view(ctx, page, filter, loaded))
}

pub async fn render_detail(ctx: RenderContext, id: i64, page: u32, filter: AlertFilter) -> Result<View> {
    let loaded = alerts::load_page(
        ctx.config.api.as_ref(),
        page,
        ctx.config.page_size,
        &filter,
    )
    .await?;

    match alerts::find_in_page(&loaded, id) {
        Some(alert) => {
            let alert = alert.clone();
            Ok(build_detail_view(ctx, alert, page, filter))
        }
        // Алерт уехал со страницы (пагинация/unreadOnly) — показываем список.
        None => Ok(build_list_view(ctx, page, filter, loaded)),
    }
}

/// Экран после мутации: страница уже перечитана, используем копию
/// алерта с нее. Если его там больше нет — ответ мутации.
pub fn render_detail_refreshed(
    ctx: RenderContext,
    updated: Alert,
    refreshed: AlertPage,
    page: u32,
    filter: AlertFilter,
) -> View {
    let alert = alerts::find_in_page(&refreshed, updated.id)
        .cloned()
        .unwrap_or(updated);
    build_detail_view(ctx, alert, page, filter)
}

/// Запрос комментария к подтверждению: экран остается, диалог
/// переводится в режим ввода.
pub fn render_ack_prompt(ctx: RenderContext, id: i64, page: u32, filter: AlertFilter) -> View {
    let rows = vec![
        vec![common::back_button(Payload::Alerts(AlertsPayload::Detail {
            id,
            page,
            filter: filter.clone(),
        }))],
    ];

    View {
        notifications: ctx.notifications,
        text: "Введите комментарий к подтверждению (или «-», чтобы подтвердить без заметок):"
            .to_string(),
        kb: InlineKeyboardMarkup::new(rows),
        payload: Payload::Alerts(AlertsPayload::Detail {
            id,
            page,
            filter: filter.clone(),
        }),
        next_state: Some(State::WaitingForAckNotes {
            alert_id: id,
            page,
            filter,
        }),
        ..Default::default()
    }
}

pub fn render_search_prompt(ctx: RenderContext, page: u32, filter: AlertFilter) -> View {
    let rows = vec![
        vec![common::back_button(Payload::Alerts(AlertsPayload::List {
            page,
            filter: filter.clone(),
        }))],
    ];

    View {
        notifications: ctx.notifications,
        text: "Введите текст для поиска по текущей странице:".to_string(),
        kb: InlineKeyboardMarkup::new(rows),
        payload: Payload::Alerts(AlertsPayload::List {
            page,
            filter: filter.clone(),
        }),
        next_state: Some(State::WaitingForSearchQuery { page, filter }),
        ..Default::default()
    }
}

fn build_list_view(ctx: RenderContext, page: u32, filter: AlertFilter, loaded: AlertPage) -> View {
    let mut lines = vec![
        format!("🔔 Алерты — стр. {}/{}", page + 1, loaded.page.total_pages.max(1)),
        format!("Всего: {}", loaded.page.total_elements),
    ];

    if !filter.is_empty() {
        lines.push(format!("Фильтр: {}", describe_filter(&filter)));
        if loaded.hidden_by_filter > 0 {
            // Фильтр сужает только текущую страницу, totals серверные.
            lines.push(format!("Скрыто фильтром на странице: {}", loaded.hidden_by_filter));
        }
    }

    if loaded.page.is_empty() {
        lines.push(String::new());
        lines.push("На этой странице алертов нет.".to_string());
    } else if loaded.visible.is_empty() {
        lines.push(String::new());
        lines.push("Все алерты страницы скрыты фильтром.".to_string());
    }

    let mut rows: Vec<Vec<InlineKeyboardButton>> = Vec::new();

    for alert in &loaded.visible {
        rows.push(vec![InlineKeyboardButton::callback(
            alert_button_label(alert),
            Payload::Alerts(AlertsPayload::Detail {
                id: alert.id,
                page,
                filter: filter.clone(),
            })
            .to_string(),
        )]);
    }

    rows.push(vec![
        InlineKeyboardButton::callback(
            severity_filter_label(&filter),
            Payload::Alerts(AlertsPayload::CycleSeverity {
                page,
                filter: filter.clone(),
            })
            .to_string(),
        ),
        InlineKeyboardButton::callback(
            type_filter_label(&filter),
            Payload::Alerts(AlertsPayload::CycleType {
                page,
                filter: filter.clone(),
            })
            .to_string(),
        ),
    ]);

    let unread_label = if filter.unread_only {
        "✉️ Только непрочитанные: ВКЛ"
    } else {
        "✉️ Только непрочитанные: ВЫКЛ"
    };
    rows.push(vec![InlineKeyboardButton::callback(
        unread_label,
        Payload::Alerts(AlertsPayload::ToggleUnread {
            filter: filter.clone(),
        })
        .to_string(),
    )]);

    rows.push(vec![
        InlineKeyboardButton::callback(
            "🔍 Поиск",
            Payload::Alerts(AlertsPayload::AskSearch {
                page,
                filter: filter.clone(),
            })
            .to_string(),
        ),
        InlineKeyboardButton::callback(
            "♻️ Сброс",
            Payload::Alerts(AlertsPayload::ClearFilter { page }).to_string(),
        ),
    ]);

    let mut nav = Vec::new();
    if loaded.page.has_previous {
        nav.push(InlineKeyboardButton::callback(
            "⬅️",
            Payload::Alerts(AlertsPayload::List {
                page: page - 1,
                filter: filter.clone(),
            })
            .to_string(),
        ));
    }
    if loaded.page.has_next {
        nav.push(InlineKeyboardButton::callback(
            "➡️",
            Payload::Alerts(AlertsPayload::List {
                page: page + 1,
                filter: filter.clone(),
            })
            .to_string(),
        ));
    }
    if !nav.is_empty() {
        rows.push(nav);
    }

    rows.push(vec![common::main_menu_button()]);

    View {
        notifications: ctx.notifications,
        text: lines.join("\n"),
        kb: InlineKeyboardMarkup::new(rows),
        payload: Payload::Alerts(AlertsPayload::List { page, filter }),
        ..Default::default()
    }
}

fn build_detail_view(ctx: RenderContext, alert: Alert, page: u32, filter: AlertFilter) -> View {
    let mut lines = vec![
        format!(
            "{} {} — {}",
            StateFormatter::severity_icon(alert.severity),
            alert.alert_number,
            StateFormatter::severity_label(alert.severity)
        ),
        format!(
            "{} {}",
            StateFormatter::type_icon(alert.alert_type),
            StateFormatter::type_label(alert.alert_type)
        ),
        String::new(),
        alert.title.clone(),
    ];

    if !alert.description.is_empty() {
        lines.push(alert.description.clone());
    }

    match (alert.previous_value, alert.current_value) {
        (Some(prev), Some(current)) => lines.push(format!(
            "Значение: {} → {}",
            StateFormatter::format_value(prev),
            StateFormatter::format_value(current)
        )),
        (None, Some(current)) => {
            lines.push(format!("Значение: {}", StateFormatter::format_value(current)))
        }
        _ => {}
    }
    if let Some(threshold) = alert.threshold_value {
        lines.push(format!("Порог: {}", StateFormatter::format_value(threshold)));
    }
    if let Some(change) = StateFormatter::format_change(alert.change_amount, alert.change_percentage)
    {
        lines.push(format!("Изменение: {}", change));
    }

    // Слабая ссылка: только подпись, никаких переходов по ней.
    if let (Some(entity_type), Some(entity_id)) =
        (&alert.related_entity_type, alert.related_entity_id)
    {
        lines.push(format!("Связано: {} #{}", entity_type, entity_id));
    }

    lines.push(String::new());
    lines.push(format!(
        "Создан: {}",
        StateFormatter::format_last_update(alert.created_at)
    ));
    if let Some(expires) = alert.expires_at {
        // Информационно: бот не скрывает истекшие алерты сам.
        lines.push(format!("Истекает: {}", expires.format("%d.%m.%Y %H:%M")));
    }

    lines.push(format!("Статус: {}", lifecycle_label(&alert)));
    if alert.is_acknowledged {
        if let Some(by) = &alert.acknowledged_by {
            let when = alert
                .acknowledged_at
                .map(StateFormatter::format_last_update)
                .unwrap_or_default();
            lines.push(format!("Подтвердил: {} {}", by, when));
        }
        if let Some(notes) = &alert.acknowledgment_notes {
            lines.push(format!("Комментарий: {}", notes));
        }
    }

    let mut rows: Vec<Vec<InlineKeyboardButton>> = Vec::new();

    if !alert.is_read {
        rows.push(vec![InlineKeyboardButton::callback(
            "✅ Отметить прочитанным",
            Payload::Alerts(AlertsPayload::MarkRead {
                id: alert.id,
                page,
                filter: filter.clone(),
            })
            .to_string(),
        )]);
    }
    if !alert.is_acknowledged {
        rows.push(vec![InlineKeyboardButton::callback(
            "📝 Подтвердить",
            Payload::Alerts(AlertsPayload::AskAcknowledge {
                id: alert.id,
                page,
                filter: filter.clone(),
            })
            .to_string(),
        )]);
    }

    rows.push(vec![common::back_button(Payload::Alerts(
        AlertsPayload::List {
            page,
            filter: filter.clone(),
        },
    ))]);
    rows.push(vec![common::main_menu_button()]);

    View {
        notifications: ctx.notifications,
        text: lines.join("\n"),
        kb: InlineKeyboardMarkup::new(rows),
        payload: Payload::Alerts(AlertsPayload::Detail {
            id: alert.id,
            page,
            filter,
        }),
        ..Default::default()
    }
}

fn lifecycle_label(alert: &Alert) -> &'static str {
    match alerts::lifecycle(alert) {
        AlertLifecycle::UnreadUnacknowledged => "Непрочитан",
        AlertLifecycle::ReadUnacknowledged => "Прочитан",
        AlertLifecycle::UnreadAcknowledged => "Подтвержден (не прочитан)",
        AlertLifecycle::ReadAcknowledged => "Прочитан и подтвержден",
    }
}

fn alert_button_label(alert: &Alert) -> String {
    let unread_mark = if alert.is_read { "" } else { "• " };
    let ack_mark = if alert.is_acknowledged { " ✔" } else { "" };

    let title: String = alert.title.chars().take(MAX_TITLE_CHARS).collect();

    format!(
        "{} {}{} {}{}",
        StateFormatter::severity_icon(alert.severity),
        unread_mark,
        alert.alert_number,
        title,
        ack_mark
    )
}

fn severity_filter_label(filter: &AlertFilter) -> String {
    match filter.severity {
        None => "🎚 Серьезность: все".to_string(),
        Some(severity) => format!(
            "🎚 {} {}",
            StateFormatter::severity_icon(severity),
            StateFormatter::severity_label(severity)
        ),
    }
}

fn type_filter_label(filter: &AlertFilter) -> String {
    match filter.alert_type {
        None => "🗂 Тип: все".to_string(),
        Some(alert_type) => format!(
            "🗂 {}",
            StateFormatter::type_label(alert_type)
        ),
    }
}

fn describe_filter(filter: &AlertFilter) -> String {
    let mut parts = Vec::new();
    if let Some(severity) = filter.severity {
        parts.push(StateFormatter::severity_label(severity).to_string());
    }
    if let Some(alert_type) = filter.alert_type {
        parts.push(StateFormatter::type_label(alert_type).to_string());
    }
    if filter.unread_only {
        parts.push("непрочитанные".to_string());
    }
    if let Some(query) = &filter.query {
        parts.push(format!("«{}»", query));
    }
    parts.join(", ")
}
