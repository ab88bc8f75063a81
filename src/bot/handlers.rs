use anyhow::{Context, Result};
use std::sync::Arc;

use teloxide::macros::BotCommands;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::prelude::*;
use teloxide::types::{MessageId, ParseMode};
use teloxide::{Bot, RequestError};

use super::models::View;
use crate::bot::router::{router, AlertsPayload, MonitoringPayload, Payload, State};
use crate::core::alerts::AlertFilter;
use crate::core::monitoring::MonitoringDraft;
use crate::db;
use crate::models::AppConfig;

pub type MyDialogue = Dialogue<State, InMemStorage<State>>;

/// Лимит поисковой строки: фильтр едет в callback payload,
/// а там бюджет 64 байта на все.
const MAX_SEARCH_QUERY_CHARS: usize = 24;

#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "lowercase", description = "Доступные команды:")]
pub enum Command {
    #[command(description = "Главное меню")]
    Start,
    #[command(description = "Список алертов")]
    Alerts,
}

/// Доступ только для root и добавленных операторов.
async fn ensure_access(
    bot: &Bot,
    config: &Arc<AppConfig>,
    chat_id: ChatId,
    user_id: u64,
) -> Result<bool> {
    if user_id == config.root_user || db::users::is_allowed(&config.db, user_id).await {
        return Ok(true);
    }

    let msg = bot
        .send_message(chat_id, "⛔ Нет доступа. Обратитесь к администратору.")
        .await?;
    crate::bot::utils::spawn_delayed_delete(
        bot.clone(),
        chat_id,
        msg.id,
        config.delete_error_messages_timeout_s,
    );
    Ok(false)
}

/// Точка входа для команд.
pub async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    config: Arc<AppConfig>,
    dialogue: MyDialogue,
) -> Result<()> {
    let user_id = msg.from.as_ref().context("User missing")?.id.0;
    let chat_id = msg.chat.id;

    if !ensure_access(&bot, &config, chat_id, user_id).await? {
        let _ = bot.delete_message(chat_id, msg.id).await;
        return Ok(());
    }

    log::info!("Processing command {:?} for user {}", cmd, user_id);

    let payload = match cmd {
        Command::Start => Payload::Home,
        Command::Alerts => Payload::Alerts(AlertsPayload::List {
            page: 0,
            filter: AlertFilter::default(),
        }),
    };

    // Сбрасываем диалог и удаляем старое меню
    dialogue.exit().await?;
    if let Some(session) = config.sessions.get(&user_id) {
        let _ = bot.delete_message(chat_id, MessageId(session.last_menu_id)).await;
    }

    let view = router(payload, user_id, config.clone()).await?;
    send_new_view(&bot, chat_id, user_id, view, config).await?;

    let _ = bot.delete_message(chat_id, msg.id).await;
    Ok(())
}

/// Основной диспетчер нажатий на кнопки.
pub async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    config: Arc<AppConfig>,
    dialogue: MyDialogue,
) -> Result<()> {
    // 1. Мгновенно гасим spinner в Telegram
    let _ = bot.answer_callback_query(q.id).await;

    let data = q.data.as_ref().context("No callback data")?;
    let user_id = q.from.id.0;
    let msg = q.message.as_ref().context("Message missing")?;

    if !ensure_access(&bot, &config, msg.chat().id, user_id).await? {
        return Ok(());
    }

    // 2. Декодирование
    let payload = Payload::from_string(data)
        .context("Critical: Binary payload decoding failed")?;

    // 3. Роутинг
    let view = router(payload, user_id, config.clone()).await?;

    // 4. Оркестрация UI и State
    apply_view(&bot, &config, &dialogue, msg.chat().id, msg.id(), user_id, view).await
}

/// Live-обновление интерфейса без изменения состояния диалога.
pub async fn render_current_view(
    bot: &Bot,
    config: &Arc<AppConfig>,
    user_id: u64,
    chat_id: ChatId,
    message_id: MessageId,
    context: &str,
) -> Result<()> {
    let payload = Payload::from_string(context).context("Context decoding failed")?;
    let view = router(payload, user_id, config.clone()).await?;

    update_view(bot, chat_id, message_id, user_id, view, config.clone()).await
}

/// Атомарно применяет изменения стейта и обновляет сообщение.
async fn apply_view(
    bot: &Bot,
    config: &Arc<AppConfig>,
    dialogue: &MyDialogue,
    chat_id: ChatId,
    message_id: MessageId,
    user_id: u64,
    view: View,
) -> Result<()> {
    if let Some(new_state) = view.next_state.clone() {
        dialogue.update(new_state).await?;
    } else {
        dialogue.exit().await?;
    }

    update_view(bot, chat_id, message_id, user_id, view, config.clone()).await
}

pub async fn update_view(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    user_id: u64,
    view: View,
    config: Arc<AppConfig>,
) -> anyhow::Result<()> {
    let text = view.get_text();
    let kb = view.kb.clone();
    let payload_str = view.payload.to_string();

    // Пытаемся выполнить edit (Optimistic update)
    let res = bot
        .edit_message_text(chat_id, message_id, text.clone())
        .parse_mode(ParseMode::MarkdownV2)
        .reply_markup(kb)
        .await;

    match res {
        Ok(_) => {
            crate::core::update_user_state(&config, user_id, message_id.0, &payload_str).await;
            Ok(())
        }
        Err(RequestError::Api(teloxide::ApiError::MessageNotModified)) => Ok(()),
        Err(e) => {
            let err_str = e.to_string();
            if err_str.contains("message to edit not found") {
                log::warn!("Detected ghost message for user {}. Re-anchoring UI.", user_id);
            } else {
                log::info!("UI re-anchor for user {}: {}", user_id, err_str);
            }

            // Принудительно отправляем новое сообщение
            send_new_view(bot, chat_id, user_id, view, config).await?;

            // Пытаемся удалить старое, но игнорируем ошибку:
            // его может уже не быть.
            let b = bot.clone();
            tokio::spawn(async move {
                let _ = b.delete_message(chat_id, message_id).await;
            });

            Ok(())
        }
    }
}

async fn send_new_view(
    bot: &Bot,
    chat_id: ChatId,
    user_id: u64,
    view: View,
    config: Arc<AppConfig>,
) -> Result<()> {
    let text = view.get_text();
    let payload_str = view.payload.to_string();

    let sent = bot
        .send_message(chat_id, text)
        .parse_mode(ParseMode::MarkdownV2)
        .reply_markup(view.kb)
        .await?;

    // Сохраняем ID сообщения БОТА, а не входящего апдейта.
    crate::core::update_user_state(&config, user_id, sent.id.0, &payload_str).await;
    Ok(())
}

// --- ОБРАБОТЧИКИ ДИАЛОГОВ ---

/// Комментарий к подтверждению алерта. «-» — подтверждение без заметок.
pub async fn handle_ack_notes(
    bot: Bot,
    msg: Message,
    config: Arc<AppConfig>,
    dialogue: MyDialogue,
    (alert_id, page, filter): (i64, u32, AlertFilter),
) -> Result<()> {
    let raw = msg.text().unwrap_or("").trim().to_string();
    let notes = if raw.is_empty() || raw == "-" { None } else { Some(raw) };

    let size = config.page_size;
    // Клиент не мешает повторной отправке: конфликт от сервера
    // показываем как есть.
    if let Err(e) = crate::core::alerts::acknowledge_and_refresh(
        config.api.as_ref(),
        alert_id,
        notes.as_deref(),
        page,
        size,
        &filter,
    )
    .await
    {
        let err_msg = bot.send_message(msg.chat.id, format!("⚠️ {}", e)).await?;
        crate::bot::utils::spawn_delayed_delete(
            bot.clone(),
            msg.chat.id,
            err_msg.id,
            config.delete_error_messages_timeout_s,
        );
    }

    let next = Payload::Alerts(AlertsPayload::Detail { id: alert_id, page, filter });
    finalize_dialogue(bot, dialogue, msg, config, Some(next)).await
}

/// Текст поиска по текущей странице алертов.
pub async fn handle_search_query(
    bot: Bot,
    msg: Message,
    config: Arc<AppConfig>,
    dialogue: MyDialogue,
    (page, filter): (u32, AlertFilter),
) -> Result<()> {
    let query: String = msg
        .text()
        .unwrap_or("")
        .trim()
        .chars()
        .take(MAX_SEARCH_QUERY_CHARS)
        .collect();

    let mut filter = filter;
    filter.query = if query.is_empty() { None } else { Some(query) };

    // Поиск сужает текущую страницу, серверный запрос тот же.
    let next = Payload::Alerts(AlertsPayload::List { page, filter });
    finalize_dialogue(bot, dialogue, msg, config, Some(next)).await
}

/// Шаг 1 формы мониторинга: ID бизнеса.
pub async fn handle_business_id(
    bot: Bot,
    msg: Message,
    config: Arc<AppConfig>,
    dialogue: MyDialogue,
) -> Result<()> {
    let text = msg.text().unwrap_or("").trim();

    if let Ok(business_id) = text.parse::<i64>() {
        if business_id > 0 {
            dialogue.update(State::WaitingForMonitoringName { business_id }).await?;
            let _ = bot.delete_message(msg.chat.id, msg.id).await;

            let prompt = bot
                .send_message(msg.chat.id, "Введите имя мониторинга:")
                .await?;
            crate::bot::utils::spawn_delayed_delete(bot, msg.chat.id, prompt.id, 30);
            return Ok(());
        }
    }

    let err_msg = bot
        .send_message(msg.chat.id, "⚠️ Ошибка: введите числовой ID бизнеса.")
        .await?;
    crate::bot::utils::spawn_delayed_delete(
        bot.clone(),
        msg.chat.id,
        err_msg.id,
        config.delete_error_messages_timeout_s,
    );

    finalize_dialogue(bot, dialogue, msg, config, None).await
}

/// Шаг 2 формы мониторинга: имя. Валидация и отправка на сервер.
pub async fn handle_monitoring_name(
    bot: Bot,
    msg: Message,
    config: Arc<AppConfig>,
    dialogue: MyDialogue,
    business_id: i64,
) -> Result<()> {
    let draft = MonitoringDraft {
        business_id,
        name: msg.text().unwrap_or("").trim().to_string(),
    };

    let next = match crate::core::monitoring::create(config.api.as_ref(), &draft).await {
        Ok(created) => {
            log::info!("Monitoring {} created for business {}", created.id, business_id);
            Some(Payload::Monitoring(MonitoringPayload::List { page: 0 }))
        }
        Err(e) => {
            let err_msg = bot.send_message(msg.chat.id, format!("⚠️ {}", e)).await?;
            crate::bot::utils::spawn_delayed_delete(
                bot.clone(),
                msg.chat.id,
                err_msg.id,
                config.delete_error_messages_timeout_s,
            );
            None
        }
    };

    finalize_dialogue(bot, dialogue, msg, config, next).await
}

/// Админка: ID нового оператора.
pub async fn handle_user_id(
    bot: Bot,
    msg: Message,
    config: Arc<AppConfig>,
    dialogue: MyDialogue,
) -> Result<()> {
    let from_id = msg.from.as_ref().context("User missing")?.id.0;
    let text = msg.text().unwrap_or("").trim();

    let next = match text.parse::<u64>() {
        Ok(new_user) if new_user > 0 && from_id == config.root_user => {
            db::users::add_user(&config.db, new_user, from_id).await?;
            Some(Payload::Admin(crate::bot::router::AdminPayload::ListUsers))
        }
        _ => {
            let err_msg = bot
                .send_message(msg.chat.id, "⚠️ Ошибка: введите числовой Telegram ID.")
                .await?;
            crate::bot::utils::spawn_delayed_delete(
                bot.clone(),
                msg.chat.id,
                err_msg.id,
                config.delete_error_messages_timeout_s,
            );
            None
        }
    };

    finalize_dialogue(bot, dialogue, msg, config, next).await
}

/// Завершает диалог, очищает чат и обновляет интерфейс.
async fn finalize_dialogue(
    bot: Bot,
    dialog_manager: MyDialogue,
    incoming_msg: Message,
    app_config: Arc<AppConfig>,
    explicit_payload: Option<Payload>, // Новый контекст (если есть)
) -> Result<()> {
    let user_id = incoming_msg.from.as_ref().context("User context missing")?.id.0;
    let chat_id = incoming_msg.chat.id;

    // 1. Сбрасываем состояние диалога
    dialog_manager.exit().await?;

    // 2. Удаляем сообщение пользователя (Cleanup)
    let _ = bot.delete_message(chat_id, incoming_msg.id).await;

    // 3. БЕЗОПАСНОЕ ИЗВЛЕЧЕНИЕ ДАННЫХ (Scoped Lock)
    // Ограничиваем время жизни блокировки DashMap этим блоком { }
    let (message_id, context_str) = {
        let session = app_config.sessions.get(&user_id)
            .context("Session expired during input")?;

        let mid = MessageId(session.last_menu_id);

        // Если передан новый payload — используем его, иначе старый контекст
        let ctx = match explicit_payload {
            Some(p) => p.to_string(),
            None => session.current_context.clone(),
        };

        (mid, ctx)
    }; // <-- Блокировка DashMap снимается здесь (Drop)

    // 4. Обновляем UI (теперь .await безопасен, лок отпущен)
    render_current_view(&bot, &app_config, user_id, chat_id, message_id, &context_str).await?;

    Ok(())
}
