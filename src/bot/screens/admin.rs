use anyhow::Result;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::bot::models::View;
use crate::bot::router::{AdminPayload, Payload, RenderContext, State};
use crate::bot::screens::common;
use crate::db;

pub async fn render(ctx: RenderContext) -> Result<View> {
    let users = db::users::list_users(&ctx.config.db).await?;

    let text = format!(
        "🛠 Операторы бота: {}\nRoot: {}\n\nНажмите на оператора, чтобы отозвать доступ.",
        users.len(),
        ctx.config.root_user
    );

    let mut rows: Vec<Vec<InlineKeyboardButton>> = Vec::new();

    for user_id in users {
        rows.push(vec![InlineKeyboardButton::callback(
            format!("❌ {}", user_id),
            Payload::Admin(AdminPayload::RemoveUser { id: user_id as u64 }).to_string(),
        )]);
    }

    rows.push(vec![InlineKeyboardButton::callback(
        "➕ Добавить оператора",
        Payload::Admin(AdminPayload::AskAddUser).to_string(),
    )]);
    rows.push(vec![common::main_menu_button()]);

    Ok(View {
        notifications: ctx.notifications,
        text,
        kb: InlineKeyboardMarkup::new(rows),
        payload: Payload::Admin(AdminPayload::ListUsers),
        ..Default::default()
    })
}

pub fn render_add_prompt(ctx: RenderContext) -> View {
    let rows = vec![vec![common::back_button(Payload::Admin(
        AdminPayload::ListUsers,
    ))]];

    View {
        notifications: ctx.notifications,
        text: "Введите Telegram ID нового оператора:".to_string(),
        kb: InlineKeyboardMarkup::new(rows),
        payload: Payload::Admin(AdminPayload::ListUsers),
        next_state: Some(State::WaitingForUserId),
        ..Default::default()
    }
}
