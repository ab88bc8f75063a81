use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::bot::models::View;
use crate::bot::router::{Payload, RenderContext};

pub fn back_button(to: Payload) -> InlineKeyboardButton {
    InlineKeyboardButton::callback("⬅️ Назад", to.to_string())
}

pub fn main_menu_button() -> InlineKeyboardButton {
    InlineKeyboardButton::callback("🏠 В главное меню", Payload::Home.to_string())
}

/// Ошибка экрана: inline-блок с текстом и кнопкой «Повторить»,
/// которая шлет тот же payload еще раз.
pub fn error_view(ctx: RenderContext, error: &str, retry: Payload) -> View {
    let rows = vec![
        vec![InlineKeyboardButton::callback("🔄 Повторить", retry.to_string())],
        vec![main_menu_button()],
    ];

    View {
        notifications: ctx.notifications,
        kb: InlineKeyboardMarkup::new(rows),
        payload: retry,
        alert: Some(error.to_string()),
        ..Default::default()
    }
}
