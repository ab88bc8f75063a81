use std::sync::Arc;
use log::{debug, error, info};
use teloxide::types::{ChatId, MessageId};
use teloxide::Bot;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::api::NewAlertEvent;
use crate::bot::router::Payload;
use crate::core::presentation::StateFormatter;
use crate::db;
use crate::models::{AppConfig, NotificationData, UserSession};

pub fn spawn_notification_processor(
    mut rx: mpsc::Receiver<NewAlertEvent>,
    bot: Bot,
    config: Arc<AppConfig>,
    cancel_token: CancellationToken,
) {
    info!("Core: Notification processor started");

    tokio::spawn(async move {
        // Подписка держит общий поллер статистики живым, а смена
        // снапшота сразу обновляет бейджи на открытых экранах.
        let mut stats_sub = config.stats.subscribe();

        loop {
            tokio::select! {
                Some(event) = rx.recv() => {
                    if let Err(e) = process_and_dispatch(&bot, &config, event).await {
                        error!("Core: Error processing alert event: {}", e);
                    }
                }
                _ = stats_sub.changed() => {
                    refresh_alert_surfaces(&bot, &config);
                }
                _ = cancel_token.cancelled() => break,
            }
        }
    });
}

async fn process_and_dispatch(
    bot: &Bot,
    config: &Arc<AppConfig>,
    event: NewAlertEvent,
) -> anyhow::Result<()> {
    let alert = event.alert;
    info!("Core: new alert {} ({:?})", alert.alert_number, alert.severity);

    // Сначала фиксируем доставку: упавшая отправка не приведет
    // к повторному спаму тем же алертом на следующем опросе.
    db::alert_log::DeliveryLog::record_delivery(&config.db, &alert).await?;

    let recipients = db::subscriptions::recipients_for(&config.db, alert.severity).await?;
    if !recipients.is_empty() {
        let title = format!(
            "{} {} · {}",
            StateFormatter::severity_icon(alert.severity),
            alert.alert_number,
            alert.title
        );

        let mut body_lines = vec![StateFormatter::type_label(alert.alert_type).to_string()];
        if let Some(change) = StateFormatter::format_change(alert.change_amount, alert.change_percentage) {
            body_lines.push(format!("Изменение: {}", change));
        }
        if !alert.description.is_empty() {
            body_lines.push(alert.description.clone());
        }

        let data = NotificationData {
            title,
            body: body_lines.join("\n"),
            recipients,
        };

        let b = bot.clone();
        let c = config.clone();
        tokio::spawn(async move {
            if let Err(e) = crate::bot::notification::send_notification(b, c, data).await {
                error!("Error sending alert notification: {}", e);
            }
        });
    }

    // Живые экраны с бейджами обновляем сразу, не дожидаясь heartbeat.
    refresh_alert_surfaces(bot, config);
    Ok(())
}

fn refresh_alert_surfaces(bot: &Bot, config: &Arc<AppConfig>) {
    for entry in config.sessions.iter() {
        let user_id = *entry.key();
        let session = entry.value();

        if !is_watching_alert_surface(session) {
            continue;
        }

        let b = bot.clone();
        let c = config.clone();
        let mid = MessageId(session.last_menu_id);
        let ctx = session.current_context.clone();

        tokio::spawn(async move {
            if let Err(e) = crate::bot::handlers::render_current_view(
                &b, &c, user_id, ChatId(user_id as i64), mid, &ctx,
            )
            .await
            {
                debug!("Fail refresh screen {}: {}", user_id, e);
            }
        });
    }
}

/// Экран считается «алертовым», если на нем виден бейдж или список:
/// главное меню и все экраны раздела алертов.
fn is_watching_alert_surface(session: &UserSession) -> bool {
    match Payload::from_string(&session.current_context) {
        Ok(Payload::Home) => true,
        Ok(Payload::Alerts(_)) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::router::AlertsPayload;
    use crate::core::alerts::AlertFilter;

    fn session_for(payload: &Payload) -> UserSession {
        UserSession {
            last_menu_id: 1,
            current_context: payload.to_string(),
        }
    }

    #[test]
    fn alert_surfaces_are_home_and_alert_screens() {
        assert!(is_watching_alert_surface(&session_for(&Payload::Home)));
        assert!(is_watching_alert_surface(&session_for(&Payload::Alerts(
            AlertsPayload::List {
                page: 2,
                filter: AlertFilter::default(),
            }
        ))));
        assert!(!is_watching_alert_surface(&session_for(&Payload::Admin(
            crate::bot::router::AdminPayload::ListUsers
        ))));
        assert!(!is_watching_alert_surface(&UserSession {
            last_menu_id: 1,
            current_context: "garbage".to_string(),
        }));
    }
}
