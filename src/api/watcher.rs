use log::{debug, info, warn};
use std::cmp::min;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::client::CreditApi;
use super::models::NewAlertEvent;
use crate::db;

/// Сколько непрочитанных алертов забираем за один опрос.
const WATCH_PAGE_SIZE: u32 = 50;

const MAX_BACKOFF: Duration = Duration::from_secs(600);

/// Фоновый наблюдатель новых алертов. У API нет push-канала, поэтому
/// опрашиваем первую страницу непрочитанных и отсеиваем уже
/// доставленные по локальному журналу.
pub fn spawn_alert_watcher(
    api: Arc<dyn CreditApi>,
    pool: sqlx::SqlitePool,
    poll_interval_s: u64,
    cancel_token: CancellationToken,
    tx: mpsc::Sender<NewAlertEvent>,
) {
    tokio::spawn(async move {
        tokio::select! {
            _ = watch_alerts(api, pool, poll_interval_s, cancel_token.clone(), tx) => {
                info!("Alert watcher finished.");
            }
            _ = cancel_token.cancelled() => {
                info!("Alert watcher cancelled.");
            }
        }
    });
}

async fn watch_alerts(
    api: Arc<dyn CreditApi>,
    pool: sqlx::SqlitePool,
    poll_interval_s: u64,
    cancel_token: CancellationToken,
    tx: mpsc::Sender<NewAlertEvent>,
) {
    let poll_interval = Duration::from_secs(poll_interval_s.max(5));
    let mut backoff = poll_interval;

    info!("Watcher: poll unread alerts every {:?}", poll_interval);

    loop {
        if cancel_token.is_cancelled() {
            return;
        }

        match api.fetch_alerts(0, WATCH_PAGE_SIZE, true).await {
            Ok(page) => {
                backoff = poll_interval; // Reset on successful poll

                // Сервер сортирует новые сверху — отдаем в хронологическом порядке.
                for alert in page.content.into_iter().rev() {
                    match db::alert_log::DeliveryLog::was_delivered(&pool, alert.id).await {
                        Ok(true) => continue,
                        Ok(false) => {
                            debug!("Watcher: new alert {} ({})", alert.id, alert.alert_number);
                            if tx.send(NewAlertEvent { alert }).await.is_err() {
                                // Приемник умер — дальше опрашивать некому.
                                return;
                            }
                        }
                        Err(e) => {
                            warn!("Watcher: dedupe check failed: {}", e);
                        }
                    }
                }
            }
            Err(e) => {
                warn!("Watcher: fetch failed: {}. Retrying in {:?}...", e, backoff);
                let sleep_for = backoff;
                backoff = min(backoff.saturating_mul(2), MAX_BACKOFF);

                tokio::select! {
                    _ = tokio::time::sleep(sleep_for) => continue,
                    _ = cancel_token.cancelled() => return,
                }
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(poll_interval) => {},
            _ = cancel_token.cancelled() => return,
        }
    }
}
