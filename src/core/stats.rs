use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::api::models::AlertStatistics;
use crate::api::{ApiClientError, CreditApi};

/// Снапшот статистики с моментом получения: возраст данных виден
/// в шапке, экраны сами решают, насколько он им свеж.
#[derive(Debug, Clone)]
pub struct StatsSnapshot {
    pub stats: AlertStatistics,
    pub fetched_at: DateTime<Utc>,
}

/// Общий store статистики алертов: один поллер на процесс вместо
/// таймера в каждом экране, fan-out подписчикам через watch-канал.
///
/// Поллер поднимается при первой подписке и гасится со смертью
/// последнего подписчика, поэтому после остановки всех фоновых задач
/// никто не пишет в канал.
pub struct StatsStore {
    api: Arc<dyn CreditApi>,
    refresh_interval: Duration,
    tx: watch::Sender<Option<StatsSnapshot>>,
    poller: Mutex<PollerState>,
}

struct PollerState {
    subscribers: usize,
    cancel: Option<CancellationToken>,
}

/// Подписка-гвард: пока жива, поллер работает.
pub struct StatsSubscription {
    store: Arc<StatsStore>,
    rx: watch::Receiver<Option<StatsSnapshot>>,
}

impl StatsStore {
    pub fn new(api: Arc<dyn CreditApi>, refresh_interval: Duration) -> Arc<Self> {
        let (tx, _rx) = watch::channel(None);
        Arc::new(Self {
            api,
            refresh_interval,
            tx,
            poller: Mutex::new(PollerState {
                subscribers: 0,
                cancel: None,
            }),
        })
    }

    /// Последний успешный снапшот (None до первого удачного опроса).
    pub fn snapshot(&self) -> Option<StatsSnapshot> {
        self.tx.borrow().clone()
    }

    /// Внеочередной запрос — первая загрузка экрана без снапшота.
    pub async fn refresh_now(&self) -> Result<StatsSnapshot, ApiClientError> {
        let stats = self.api.fetch_statistics().await?;
        let snapshot = StatsSnapshot {
            stats,
            fetched_at: Utc::now(),
        };
        self.tx.send_replace(Some(snapshot.clone()));
        Ok(snapshot)
    }

    pub fn subscribe(self: &Arc<Self>) -> StatsSubscription {
        let rx = self.tx.subscribe();
        {
            let mut state = self.poller.lock().unwrap();
            state.subscribers += 1;
            if state.subscribers == 1 {
                let cancel = CancellationToken::new();
                state.cancel = Some(cancel.clone());
                tokio::spawn(poll_statistics(self.clone(), cancel));
            }
        }
        StatsSubscription {
            store: self.clone(),
            rx,
        }
    }

    fn unsubscribe(&self) {
        let mut state = self.poller.lock().unwrap();
        state.subscribers = state.subscribers.saturating_sub(1);
        if state.subscribers == 0 {
            if let Some(cancel) = state.cancel.take() {
                debug!("StatsStore: last subscriber gone, stop polling");
                cancel.cancel();
            }
        }
    }
}

impl StatsSubscription {
    pub fn current(&self) -> Option<StatsSnapshot> {
        self.rx.borrow().clone()
    }

    /// Ждет следующий снапшот. Cancel-safe, живет в tokio::select!.
    pub async fn changed(&mut self) {
        let _ = self.rx.changed().await;
    }
}

impl Drop for StatsSubscription {
    fn drop(&mut self) {
        self.store.unsubscribe();
    }
}

async fn poll_statistics(store: Arc<StatsStore>, cancel_token: CancellationToken) {
    let mut ticker = interval(store.refresh_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(
        "StatsStore: polling statistics every {:?}",
        store.refresh_interval
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if cancel_token.is_cancelled() {
                    break;
                }
                match store.api.fetch_statistics().await {
                    Ok(stats) => {
                        store.tx.send_replace(Some(StatsSnapshot {
                            stats,
                            fetched_at: Utc::now(),
                        }));
                    }
                    // Прошлый снапшот остается на месте, экраны не «моргают».
                    Err(e) => warn!("StatsStore: statistics fetch failed: {}", e),
                }
            }
            _ = cancel_token.cancelled() => break,
        }
    }

    debug!("StatsStore: poller stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::FakeCreditApi;
    use std::sync::atomic::Ordering;

    fn store_with_unread(unread: i64) -> (Arc<FakeCreditApi>, Arc<StatsStore>) {
        let api = Arc::new(FakeCreditApi::new(vec![]).with_statistics(AlertStatistics {
            unread_alerts: unread,
            ..Default::default()
        }));
        let store = StatsStore::new(api.clone(), Duration::from_secs(300));
        (api, store)
    }

    #[tokio::test(start_paused = true)]
    async fn poller_starts_on_first_subscriber_and_fans_out() {
        let (api, store) = store_with_unread(5);
        assert!(store.snapshot().is_none());
        assert_eq!(api.stats_calls.load(Ordering::SeqCst), 0);

        let mut sub = store.subscribe();
        sub.changed().await;

        let snap = sub.current().expect("snapshot after first poll");
        assert_eq!(snap.stats.unread_alerts, 5);
        assert_eq!(store.snapshot().unwrap().stats.unread_alerts, 5);

        // Второй подписчик видит тот же снапшот без нового запроса.
        let calls = api.stats_calls.load(Ordering::SeqCst);
        let sub2 = store.subscribe();
        assert_eq!(sub2.current().unwrap().stats.unread_alerts, 5);
        assert_eq!(api.stats_calls.load(Ordering::SeqCst), calls);

        // Следующий тик — ровно один общий запрос на всех.
        sub.changed().await;
        assert_eq!(api.stats_calls.load(Ordering::SeqCst), calls + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn poller_stops_after_last_subscriber_dropped() {
        let (api, store) = store_with_unread(1);

        let mut sub = store.subscribe();
        sub.changed().await;
        drop(sub);

        // Даем задаче увидеть отмену.
        tokio::time::sleep(Duration::from_millis(10)).await;
        let calls = api.stats_calls.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_secs(1800)).await;
        assert_eq!(api.stats_calls.load(Ordering::SeqCst), calls);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_now_updates_shared_snapshot() {
        let (_api, store) = store_with_unread(7);
        let snap = store.refresh_now().await.unwrap();
        assert_eq!(snap.stats.unread_alerts, 7);
        assert_eq!(store.snapshot().unwrap().stats.unread_alerts, 7);
    }
}
