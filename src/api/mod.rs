pub(crate) mod client;
pub(crate) mod error;
pub(crate) mod models;
mod watcher;

pub use client::{CreditApi, CreditApiClient};
pub use error::ApiClientError;
pub use models::NewAlertEvent;
pub use watcher::spawn_alert_watcher;

pub fn init(url: String, token: String) -> CreditApiClient {
    CreditApiClient::new(url, token, 10, 5)
}

/// In-memory реализация API для тестов ядра: серверная пагинация,
/// идемпотентный mark-read и конфликт повторного подтверждения
/// воспроизводят контракт реального сервера.
#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Utc;

    use super::client::CreditApi;
    use super::error::ApiClientError;
    use super::models::{
        Alert, AlertSeverity, AlertStatistics, AlertType, CreditMonitoringRequest,
        CreditMonitoringResponse, Page,
    };

    pub fn sample_alert(id: i64, severity: AlertSeverity, is_read: bool) -> Alert {
        Alert {
            id,
            alert_number: format!("ALT-{:04}", id),
            alert_type: AlertType::PaymentDelay,
            severity,
            title: format!("Alert #{}", id),
            description: String::new(),
            details: None,
            previous_value: None,
            current_value: None,
            threshold_value: None,
            change_amount: None,
            change_percentage: None,
            related_entity_type: None,
            related_entity_id: None,
            is_read,
            is_acknowledged: false,
            acknowledged_by: None,
            acknowledged_at: None,
            acknowledgment_notes: None,
            created_at: Utc::now(),
            expires_at: None,
        }
    }

    pub fn sample_monitoring(id: i64) -> CreditMonitoringResponse {
        CreditMonitoringResponse {
            id,
            business_id: 100 + id,
            business_name: None,
            monitoring_name: format!("monitoring-{}", id),
            monitoring_type: super::models::MonitoringType::FullProfile,
            score_min_threshold: Some(300.0),
            score_max_threshold: None,
            score_change_threshold: Some(50.0),
            payment_delay_threshold_days: Some(30),
            overdue_amount_threshold: None,
            alert_on_score_change: true,
            alert_on_payment_delay: true,
            alert_on_new_trade_reference: false,
            notify_email: true,
            notify_sms: false,
            notification_frequency: super::models::NotificationFrequency::Immediate,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn slice_page<T: Clone>(items: &[T], page: u32, size: u32) -> Page<T> {
        let size = size.max(1);
        let total = items.len() as i64;
        let total_pages = ((total + size as i64 - 1) / size as i64) as u32;
        let start = page as usize * size as usize;

        let content: Vec<T> = items
            .iter()
            .skip(start)
            .take(size as usize)
            .cloned()
            .collect();

        Page {
            content,
            total_elements: total,
            total_pages,
            number: page,
            size,
            has_next: ((page as i64 + 1) * size as i64) < total,
            has_previous: page > 0,
        }
    }

    struct FakeState {
        alerts: Vec<Alert>,
        statistics: AlertStatistics,
        monitoring: Vec<CreditMonitoringResponse>,
        next_monitoring_id: i64,
    }

    pub struct FakeCreditApi {
        state: Mutex<FakeState>,
        pub stats_calls: AtomicUsize,
    }

    impl FakeCreditApi {
        pub fn new(alerts: Vec<Alert>) -> Self {
            Self {
                state: Mutex::new(FakeState {
                    alerts,
                    statistics: AlertStatistics::default(),
                    monitoring: Vec::new(),
                    next_monitoring_id: 1,
                }),
                stats_calls: AtomicUsize::new(0),
            }
        }

        pub fn with_statistics(self, statistics: AlertStatistics) -> Self {
            self.state.lock().unwrap().statistics = statistics;
            self
        }

        pub fn with_monitoring(self, monitoring: Vec<CreditMonitoringResponse>) -> Self {
            self.state.lock().unwrap().monitoring = monitoring;
            self
        }
    }

    fn response_from(
        id: i64,
        req: &CreditMonitoringRequest,
        is_active: bool,
    ) -> CreditMonitoringResponse {
        CreditMonitoringResponse {
            id,
            business_id: req.business_id,
            business_name: None,
            monitoring_name: req.monitoring_name.clone(),
            monitoring_type: req.monitoring_type,
            score_min_threshold: req.score_min_threshold,
            score_max_threshold: req.score_max_threshold,
            score_change_threshold: req.score_change_threshold,
            payment_delay_threshold_days: req.payment_delay_threshold_days,
            overdue_amount_threshold: req.overdue_amount_threshold,
            alert_on_score_change: req.alert_on_score_change,
            alert_on_payment_delay: req.alert_on_payment_delay,
            alert_on_new_trade_reference: req.alert_on_new_trade_reference,
            notify_email: req.notify_email,
            notify_sms: req.notify_sms,
            notification_frequency: req.notification_frequency,
            is_active,
            created_at: Utc::now(),
        }
    }

    #[async_trait]
    impl CreditApi for FakeCreditApi {
        async fn fetch_alerts(
            &self,
            page: u32,
            size: u32,
            unread_only: bool,
        ) -> Result<Page<Alert>, ApiClientError> {
            let state = self.state.lock().unwrap();
            let filtered: Vec<Alert> = if unread_only {
                state.alerts.iter().filter(|a| !a.is_read).cloned().collect()
            } else {
                state.alerts.clone()
            };
            Ok(slice_page(&filtered, page, size))
        }

        async fn fetch_statistics(&self) -> Result<AlertStatistics, ApiClientError> {
            self.stats_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.state.lock().unwrap().statistics.clone())
        }

        async fn mark_read(&self, alert_id: i64) -> Result<Alert, ApiClientError> {
            let mut state = self.state.lock().unwrap();
            let alert = state
                .alerts
                .iter_mut()
                .find(|a| a.id == alert_id)
                .ok_or(ApiClientError::Api {
                    message: "alert not found".to_string(),
                })?;
            // Идемпотентно: повторная пометка не ошибка.
            alert.is_read = true;
            Ok(alert.clone())
        }

        async fn acknowledge(
            &self,
            alert_id: i64,
            notes: Option<&str>,
        ) -> Result<Alert, ApiClientError> {
            let mut state = self.state.lock().unwrap();
            let alert = state
                .alerts
                .iter_mut()
                .find(|a| a.id == alert_id)
                .ok_or(ApiClientError::Api {
                    message: "alert not found".to_string(),
                })?;
            if alert.is_acknowledged {
                return Err(ApiClientError::Conflict {
                    message: "alert already acknowledged".to_string(),
                });
            }
            alert.is_acknowledged = true;
            alert.acknowledged_by = Some("ops".to_string());
            alert.acknowledged_at = Some(Utc::now());
            alert.acknowledgment_notes = notes.map(str::to_string);
            // isRead намеренно не трогаем: подтверждение не означает прочтение.
            Ok(alert.clone())
        }

        async fn create_monitoring(
            &self,
            req: &CreditMonitoringRequest,
        ) -> Result<CreditMonitoringResponse, ApiClientError> {
            let mut state = self.state.lock().unwrap();
            let id = state.next_monitoring_id;
            state.next_monitoring_id += 1;
            let resp = response_from(id, req, true);
            state.monitoring.push(resp.clone());
            Ok(resp)
        }

        async fn update_monitoring(
            &self,
            id: i64,
            req: &CreditMonitoringRequest,
        ) -> Result<CreditMonitoringResponse, ApiClientError> {
            let mut state = self.state.lock().unwrap();
            let slot = state
                .monitoring
                .iter_mut()
                .find(|m| m.id == id)
                .ok_or(ApiClientError::Api {
                    message: "monitoring not found".to_string(),
                })?;
            let updated = response_from(id, req, slot.is_active);
            *slot = updated.clone();
            Ok(updated)
        }

        async fn fetch_my_monitoring(
            &self,
            page: u32,
            size: u32,
        ) -> Result<Page<CreditMonitoringResponse>, ApiClientError> {
            let state = self.state.lock().unwrap();
            Ok(slice_page(&state.monitoring, page, size))
        }

        async fn deactivate_monitoring(&self, id: i64) -> Result<String, ApiClientError> {
            let mut state = self.state.lock().unwrap();
            let slot = state
                .monitoring
                .iter_mut()
                .find(|m| m.id == id)
                .ok_or(ApiClientError::Api {
                    message: "monitoring not found".to_string(),
                })?;
            slot.is_active = false;
            Ok(format!("monitoring {} deactivated", id))
        }
    }
}
