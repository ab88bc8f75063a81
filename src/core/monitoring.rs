use serde::{Deserialize, Serialize};

use crate::api::models::{
    CreditMonitoringRequest, CreditMonitoringResponse, MonitoringType, NotificationFrequency,
};
use crate::api::{ApiClientError, CreditApi};

/// Черновик формы создания мониторинга (двухшаговый диалог в боте).
#[derive(Debug, Clone)]
pub struct MonitoringDraft {
    pub business_id: i64,
    pub name: String,
}

/// Переключаемые флаги на экране настроек мониторинга.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitoringToggle {
    ScoreChange,
    PaymentDelay,
    TradeReference,
    Email,
    Sms,
}

/// Валидация формы до отправки: имя обязательно, ID бизнеса — положительный.
pub fn build_create_request(
    draft: &MonitoringDraft,
) -> Result<CreditMonitoringRequest, ApiClientError> {
    let name = draft.name.trim();
    if name.is_empty() {
        return Err(ApiClientError::Validation(
            "имя мониторинга обязательно".to_string(),
        ));
    }
    if draft.business_id <= 0 {
        return Err(ApiClientError::Validation(
            "некорректный ID бизнеса".to_string(),
        ));
    }

    // Стартовые пороги; дальше правятся переключателями на экране настроек.
    Ok(CreditMonitoringRequest {
        business_id: draft.business_id,
        monitoring_name: name.to_string(),
        monitoring_type: MonitoringType::FullProfile,
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
        notification_frequency: NotificationFrequency::Immediate,
    })
}

pub async fn create(
    api: &dyn CreditApi,
    draft: &MonitoringDraft,
) -> Result<CreditMonitoringResponse, ApiClientError> {
    let req = build_create_request(draft)?;
    api.create_monitoring(&req).await
}

/// Запрос обновления из текущего состояния: сервер ждет полный объект.
pub fn request_from_existing(current: &CreditMonitoringResponse) -> CreditMonitoringRequest {
    CreditMonitoringRequest {
        business_id: current.business_id,
        monitoring_name: current.monitoring_name.clone(),
        monitoring_type: current.monitoring_type,
        score_min_threshold: current.score_min_threshold,
        score_max_threshold: current.score_max_threshold,
        score_change_threshold: current.score_change_threshold,
        payment_delay_threshold_days: current.payment_delay_threshold_days,
        overdue_amount_threshold: current.overdue_amount_threshold,
        alert_on_score_change: current.alert_on_score_change,
        alert_on_payment_delay: current.alert_on_payment_delay,
        alert_on_new_trade_reference: current.alert_on_new_trade_reference,
        notify_email: current.notify_email,
        notify_sms: current.notify_sms,
        notification_frequency: current.notification_frequency,
    }
}

pub fn apply_toggle(req: &mut CreditMonitoringRequest, toggle: MonitoringToggle) {
    match toggle {
        MonitoringToggle::ScoreChange => req.alert_on_score_change = !req.alert_on_score_change,
        MonitoringToggle::PaymentDelay => req.alert_on_payment_delay = !req.alert_on_payment_delay,
        MonitoringToggle::TradeReference => {
            req.alert_on_new_trade_reference = !req.alert_on_new_trade_reference
        }
        MonitoringToggle::Email => req.notify_email = !req.notify_email,
        MonitoringToggle::Sms => req.notify_sms = !req.notify_sms,
    }
}

/// У сервера нет by-id чтения — ищем сканом загруженной страницы,
/// как и для алертов.
pub async fn find_on_page(
    api: &dyn CreditApi,
    id: i64,
    page: u32,
    size: u32,
) -> Result<CreditMonitoringResponse, ApiClientError> {
    let loaded = api.fetch_my_monitoring(page, size).await?;
    loaded
        .content
        .into_iter()
        .find(|m| m.id == id)
        .ok_or(ApiClientError::Api {
            message: "мониторинг не найден на текущей странице".to_string(),
        })
}

pub async fn toggle_and_update(
    api: &dyn CreditApi,
    id: i64,
    page: u32,
    size: u32,
    toggle: MonitoringToggle,
) -> Result<CreditMonitoringResponse, ApiClientError> {
    let current = find_on_page(api, id, page, size).await?;
    let mut req = request_from_existing(&current);
    apply_toggle(&mut req, toggle);
    api.update_monitoring(id, &req).await
}

pub async fn cycle_frequency_and_update(
    api: &dyn CreditApi,
    id: i64,
    page: u32,
    size: u32,
) -> Result<CreditMonitoringResponse, ApiClientError> {
    let current = find_on_page(api, id, page, size).await?;
    let mut req = request_from_existing(&current);
    req.notification_frequency = req.notification_frequency.next();
    api.update_monitoring(id, &req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{sample_monitoring, FakeCreditApi};

    #[test]
    fn name_is_required() {
        let draft = MonitoringDraft {
            business_id: 7,
            name: "   ".to_string(),
        };
        assert!(matches!(
            build_create_request(&draft),
            Err(ApiClientError::Validation(_))
        ));

        let draft = MonitoringDraft {
            business_id: 0,
            name: "ООО Ромашка".to_string(),
        };
        assert!(matches!(
            build_create_request(&draft),
            Err(ApiClientError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn toggle_round_trips_through_update() {
        let api = FakeCreditApi::new(vec![]).with_monitoring(vec![sample_monitoring(1)]);

        let updated = toggle_and_update(&api, 1, 0, 10, MonitoringToggle::Sms)
            .await
            .unwrap();
        assert!(updated.notify_sms);

        let updated = toggle_and_update(&api, 1, 0, 10, MonitoringToggle::Sms)
            .await
            .unwrap();
        assert!(!updated.notify_sms);
        // Остальные поля не пострадали.
        assert!(updated.alert_on_score_change);
        assert_eq!(updated.monitoring_name, "monitoring-1");
    }

    #[tokio::test]
    async fn frequency_cycles_through_all_values() {
        let api = FakeCreditApi::new(vec![]).with_monitoring(vec![sample_monitoring(3)]);

        let first = cycle_frequency_and_update(&api, 3, 0, 10).await.unwrap();
        assert_eq!(
            first.notification_frequency,
            NotificationFrequency::DailyDigest
        );
        let second = cycle_frequency_and_update(&api, 3, 0, 10).await.unwrap();
        assert_eq!(
            second.notification_frequency,
            NotificationFrequency::WeeklyDigest
        );
        let third = cycle_frequency_and_update(&api, 3, 0, 10).await.unwrap();
        assert_eq!(
            third.notification_frequency,
            NotificationFrequency::Immediate
        );
    }

    #[tokio::test]
    async fn deactivate_is_soft() {
        let api = FakeCreditApi::new(vec![]).with_monitoring(vec![sample_monitoring(2)]);
        let message = api.deactivate_monitoring(2).await.unwrap();
        assert!(message.contains("deactivated"));

        let still_there = find_on_page(&api, 2, 0, 10).await.unwrap();
        assert!(!still_there.is_active);
    }
}
