use serde::{Deserialize, Serialize};

use crate::api::models::{Alert, AlertSeverity, AlertType, Page};
use crate::api::{ApiClientError, CreditApi};

/// Клиентский фильтр поверх уже загруженной страницы.
///
/// `unread_only` уходит на сервер параметром запроса, остальное сужает
/// только текущую страницу: серверные totals не меняются, повторный
/// запрос не инициируется.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct AlertFilter {
    pub severity: Option<AlertSeverity>,
    pub alert_type: Option<AlertType>,
    pub unread_only: bool,
    pub query: Option<String>,
}

impl AlertFilter {
    pub fn is_empty(&self) -> bool {
        self.severity.is_none()
            && self.alert_type.is_none()
            && !self.unread_only
            && self.query.is_none()
    }

    pub fn matches(&self, alert: &Alert) -> bool {
        if let Some(severity) = self.severity {
            if alert.severity != severity {
                return false;
            }
        }
        if let Some(alert_type) = self.alert_type {
            if alert.alert_type != alert_type {
                return false;
            }
        }
        if let Some(query) = &self.query {
            let query = query.to_lowercase();
            let hit = alert.title.to_lowercase().contains(&query)
                || alert.description.to_lowercase().contains(&query)
                || alert.alert_number.to_lowercase().contains(&query);
            if !hit {
                return false;
            }
        }
        true
    }

    /// Следующее значение фильтра серьезности: Все → LOW → … → CRITICAL → Все.
    pub fn cycle_severity(mut self) -> Self {
        self.severity = match self.severity {
            None => Some(AlertSeverity::Low),
            Some(AlertSeverity::Low) => Some(AlertSeverity::Medium),
            Some(AlertSeverity::Medium) => Some(AlertSeverity::High),
            Some(AlertSeverity::High) => Some(AlertSeverity::Critical),
            Some(AlertSeverity::Critical) => None,
        };
        self
    }

    /// Циклический перебор известных типов алертов.
    pub fn cycle_type(mut self) -> Self {
        self.alert_type = match self.alert_type {
            None => Some(AlertType::ALL[0]),
            Some(current) => AlertType::ALL
                .iter()
                .position(|t| *t == current)
                .and_then(|i| AlertType::ALL.get(i + 1))
                .copied(),
        };
        self
    }
}

/// Одна загруженная страница: серверная страница как есть плюс видимое
/// после фильтра подмножество.
#[derive(Debug, Clone)]
pub struct AlertPage {
    pub page: Page<Alert>,
    pub visible: Vec<Alert>,
    pub hidden_by_filter: usize,
}

pub fn apply_filter(page: Page<Alert>, filter: &AlertFilter) -> AlertPage {
    let visible: Vec<Alert> = page
        .content
        .iter()
        .filter(|a| filter.matches(a))
        .cloned()
        .collect();
    let hidden_by_filter = page.content.len() - visible.len();

    AlertPage {
        page,
        visible,
        hidden_by_filter,
    }
}

pub async fn load_page(
    api: &dyn CreditApi,
    page: u32,
    size: u32,
    filter: &AlertFilter,
) -> Result<AlertPage, ApiClientError> {
    let page = api.fetch_alerts(page, size, filter.unread_only).await?;
    Ok(apply_filter(page, filter))
}

/// Поиск алерта линейным сканом загруженной страницы: отдельного
/// by-id эндпоинта у сервера нет. Сканируем сырую страницу, а не
/// отфильтрованное подмножество.
pub fn find_in_page<'a>(page: &'a AlertPage, alert_id: i64) -> Option<&'a Alert> {
    page.page.content.iter().find(|a| a.id == alert_id)
}

/// Контракт обновления: после мутации текущая страница перечитывается
/// целиком — источник истины сервер, а не локальная правка элемента.
/// Снапшот статистики при этом не трогаем, он догонит на своем цикле.
pub async fn mark_read_and_refresh(
    api: &dyn CreditApi,
    alert_id: i64,
    page: u32,
    size: u32,
    filter: &AlertFilter,
) -> Result<(Alert, AlertPage), ApiClientError> {
    let updated = api.mark_read(alert_id).await?;
    let refreshed = load_page(api, page, size, filter).await?;
    Ok((updated, refreshed))
}

pub async fn acknowledge_and_refresh(
    api: &dyn CreditApi,
    alert_id: i64,
    notes: Option<&str>,
    page: u32,
    size: u32,
    filter: &AlertFilter,
) -> Result<(Alert, AlertPage), ApiClientError> {
    let updated = api.acknowledge(alert_id, notes).await?;
    let refreshed = load_page(api, page, size, filter).await?;
    Ok((updated, refreshed))
}

/// Проекция жизненного цикла по паре флагов. Истинным состоянием
/// владеет сервер, бот только отображает.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLifecycle {
    UnreadUnacknowledged,
    ReadUnacknowledged,
    /// Подтверждение не выставляет isRead, поэтому состояние достижимо.
    UnreadAcknowledged,
    ReadAcknowledged,
}

pub fn lifecycle(alert: &Alert) -> AlertLifecycle {
    match (alert.is_read, alert.is_acknowledged) {
        (false, false) => AlertLifecycle::UnreadUnacknowledged,
        (true, false) => AlertLifecycle::ReadUnacknowledged,
        (false, true) => AlertLifecycle::UnreadAcknowledged,
        (true, true) => AlertLifecycle::ReadAcknowledged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{sample_alert, FakeCreditApi};
    use crate::api::ApiClientError;

    fn alerts(n: i64) -> Vec<Alert> {
        (1..=n)
            .map(|i| sample_alert(i, AlertSeverity::Medium, false))
            .collect()
    }

    #[tokio::test]
    async fn pages_are_sliced_like_the_server_contract() {
        let api = FakeCreditApi::new(alerts(25));
        let filter = AlertFilter::default();

        let first = load_page(&api, 0, 10, &filter).await.unwrap();
        assert_eq!(first.page.content.len(), 10);
        assert_eq!(first.page.total_elements, 25);
        assert_eq!(first.page.total_pages, 3);
        assert!(first.page.has_next);
        assert!(!first.page.has_previous);

        let last = load_page(&api, 2, 10, &filter).await.unwrap();
        assert_eq!(last.page.content.len(), 5);
        assert!(!last.page.has_next);
        assert!(last.page.has_previous);
    }

    #[tokio::test]
    async fn page_beyond_range_is_empty_not_an_error() {
        let api = FakeCreditApi::new(alerts(25));
        let filter = AlertFilter::default();

        let beyond = load_page(&api, 3, 10, &filter).await.unwrap();
        assert!(beyond.page.is_empty());
        assert_eq!(beyond.page.total_elements, 25);
    }

    #[tokio::test]
    async fn filter_narrows_current_page_without_touching_totals() {
        let mut items = alerts(10);
        items[0].severity = AlertSeverity::Critical;
        items[1].severity = AlertSeverity::Critical;
        items[2].title = "Supply Steel Ltd".to_string();
        let api = FakeCreditApi::new(items);

        let filter = AlertFilter {
            severity: Some(AlertSeverity::Critical),
            ..Default::default()
        };
        let loaded = load_page(&api, 0, 10, &filter).await.unwrap();
        assert_eq!(loaded.visible.len(), 2);
        assert_eq!(loaded.hidden_by_filter, 8);
        // Серверные totals не зависят от клиентского фильтра.
        assert_eq!(loaded.page.total_elements, 10);
        assert_eq!(loaded.page.total_pages, 1);

        let filter = AlertFilter {
            query: Some("steel".to_string()),
            ..Default::default()
        };
        let loaded = load_page(&api, 0, 10, &filter).await.unwrap();
        assert_eq!(loaded.visible.len(), 1);
        assert_eq!(loaded.page.total_elements, 10);
    }

    #[tokio::test]
    async fn mark_read_is_idempotent() {
        let api = FakeCreditApi::new(alerts(3));
        let filter = AlertFilter::default();

        let (first, _) = mark_read_and_refresh(&api, 2, 0, 10, &filter).await.unwrap();
        assert!(first.is_read);

        let (second, refreshed) = mark_read_and_refresh(&api, 2, 0, 10, &filter).await.unwrap();
        assert!(second.is_read);
        assert!(find_in_page(&refreshed, 2).unwrap().is_read);
    }

    #[tokio::test]
    async fn acknowledge_is_one_way_and_conflicts_on_repeat() {
        let api = FakeCreditApi::new(alerts(3));
        let filter = AlertFilter::default();

        let (updated, refreshed) =
            acknowledge_and_refresh(&api, 1, Some("reviewed"), 0, 10, &filter)
                .await
                .unwrap();
        assert!(updated.is_acknowledged);
        assert_eq!(updated.acknowledgment_notes.as_deref(), Some("reviewed"));
        assert!(updated.acknowledged_by.is_some());
        // Подтверждение не помечает алерт прочитанным.
        assert!(!updated.is_read);
        assert_eq!(lifecycle(&updated), AlertLifecycle::UnreadAcknowledged);

        assert!(find_in_page(&refreshed, 1).unwrap().is_acknowledged);

        let second = acknowledge_and_refresh(&api, 1, None, 0, 10, &filter).await;
        assert!(matches!(second, Err(ApiClientError::Conflict { .. })));

        // И после конфликта флаг не откатился.
        let page = load_page(&api, 0, 10, &AlertFilter::default()).await.unwrap();
        assert!(find_in_page(&page, 1).unwrap().is_acknowledged);
    }

    #[tokio::test]
    async fn unread_only_is_server_side_and_shrinks_totals() {
        let mut items = alerts(4);
        items[0].is_read = true;
        items[3].is_read = true;
        let api = FakeCreditApi::new(items);

        let filter = AlertFilter {
            unread_only: true,
            ..Default::default()
        };
        let loaded = load_page(&api, 0, 10, &filter).await.unwrap();
        assert_eq!(loaded.page.total_elements, 2);
        assert!(loaded.visible.iter().all(|a| !a.is_read));
    }

    #[test]
    fn severity_cycle_returns_to_all() {
        let mut filter = AlertFilter::default();
        for _ in 0..4 {
            filter = filter.cycle_severity();
            assert!(filter.severity.is_some());
        }
        filter = filter.cycle_severity();
        assert!(filter.severity.is_none());
    }

    #[test]
    fn type_cycle_walks_every_known_type() {
        let mut filter = AlertFilter::default();
        for expected in AlertType::ALL {
            filter = filter.cycle_type();
            assert_eq!(filter.alert_type, Some(expected));
        }
        filter = filter.cycle_type();
        assert!(filter.alert_type.is_none());
    }

    #[test]
    fn lifecycle_projection_covers_both_flags() {
        let mut alert = sample_alert(1, AlertSeverity::Low, false);
        assert_eq!(lifecycle(&alert), AlertLifecycle::UnreadUnacknowledged);
        alert.is_read = true;
        assert_eq!(lifecycle(&alert), AlertLifecycle::ReadUnacknowledged);
        alert.is_acknowledged = true;
        assert_eq!(lifecycle(&alert), AlertLifecycle::ReadAcknowledged);
    }
}
