use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Единый конверт ответа сервера: {success, message, data, timestamp}.
#[derive(Deserialize, Debug)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Серверная страница (Spring-стиль). Страница за пределами диапазона
/// приходит с пустым content, это не ошибка.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub total_elements: i64,
    pub total_pages: u32,
    pub number: u32,
    pub size: u32,
    pub has_next: bool,
    pub has_previous: bool,
}

impl<T> Page<T> {
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// Серьезность упорядочена: LOW < MEDIUM < HIGH < CRITICAL.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "LOW" => Some(Self::Low),
            "MEDIUM" => Some(Self::Medium),
            "HIGH" => Some(Self::High),
            "CRITICAL" => Some(Self::Critical),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    CreditScoreChange,
    PaymentDelay,
    NewTradeReference,
    NewPaymentHistory,
    CreditReportGenerated,
    MonitoringExpiring,
    /// Сервер может прислать тип, которого бот еще не знает.
    #[serde(other)]
    Unknown,
}

impl AlertType {
    /// Известные типы для циклической кнопки фильтра.
    pub const ALL: [AlertType; 6] = [
        Self::CreditScoreChange,
        Self::PaymentDelay,
        Self::NewTradeReference,
        Self::NewPaymentHistory,
        Self::CreditReportGenerated,
        Self::MonitoringExpiring,
    ];
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: i64,
    pub alert_number: String,
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Непрозрачный структурированный payload, бот его не интерпретирует.
    #[serde(default)]
    pub details: Option<serde_json::Value>,
    #[serde(default)]
    pub previous_value: Option<f64>,
    #[serde(default)]
    pub current_value: Option<f64>,
    #[serde(default)]
    pub threshold_value: Option<f64>,
    #[serde(default)]
    pub change_amount: Option<f64>,
    #[serde(default)]
    pub change_percentage: Option<f64>,
    /// Слабая ссылка (type, id) — только для навигационной подписи.
    #[serde(default)]
    pub related_entity_type: Option<String>,
    #[serde(default)]
    pub related_entity_id: Option<i64>,
    pub is_read: bool,
    pub is_acknowledged: bool,
    #[serde(default)]
    pub acknowledged_by: Option<String>,
    #[serde(default)]
    pub acknowledged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub acknowledgment_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Агрегаты считает сервер; бот держит снапшот как кэш с мягким
/// обновлением и не пытается согласовать его со списком транзакционно.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AlertStatistics {
    pub total_alerts: i64,
    pub unread_alerts: i64,
    pub unacknowledged_alerts: i64,
    pub active_monitoring: i64,
    pub critical_alerts: i64,
    pub high_alerts: i64,
    pub medium_alerts: i64,
    pub low_alerts: i64,
    /// Алерты за последние 7 дней.
    pub recent_alerts: i64,
    /// Распределение по типам за скользящие 30 дней, ключ — серверная метка.
    #[serde(default)]
    pub alert_type_distribution: HashMap<String, i64>,
}

impl AlertStatistics {
    /// Флаг высокого приоритета: (critical + high) > 0.
    pub fn has_high_priority(&self) -> bool {
        self.critical_alerts + self.high_alerts > 0
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MonitoringType {
    CreditScore,
    PaymentBehavior,
    FullProfile,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationFrequency {
    Immediate,
    DailyDigest,
    WeeklyDigest,
}

impl NotificationFrequency {
    pub fn next(self) -> Self {
        match self {
            Self::Immediate => Self::DailyDigest,
            Self::DailyDigest => Self::WeeklyDigest,
            Self::WeeklyDigest => Self::Immediate,
        }
    }
}

/// Сервер ждет полный объект, а не патч.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreditMonitoringRequest {
    pub business_id: i64,
    pub monitoring_name: String,
    pub monitoring_type: MonitoringType,
    pub score_min_threshold: Option<f64>,
    pub score_max_threshold: Option<f64>,
    pub score_change_threshold: Option<f64>,
    pub payment_delay_threshold_days: Option<i64>,
    pub overdue_amount_threshold: Option<f64>,
    pub alert_on_score_change: bool,
    pub alert_on_payment_delay: bool,
    pub alert_on_new_trade_reference: bool,
    pub notify_email: bool,
    pub notify_sms: bool,
    pub notification_frequency: NotificationFrequency,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreditMonitoringResponse {
    pub id: i64,
    pub business_id: i64,
    #[serde(default)]
    pub business_name: Option<String>,
    pub monitoring_name: String,
    pub monitoring_type: MonitoringType,
    #[serde(default)]
    pub score_min_threshold: Option<f64>,
    #[serde(default)]
    pub score_max_threshold: Option<f64>,
    #[serde(default)]
    pub score_change_threshold: Option<f64>,
    #[serde(default)]
    pub payment_delay_threshold_days: Option<i64>,
    #[serde(default)]
    pub overdue_amount_threshold: Option<f64>,
    pub alert_on_score_change: bool,
    pub alert_on_payment_delay: bool,
    pub alert_on_new_trade_reference: bool,
    pub notify_email: bool,
    pub notify_sms: bool,
    pub notification_frequency: NotificationFrequency,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Событие для пайплайна уведомлений: watcher увидел новый алерт.
#[derive(Debug, Clone)]
pub struct NewAlertEvent {
    pub alert: Alert,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_deserializes_from_camel_case_wire_format() {
        let raw = r#"{
            "id": 42,
            "alertNumber": "ALT-2026-0042",
            "alertType": "PAYMENT_DELAY",
            "severity": "HIGH",
            "title": "Просрочка платежа",
            "description": "Платеж просрочен на 45 дней",
            "previousValue": 30.0,
            "currentValue": 45.0,
            "thresholdValue": 30.0,
            "changeAmount": 15.0,
            "changePercentage": 50.0,
            "relatedEntityType": "BUSINESS",
            "relatedEntityId": 77,
            "isRead": false,
            "isAcknowledged": false,
            "createdAt": "2026-08-01T10:15:00Z"
        }"#;

        let alert: Alert = serde_json::from_str(raw).unwrap();
        assert_eq!(alert.id, 42);
        assert_eq!(alert.alert_type, AlertType::PaymentDelay);
        assert_eq!(alert.severity, AlertSeverity::High);
        assert_eq!(alert.related_entity_id, Some(77));
        assert!(!alert.is_read);
        assert!(alert.acknowledged_by.is_none());
        assert!(alert.expires_at.is_none());
    }

    #[test]
    fn unknown_alert_type_does_not_break_decoding() {
        let raw = r#"{
            "id": 1,
            "alertNumber": "ALT-1",
            "alertType": "SOMETHING_NEW",
            "severity": "LOW",
            "title": "t",
            "isRead": true,
            "isAcknowledged": false,
            "createdAt": "2026-08-01T10:15:00Z"
        }"#;

        let alert: Alert = serde_json::from_str(raw).unwrap();
        assert_eq!(alert.alert_type, AlertType::Unknown);
    }

    #[test]
    fn statistics_and_envelope_decode() {
        let raw = r#"{
            "success": true,
            "message": "OK",
            "data": {
                "totalAlerts": 120,
                "unreadAlerts": 150,
                "unacknowledgedAlerts": 30,
                "activeMonitoring": 4,
                "criticalAlerts": 2,
                "highAlerts": 5,
                "mediumAlerts": 40,
                "lowAlerts": 73,
                "recentAlerts": 12,
                "alertTypeDistribution": {"PAYMENT_DELAY": 50, "CREDIT_SCORE_CHANGE": 70}
            },
            "timestamp": "2026-08-01T10:15:00Z"
        }"#;

        let envelope: ApiEnvelope<AlertStatistics> = serde_json::from_str(raw).unwrap();
        assert!(envelope.success);
        let stats = envelope.data.unwrap();
        assert_eq!(stats.unread_alerts, 150);
        assert!(stats.has_high_priority());
        assert_eq!(stats.alert_type_distribution["PAYMENT_DELAY"], 50);
    }

    #[test]
    fn severity_is_ordered_and_round_trips_through_db_strings() {
        assert!(AlertSeverity::Low < AlertSeverity::Medium);
        assert!(AlertSeverity::Medium < AlertSeverity::High);
        assert!(AlertSeverity::High < AlertSeverity::Critical);

        for sev in [
            AlertSeverity::Low,
            AlertSeverity::Medium,
            AlertSeverity::High,
            AlertSeverity::Critical,
        ] {
            assert_eq!(AlertSeverity::parse(sev.as_str()), Some(sev));
        }
        assert_eq!(AlertSeverity::parse("NOPE"), None);
    }
}
