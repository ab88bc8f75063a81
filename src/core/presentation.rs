use chrono::{DateTime, Duration, Local, Utc};

use crate::api::models::{AlertSeverity, AlertType, MonitoringType, NotificationFrequency};

pub struct StateFormatter;

impl StateFormatter {
    pub fn severity_icon(severity: AlertSeverity) -> &'static str {
        match severity {
            AlertSeverity::Low => "🔵",
            AlertSeverity::Medium => "🟡",
            AlertSeverity::High => "🟠",
            AlertSeverity::Critical => "🔴",
        }
    }

    pub fn severity_label(severity: AlertSeverity) -> &'static str {
        match severity {
            AlertSeverity::Low => "Низкая",
            AlertSeverity::Medium => "Средняя",
            AlertSeverity::High => "Высокая",
            AlertSeverity::Critical => "Критичная",
        }
    }

    pub fn type_icon(alert_type: AlertType) -> &'static str {
        match alert_type {
            AlertType::CreditScoreChange => "📉",
            AlertType::PaymentDelay => "⏰",
            AlertType::NewTradeReference => "🤝",
            AlertType::NewPaymentHistory => "💳",
            AlertType::CreditReportGenerated => "📄",
            AlertType::MonitoringExpiring => "⌛",
            AlertType::Unknown => "📦",
        }
    }

    pub fn type_label(alert_type: AlertType) -> &'static str {
        match alert_type {
            AlertType::CreditScoreChange => "Изменение кредитного скора",
            AlertType::PaymentDelay => "Просрочка платежа",
            AlertType::NewTradeReference => "Новый торговый референс",
            AlertType::NewPaymentHistory => "Новая платежная история",
            AlertType::CreditReportGenerated => "Сформирован кредитный отчет",
            AlertType::MonitoringExpiring => "Мониторинг истекает",
            AlertType::Unknown => "Событие",
        }
    }

    pub fn monitoring_type_label(monitoring_type: MonitoringType) -> &'static str {
        match monitoring_type {
            MonitoringType::CreditScore => "Кредитный скор",
            MonitoringType::PaymentBehavior => "Платежное поведение",
            MonitoringType::FullProfile => "Полный профиль",
        }
    }

    pub fn frequency_label(frequency: NotificationFrequency) -> &'static str {
        match frequency {
            NotificationFrequency::Immediate => "Мгновенно",
            NotificationFrequency::DailyDigest => "Дайджест за день",
            NotificationFrequency::WeeklyDigest => "Дайджест за неделю",
        }
    }

    /// Бейдж непрочитанных: все, что больше 99, схлопывается в «99+».
    pub fn format_unread_badge(count: i64) -> String {
        if count > 99 {
            "99+".to_string()
        } else {
            count.to_string()
        }
    }

    /// Числа показываем без хвостовых нулей: 45.00 → 45, 45.50 → 45.5.
    pub fn format_value(value: f64) -> String {
        let rounded = format!("{:.2}", value);
        rounded
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    }

    /// Строка изменения: «+15 (+50%)», если сервер прислал хоть что-то.
    pub fn format_change(amount: Option<f64>, percentage: Option<f64>) -> Option<String> {
        match (amount, percentage) {
            (Some(a), Some(p)) => Some(format!("{:+} ({:+}%)", Self::trim_signed(a), Self::trim_signed(p))),
            (Some(a), None) => Some(format!("{:+}", Self::trim_signed(a))),
            (None, Some(p)) => Some(format!("{:+}%", Self::trim_signed(p))),
            (None, None) => None,
        }
    }

    fn trim_signed(value: f64) -> f64 {
        // Два знака достаточно для денег и процентов.
        (value * 100.0).round() / 100.0
    }

    pub fn format_last_update(dt: DateTime<Utc>) -> String {
        let now = Utc::now();
        let diff = now - dt;
        let seconds = diff.num_seconds();

        if seconds < 60 {
            if seconds < 15 {
                return "только что".to_string();
            }
            let rounded_seconds = (seconds / 15) * 15;
            return format!("{}с назад", rounded_seconds);
        }

        if diff < Duration::hours(1) {
            return format!("{}м назад", diff.num_minutes());
        }

        let local_dt = dt.with_timezone(&Local);
        if local_dt.date_naive() == Local::now().date_naive() {
            local_dt.format("%H:%M").to_string()
        } else {
            local_dt.format("%d %b %H:%M").to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn badge_caps_at_99_plus() {
        assert_eq!(StateFormatter::format_unread_badge(0), "0");
        assert_eq!(StateFormatter::format_unread_badge(99), "99");
        assert_eq!(StateFormatter::format_unread_badge(100), "99+");
        assert_eq!(StateFormatter::format_unread_badge(150), "99+");
    }

    #[test]
    fn values_drop_trailing_zeros() {
        assert_eq!(StateFormatter::format_value(45.0), "45");
        assert_eq!(StateFormatter::format_value(45.5), "45.5");
        assert_eq!(StateFormatter::format_value(45.55), "45.55");
    }

    #[test]
    fn change_combines_amount_and_percentage() {
        assert_eq!(
            StateFormatter::format_change(Some(15.0), Some(50.0)),
            Some("+15 (+50%)".to_string())
        );
        assert_eq!(
            StateFormatter::format_change(Some(-3.5), None),
            Some("-3.5".to_string())
        );
        assert_eq!(StateFormatter::format_change(None, None), None);
    }
}
