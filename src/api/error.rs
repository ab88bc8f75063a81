use thiserror::Error;

/// Ошибки обращения к API кредитного мониторинга.
///
/// Все варианты восстановимы: экраны показывают текст ошибки inline
/// и оставляют прежнее состояние на месте.
#[derive(Debug, Error)]
pub enum ApiClientError {
    /// Запрос не дошел до сервера (DNS, TCP, таймаут).
    #[error("нет связи с сервером: {0}")]
    Network(#[source] reqwest::Error),

    /// Сервер ответил конвертом с ошибкой либо невалидным телом.
    #[error("{message}")]
    Api { message: String },

    /// Повторное подтверждение уже подтвержденного алерта.
    #[error("конфликт: {message}")]
    Conflict { message: String },

    /// 401 — токен отозван или истек. Ротация токена вне бота.
    #[error("токен API отклонен (401), проверьте CREDIT_API_TOKEN")]
    Unauthorized,

    /// Локальная валидация формы до отправки на сервер.
    #[error("{0}")]
    Validation(String),
}
