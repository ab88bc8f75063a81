use async_trait::async_trait;
use reqwest::{header, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;

use super::error::ApiClientError;
use super::models::{
    Alert, AlertStatistics, ApiEnvelope, CreditMonitoringRequest, CreditMonitoringResponse, Page,
};

/// Шов между экранами и транспортом: в тестах подменяется
/// in-memory фейком, в проде живет единственный `CreditApiClient`.
#[async_trait]
pub trait CreditApi: Send + Sync {
    /// Чистое чтение одной серверной страницы алертов.
    async fn fetch_alerts(
        &self,
        page: u32,
        size: u32,
        unread_only: bool,
    ) -> Result<Page<Alert>, ApiClientError>;

    /// Агрегированная статистика, независимая от списка.
    async fn fetch_statistics(&self) -> Result<AlertStatistics, ApiClientError>;

    /// Идемпотентно: повторный вызов по прочитанному алерту не ошибка.
    async fn mark_read(&self, alert_id: i64) -> Result<Alert, ApiClientError>;

    /// Однонаправленный переход; повторное подтверждение — `Conflict`.
    async fn acknowledge(
        &self,
        alert_id: i64,
        notes: Option<&str>,
    ) -> Result<Alert, ApiClientError>;

    async fn create_monitoring(
        &self,
        req: &CreditMonitoringRequest,
    ) -> Result<CreditMonitoringResponse, ApiClientError>;

    async fn update_monitoring(
        &self,
        id: i64,
        req: &CreditMonitoringRequest,
    ) -> Result<CreditMonitoringResponse, ApiClientError>;

    async fn fetch_my_monitoring(
        &self,
        page: u32,
        size: u32,
    ) -> Result<Page<CreditMonitoringResponse>, ApiClientError>;

    /// Мягкое удаление; сервер возвращает текстовое сообщение.
    async fn deactivate_monitoring(&self, id: i64) -> Result<String, ApiClientError>;
}

pub struct CreditApiClient {
    url: String,
    client: Client,
}

impl CreditApiClient {
    pub fn new(url: String, token: String, timeout_secs: u64, connect_timeout: u64) -> Self {
        let mut headers = header::HeaderMap::new();
        let auth_header = format!("Bearer {}", token);
        let mut auth_val = header::HeaderValue::from_str(&auth_header)
            .expect("Invalid token format");
        auth_val.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, auth_val);

        Self {
            url: url.trim_end_matches('/').to_string(),
            client: Client::builder()
                .default_headers(headers)
                .timeout(std::time::Duration::from_secs(timeout_secs))
                .connect_timeout(std::time::Duration::from_secs(connect_timeout))
                .build()
                .expect("Failed to build credit API HTTP client"),
        }
    }

    /// Разворачивает конверт {success, message, data, timestamp}.
    /// Сервер заворачивает в него и ошибочные статусы.
    async fn decode<T: DeserializeOwned>(res: Response) -> Result<T, ApiClientError> {
        let status = res.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiClientError::Unauthorized);
        }

        let envelope: ApiEnvelope<T> = res
            .json()
            .await
            .map_err(|e| ApiClientError::Api {
                message: format!("невалидный конверт ответа: {}", e),
            })?;

        let message = envelope
            .message
            .unwrap_or_else(|| format!("API error: HTTP {}", status));

        if status == StatusCode::CONFLICT {
            return Err(ApiClientError::Conflict { message });
        }
        if !envelope.success {
            return Err(ApiClientError::Api { message });
        }

        envelope.data.ok_or(ApiClientError::Api {
            message: "конверт без data".to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiClientError> {
        let res = self
            .client
            .get(format!("{}{}", self.url, path))
            .send()
            .await
            .map_err(ApiClientError::Network)?;

        Self::decode(res).await
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T, ApiClientError> {
        let mut req = self.client.post(format!("{}{}", self.url, path));
        if let Some(body) = body {
            req = req.json(&body);
        }

        let res = req.send().await.map_err(ApiClientError::Network)?;
        Self::decode(res).await
    }
}

#[async_trait]
impl CreditApi for CreditApiClient {
    async fn fetch_alerts(
        &self,
        page: u32,
        size: u32,
        unread_only: bool,
    ) -> Result<Page<Alert>, ApiClientError> {
        self.get_json(&format!(
            "/api/credit-monitoring/alerts?page={}&size={}&unreadOnly={}",
            page, size, unread_only
        ))
        .await
    }

    async fn fetch_statistics(&self) -> Result<AlertStatistics, ApiClientError> {
        self.get_json("/api/credit-monitoring/statistics").await
    }

    async fn mark_read(&self, alert_id: i64) -> Result<Alert, ApiClientError> {
        self.post_json(
            &format!("/api/credit-monitoring/alerts/{}/mark-read", alert_id),
            None,
        )
        .await
    }

    async fn acknowledge(
        &self,
        alert_id: i64,
        notes: Option<&str>,
    ) -> Result<Alert, ApiClientError> {
        self.post_json(
            &format!("/api/credit-monitoring/alerts/{}/acknowledge", alert_id),
            Some(json!({ "notes": notes })),
        )
        .await
    }

    async fn create_monitoring(
        &self,
        req: &CreditMonitoringRequest,
    ) -> Result<CreditMonitoringResponse, ApiClientError> {
        let res = self
            .client
            .post(format!("{}/api/credit-monitoring", self.url))
            .json(req)
            .send()
            .await
            .map_err(ApiClientError::Network)?;

        Self::decode(res).await
    }

    async fn update_monitoring(
        &self,
        id: i64,
        req: &CreditMonitoringRequest,
    ) -> Result<CreditMonitoringResponse, ApiClientError> {
        let res = self
            .client
            .put(format!("{}/api/credit-monitoring/{}", self.url, id))
            .json(req)
            .send()
            .await
            .map_err(ApiClientError::Network)?;

        Self::decode(res).await
    }

    async fn fetch_my_monitoring(
        &self,
        page: u32,
        size: u32,
    ) -> Result<Page<CreditMonitoringResponse>, ApiClientError> {
        self.get_json(&format!(
            "/api/credit-monitoring/my-monitoring?page={}&size={}",
            page, size
        ))
        .await
    }

    async fn deactivate_monitoring(&self, id: i64) -> Result<String, ApiClientError> {
        let res = self
            .client
            .delete(format!("{}/api/credit-monitoring/{}", self.url, id))
            .send()
            .await
            .map_err(ApiClientError::Network)?;

        Self::decode(res).await
    }
}
