use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Deserializer};
use std::fs;
use std::path::Path;

/// Настройки приложения из options.json.
#[derive(Deserialize, Debug, Clone)]
pub struct AppOptions {
    pub bot_token: String,

    /// ID владельца бота. Может прийти как число или как строка в кавычках.
    #[serde(deserialize_with = "flexible_u64")]
    pub root_user: u64,

    /// Размер страницы списков (серверная пагинация).
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Интервал опроса новых алертов, сек.
    #[serde(default = "default_poll_interval")]
    pub alert_poll_interval_s: u64,
}

fn default_page_size() -> u32 {
    10
}

fn default_poll_interval() -> u64 {
    60
}

impl AppOptions {
    /// Загружает и валидирует файл конфигурации.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        ensure!(path.exists(), "Configuration file not found: {:?}", path);

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read options file: {:?}", path))?;

        let options: AppOptions = serde_json::from_str(&content)
            .context("JSON schema mismatch in options file")?;

        // Бизнес-валидация
        ensure!(!options.bot_token.is_empty(), "bot_token cannot be empty");
        ensure!(options.root_user != 0, "root_user must be a valid Telegram ID");
        ensure!(options.page_size > 0, "page_size must be positive");

        Ok(options)
    }
}

/// Гибкий десериализатор для u64.
/// Поддерживает форматы: 12345 и "12345".
fn flexible_u64<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrInt {
        Str(String),
        Int(u64),
    }

    match StringOrInt::deserialize(deserializer)? {
        StringOrInt::Int(i) => Ok(i),
        StringOrInt::Str(s) => s.parse::<u64>().map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_user_accepts_string_and_int() {
        let raw = r#"{"bot_token": "t", "root_user": "219791289"}"#;
        let opts: AppOptions = serde_json::from_str(raw).unwrap();
        assert_eq!(opts.root_user, 219791289);
        assert_eq!(opts.page_size, 10);
        assert_eq!(opts.alert_poll_interval_s, 60);

        let raw = r#"{"bot_token": "t", "root_user": 42, "page_size": 25}"#;
        let opts: AppOptions = serde_json::from_str(raw).unwrap();
        assert_eq!(opts.root_user, 42);
        assert_eq!(opts.page_size, 25);
    }
}
