//! 连接器进程配置加载。

use std::env;
use std::time::Duration;

/// 厂商云 API 默认地址。
pub const DEFAULT_VENDOR_URL: &str = "https://mystrom.ch";

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env: {0}")]
    Missing(String),
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// 进程运行配置。
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http_addr: String,
    /// 为空时使用内存存储。
    pub database_url: Option<String>,
    pub platform_url: String,
    pub platform_token: String,
    pub vendor_url: String,
    pub scan_interval_seconds: u64,
    pub listener_retry_seconds: u64,
    pub notify_new_assets: bool,
}

impl AppConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        let platform_url = read_required("MYSTROM_PLATFORM_URL")?;
        let platform_token = read_required("MYSTROM_PLATFORM_TOKEN")?;
        let database_url = read_optional("MYSTROM_DATABASE_URL");
        let vendor_url =
            read_optional("MYSTROM_VENDOR_URL").unwrap_or_else(|| DEFAULT_VENDOR_URL.to_string());
        let http_addr =
            env::var("MYSTROM_HTTP_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".to_string());
        let scan_interval_seconds = read_u64_with_default("MYSTROM_SCAN_INTERVAL_SECONDS", 1)?;
        let listener_retry_seconds = read_u64_with_default("MYSTROM_LISTENER_RETRY_SECONDS", 5)?;
        let notify_new_assets = read_bool_with_default("MYSTROM_NOTIFY_NEW_ASSETS", true);

        if scan_interval_seconds == 0 {
            return Err(ConfigError::Invalid(
                "MYSTROM_SCAN_INTERVAL_SECONDS".to_string(),
                "0".to_string(),
            ));
        }

        Ok(Self {
            http_addr,
            database_url,
            platform_url,
            platform_token,
            vendor_url,
            scan_interval_seconds,
            listener_retry_seconds,
            notify_new_assets,
        })
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_seconds)
    }

    pub fn listener_retry(&self) -> Duration {
        Duration::from_secs(self.listener_retry_seconds)
    }
}

fn read_required(key: &str) -> Result<String, ConfigError> {
    read_optional(key).ok_or_else(|| ConfigError::Missing(key.to_string()))
}

fn read_u64_with_default(key: &str, default: u64) -> Result<u64, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u64>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_optional(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}

fn read_bool_with_default(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "on"),
        Err(_) => default,
    }
}
