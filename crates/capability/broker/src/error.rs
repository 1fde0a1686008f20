use mystrom_filter::FilterError;
use thiserror::Error;

/// 厂商 API 调用错误。
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    /// v1 响应体中的 `status` 不是 "ok"。
    #[error("vendor API reported status {0:?}")]
    Api(String),

    #[error("deserialization error: {message}")]
    Deserialization { message: String, body: String },

    #[error("asset filter error: {0}")]
    Filter(#[from] FilterError),
}
