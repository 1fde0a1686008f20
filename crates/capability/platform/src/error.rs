use thiserror::Error;

/// 平台 API 调用错误。
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("unexpected HTTP status {status} from {url}: {body}")]
    Status {
        status: u16,
        url: String,
        body: String,
    },

    #[error("deserialization error: {message}")]
    Deserialization { message: String, body: String },

    #[error("websocket error: {0}")]
    WebSocket(String),
}
