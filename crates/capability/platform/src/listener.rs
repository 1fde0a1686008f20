//! 输出变更事件流（WebSocket）。
//!
//! 每次 `listen` 建立一条连接并启动读取任务，解析后的事件经 mpsc 通道交给调用方。
//! 连接关闭或出错时读取任务退出、通道关闭；重连策略由调用方决定。

use crate::client::normalize_base;
use crate::error::PlatformError;
use crate::models::OutputEvent;
use crate::OutputChangeSource;
use async_trait::async_trait;
use futures_util::StreamExt;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{self, ClientRequestBuilder};
use url::Url;

const EVENT_CHANNEL_CAPACITY: usize = 256;
/// 建立连接（含握手）的默认超时。
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// 平台 `data-listener` WebSocket 事件源。
pub struct WebSocketSource {
    url: Url,
    api_token: String,
    connect_timeout: Duration,
}

impl WebSocketSource {
    /// 由平台 HTTP 基地址推导 ws/wss 地址。
    pub fn new(platform_url: &str, api_token: impl Into<String>) -> Result<Self, PlatformError> {
        let mut url = normalize_base(platform_url)?.join("data-listener")?;
        let scheme = match url.scheme() {
            "https" | "wss" => "wss",
            _ => "ws",
        };
        url.set_scheme(scheme)
            .map_err(|_| PlatformError::WebSocket(format!("unsupported scheme in {platform_url}")))?;
        url.query_pairs_mut().append_pair("dataSubtype", "output");
        Ok(Self {
            url,
            api_token: api_token.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        })
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl OutputChangeSource for WebSocketSource {
    async fn listen(&self) -> Result<mpsc::Receiver<OutputEvent>, PlatformError> {
        tracing::info!(target: "mystrom.platform", url = %self.url, "output_listener_connecting");

        let uri: tungstenite::http::Uri = self
            .url
            .as_str()
            .parse()
            .map_err(|err: tungstenite::http::uri::InvalidUri| {
                PlatformError::WebSocket(err.to_string())
            })?;
        let request = ClientRequestBuilder::new(uri).with_header("X-API-Key", &self.api_token);
        let (ws_stream, _response) =
            tokio::time::timeout(self.connect_timeout, tokio_tungstenite::connect_async(request))
                .await
                .map_err(|_| {
                    PlatformError::WebSocket(format!(
                        "connect timed out after {:?}",
                        self.connect_timeout
                    ))
                })?
                .map_err(|err| PlatformError::WebSocket(err.to_string()))?;

        tracing::info!(target: "mystrom.platform", "output_listener_connected");

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (_write, mut read) = ws_stream.split();
        tokio::spawn(async move {
            while let Some(frame) = read.next().await {
                match frame {
                    Ok(tungstenite::Message::Text(text)) => {
                        let Some(event) = parse_event(&text) else {
                            continue;
                        };
                        if tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Ok(tungstenite::Message::Close(frame)) => {
                        tracing::info!(
                            target: "mystrom.platform",
                            reason = %frame.as_ref().map(|f| f.reason.to_string()).unwrap_or_default(),
                            "output_listener_closed"
                        );
                        break;
                    }
                    Ok(_) => {}
                    Err(err) => {
                        tracing::warn!(target: "mystrom.platform", error = %err, "output_listener_error");
                        break;
                    }
                }
            }
        });
        Ok(rx)
    }
}

/// 解析单个文本帧；无法识别的帧记录后丢弃。
pub fn parse_event(text: &str) -> Option<OutputEvent> {
    match serde_json::from_str::<OutputEvent>(text) {
        Ok(event) => Some(event),
        Err(err) => {
            tracing::debug!(target: "mystrom.platform", error = %err, "output_event_unparsed");
            None
        }
    }
}
