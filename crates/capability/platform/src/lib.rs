//! 楼宇管理平台接入：资产注册、数据写入、用户通知与输出变更事件流。
//!
//! 平台 HTTP API 以 `X-API-Key` 头鉴权：
//! - `PUT {api}/assets`：按 (项目, 全局标识) 幂等 upsert 资产，返回资产 ID
//! - `PUT {api}/data`：写入资产数据点
//! - `GET {api}/users` + `POST {api}/notifications`：用户通知
//! - `{api}/data-listener?dataSubtype=output`（WebSocket）：输出属性变更事件

pub mod client;
pub mod error;
pub mod listener;
pub mod models;

pub use client::HttpPlatform;
pub use error::PlatformError;
pub use listener::WebSocketSource;
pub use models::{AssetData, AssetDraft, DataSubtype, OutputEvent, Translation};

use async_trait::async_trait;
use domain::AssetId;
use tokio::sync::mpsc;

/// 本连接器写入平台时附带的客户端标识，用于识别并丢弃自身写入的回声事件。
pub const CLIENT_REFERENCE: &str = "myStrom-app";

/// 远程资产注册表。
#[async_trait]
pub trait AssetRegistry: Send + Sync {
    /// 创建或更新资产，返回平台分配的 ID（可能缺失）。
    async fn upsert_asset(&self, draft: &AssetDraft) -> Result<Option<AssetId>, PlatformError>;
}

/// 资产数据写入。
#[async_trait]
pub trait DataSink: Send + Sync {
    /// 写入数据点；资产已不存在时返回 false。
    async fn upsert_data(&self, data: &AssetData) -> Result<bool, PlatformError>;
}

/// 用户通知。
#[async_trait]
pub trait Notifier: Send + Sync {
    /// 向项目的全部用户发送消息，返回发送数量。
    async fn notify_users(
        &self,
        project_id: &str,
        message: &Translation,
    ) -> Result<usize, PlatformError>;
}

/// 输出变更事件源。
#[async_trait]
pub trait OutputChangeSource: Send + Sync {
    /// 建立一次连接；连接断开时通道关闭，由调用方负责重连。
    async fn listen(&self) -> Result<mpsc::Receiver<OutputEvent>, PlatformError>;
}

/// 新建资产通知文案。
pub fn new_assets_message(count: usize) -> Translation {
    Translation {
        de: format!(
            "Die kontinuierliche Asset-Erstellung für myStrom hat {count} neue Assets hinzugefügt. \
             Diese sind nun im Asset-Management verfügbar."
        ),
        en: format!(
            "The Continuous Asset Creation for myStrom added {count} new assets. \
             They are now available in Asset Management."
        ),
    }
}
