//! myStrom 云 API 接入：设备快照抓取与继电器命令下发。
//!
//! - v1 `GET /api/devices`：带房间信息，受限频影响，每个运行窗口只调用一次，产出设备树
//! - v2 `GET /api/v2/devices`：扁平列表，用于周期轮询与命令后的即时刷新
//! - v2 `POST /api/v2/device/{id}?action=on|off`：继电器命令
//!
//! 所有请求携带 `Auth-Token` 头，超时取自配置的 `request_timeout`，仅接受 HTTP 200。

pub mod client;
pub mod error;
pub mod models;
pub mod tree;

pub use client::HttpBroker;
pub use error::BrokerError;
pub use tree::{build_tree, switches_from_v2};

use async_trait::async_trait;
use domain::{Configuration, DeviceTree, SwitchNode};

/// 厂商设备接口抽象。
#[async_trait]
pub trait DeviceBroker: Send + Sync {
    /// 抓取 v1 设备树（已应用过滤规则）。
    async fn fetch_devices(&self, config: &Configuration) -> Result<DeviceTree, BrokerError>;
    /// 抓取 v2 开关读数（不过滤，未解析的设备由上游跳过）。
    async fn fetch_data(&self, config: &Configuration) -> Result<Vec<SwitchNode>, BrokerError>;
    /// 下发继电器命令：0 关，其余开。
    async fn set_relay(
        &self,
        config: &Configuration,
        device_id: &str,
        value: i64,
    ) -> Result<(), BrokerError>;
}

/// 继电器取值对应的 action 参数。
pub fn relay_action(value: i64) -> &'static str {
    if value == 0 { "off" } else { "on" }
}
