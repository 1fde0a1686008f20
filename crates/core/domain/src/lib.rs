//! 连接器领域模型：配置、资产作用域与设备节点树。

pub mod node;

pub use node::{
    Asset, AssetIds, DeviceNode, DeviceTree, FunctionalNode, LocationalNode, NodeId, RoomNode,
    RootNode, SwitchNode,
};

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 平台侧资产 ID。
pub type AssetId = i32;

/// 资产类型：开关。
pub const ASSET_TYPE_SWITCH: &str = "mystrom_switch";
/// 资产类型：房间。
pub const ASSET_TYPE_ROOM: &str = "mystrom_room";
/// 资产类型：根资产。
pub const ASSET_TYPE_ROOT: &str = "mystrom_root";

/// 单条过滤规则：字段名 + 正则。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRule {
    pub parameter: String,
    pub regex: String,
}

impl FilterRule {
    pub fn new(parameter: impl Into<String>, regex: impl Into<String>) -> Self {
        Self {
            parameter: parameter.into(),
            regex: regex.into(),
        }
    }
}

/// 过滤规则集：外层为 OR，内层为 AND。空集合表示不过滤。
pub type AssetFilter = Vec<Vec<FilterRule>>;

/// 连接器配置（每个安装实例一份）。
#[derive(Debug, Clone)]
pub struct Configuration {
    pub id: i64,
    /// 厂商云 API 密钥。
    pub api_key: String,
    /// 单个 worker 的运行窗口（秒）。
    pub refresh_interval: u64,
    /// 数据轮询周期（秒）。
    pub data_poll_interval: u64,
    /// 单次远程调用超时（秒）。
    pub request_timeout: u64,
    pub asset_filter: AssetFilter,
    pub enable: bool,
    pub active: bool,
    pub project_ids: Vec<String>,
}

impl Configuration {
    pub fn refresh_window(&self) -> Duration {
        Duration::from_secs(self.refresh_interval)
    }

    pub fn poll_period(&self) -> Duration {
        Duration::from_secs(self.data_poll_interval.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout.max(1))
    }
}

impl Default for Configuration {
    /// 与数据库列默认值一致。
    fn default() -> Self {
        Self {
            id: 0,
            api_key: String::new(),
            refresh_interval: 60,
            data_poll_interval: 10,
            request_timeout: 120,
            asset_filter: Vec::new(),
            enable: true,
            active: false,
            project_ids: Vec::new(),
        }
    }
}

/// 资产身份作用域：配置 + 项目。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetScope {
    pub configuration_id: i64,
    pub project_id: String,
}

impl AssetScope {
    pub fn new(configuration_id: i64, project_id: impl Into<String>) -> Self {
        Self {
            configuration_id,
            project_id: project_id.into(),
        }
    }
}
