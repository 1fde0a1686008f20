//! 数据模型
//!
//! - AssetRecord：身份记录（配置 + 项目 + 全局标识 → 平台资产 ID）

use domain::{AssetId, AssetScope};

/// 资产身份记录。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRecord {
    pub configuration_id: i64,
    pub project_id: String,
    /// 全局标识（资产类型 + "_" + 本地标识）。
    pub global_asset_id: String,
    /// 平台资产 ID，首次创建成功前为空。
    pub asset_id: Option<AssetId>,
    /// 厂商设备 ID（根与房间为空串）。
    pub provider_id: String,
}

impl AssetRecord {
    pub fn new(
        scope: &AssetScope,
        global_asset_id: impl Into<String>,
        asset_id: AssetId,
        provider_id: impl Into<String>,
    ) -> Self {
        Self {
            configuration_id: scope.configuration_id,
            project_id: scope.project_id.clone(),
            global_asset_id: global_asset_id.into(),
            asset_id: Some(asset_id),
            provider_id: provider_id.into(),
        }
    }

    pub fn scope(&self) -> AssetScope {
        AssetScope::new(self.configuration_id, self.project_id.clone())
    }
}
