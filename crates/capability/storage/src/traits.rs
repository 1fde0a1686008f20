//! 存储接口定义
//!
//! - ConfigurationStore：连接器配置读取与 active 标记维护
//! - AssetStore：资产身份记录（正向查询、写入、按平台资产 ID 反查）
//!
//! 实现需支持并发访问（`Send + Sync`），并发控制由存储层负责。

use crate::error::StorageError;
use crate::models::AssetRecord;
use async_trait::async_trait;
use domain::{AssetId, AssetScope, Configuration};

#[async_trait]
pub trait ConfigurationStore: Send + Sync {
    /// 列出全部配置。
    async fn list_configs(&self) -> Result<Vec<Configuration>, StorageError>;
    /// 按 ID 查询配置。
    async fn find_config(&self, configuration_id: i64)
    -> Result<Option<Configuration>, StorageError>;
    /// 设置 active 标记，返回是否命中。
    async fn set_config_active(
        &self,
        configuration_id: i64,
        active: bool,
    ) -> Result<bool, StorageError>;
}

#[async_trait]
pub trait AssetStore: Send + Sync {
    /// 按全局标识查询平台资产 ID。
    async fn get_asset_id(
        &self,
        scope: &AssetScope,
        global_asset_id: &str,
    ) -> Result<Option<AssetId>, StorageError>;
    /// 写入身份记录；同键已存在时覆盖资产 ID。
    async fn insert_asset(
        &self,
        scope: &AssetScope,
        record: AssetRecord,
    ) -> Result<AssetRecord, StorageError>;
    /// 按平台资产 ID 反查身份记录。
    async fn find_by_asset_id(&self, asset_id: AssetId)
    -> Result<Option<AssetRecord>, StorageError>;
}
