//! 验证辅助函数
//!
//! - ensure_scope：校验配置 ID 与项目 ID
//! - ensure_record_scope：校验记录与作用域一致

use crate::error::StorageError;
use crate::models::AssetRecord;
use domain::AssetScope;

/// 校验资产作用域。
pub fn ensure_scope(scope: &AssetScope) -> Result<(), StorageError> {
    if scope.configuration_id <= 0 {
        return Err(StorageError::new("configuration_id required"));
    }
    if scope.project_id.is_empty() {
        return Err(StorageError::new("project_id required"));
    }
    Ok(())
}

/// 校验身份记录属于该作用域且全局标识非空。
pub fn ensure_record_scope(scope: &AssetScope, record: &AssetRecord) -> Result<(), StorageError> {
    ensure_scope(scope)?;
    if record.configuration_id != scope.configuration_id || record.project_id != scope.project_id {
        return Err(StorageError::new("asset scope mismatch"));
    }
    if record.global_asset_id.is_empty() {
        return Err(StorageError::new("global_asset_id required"));
    }
    Ok(())
}
