//! 资产身份内存存储实现

use crate::error::StorageError;
use crate::models::AssetRecord;
use crate::traits::AssetStore;
use crate::validation::{ensure_record_scope, ensure_scope};
use domain::{AssetId, AssetScope};
use std::collections::HashMap;
use std::sync::RwLock;

type AssetKey = (i64, String, String);

/// 身份记录内存存储，键为 (configuration_id, project_id, global_asset_id)。
#[derive(Default)]
pub struct InMemoryAssetStore {
    assets: RwLock<HashMap<AssetKey, AssetRecord>>,
}

impl InMemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前记录数。
    pub fn len(&self) -> usize {
        self.assets.read().map(|map| map.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn key(scope: &AssetScope, global_asset_id: &str) -> AssetKey {
    (
        scope.configuration_id,
        scope.project_id.clone(),
        global_asset_id.to_string(),
    )
}

#[async_trait::async_trait]
impl AssetStore for InMemoryAssetStore {
    async fn get_asset_id(
        &self,
        scope: &AssetScope,
        global_asset_id: &str,
    ) -> Result<Option<AssetId>, StorageError> {
        ensure_scope(scope)?;
        let assets = self
            .assets
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        Ok(assets
            .get(&key(scope, global_asset_id))
            .and_then(|record| record.asset_id))
    }

    async fn insert_asset(
        &self,
        scope: &AssetScope,
        record: AssetRecord,
    ) -> Result<AssetRecord, StorageError> {
        ensure_record_scope(scope, &record)?;
        let mut assets = self
            .assets
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        assets.insert(key(scope, &record.global_asset_id), record.clone());
        Ok(record)
    }

    async fn find_by_asset_id(
        &self,
        asset_id: AssetId,
    ) -> Result<Option<AssetRecord>, StorageError> {
        let assets = self
            .assets
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        Ok(assets
            .values()
            .find(|record| record.asset_id == Some(asset_id))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn poisoned_lock_is_an_error_not_a_miss() {
        let store = InMemoryAssetStore::new();
        let scope = AssetScope::new(1, "project-1");
        store
            .insert_asset(&scope, AssetRecord::new(&scope, "mystrom_root", 10, ""))
            .await
            .expect("insert");
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = store.assets.write();
            panic!("poison");
        }));
        assert!(store.get_asset_id(&scope, "mystrom_root").await.is_err());
        assert!(store.find_by_asset_id(10).await.is_err());
    }
}
