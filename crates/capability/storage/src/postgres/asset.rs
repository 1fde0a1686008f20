//! Postgres 资产身份存储实现

use crate::error::StorageError;
use crate::models::AssetRecord;
use crate::traits::AssetStore;
use crate::validation::{ensure_record_scope, ensure_scope};
use domain::{AssetId, AssetScope};
use sqlx::{PgPool, Row};

pub struct PgAssetStore {
    pub pool: PgPool,
}

impl PgAssetStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl AssetStore for PgAssetStore {
    async fn get_asset_id(
        &self,
        scope: &AssetScope,
        global_asset_id: &str,
    ) -> Result<Option<AssetId>, StorageError> {
        ensure_scope(scope)?;
        let row = sqlx::query(
            "select asset_id from mystrom.asset \
             where configuration_id = $1 and project_id = $2 and global_asset_id = $3",
        )
        .bind(scope.configuration_id)
        .bind(&scope.project_id)
        .bind(global_asset_id)
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(row.try_get("asset_id")?)
    }

    async fn insert_asset(
        &self,
        scope: &AssetScope,
        record: AssetRecord,
    ) -> Result<AssetRecord, StorageError> {
        ensure_record_scope(scope, &record)?;
        sqlx::query(
            "insert into mystrom.asset \
             (configuration_id, project_id, global_asset_id, asset_id, provider_id) \
             values ($1, $2, $3, $4, $5) \
             on conflict (configuration_id, project_id, global_asset_id) \
             do update set asset_id = excluded.asset_id, provider_id = excluded.provider_id",
        )
        .bind(record.configuration_id)
        .bind(&record.project_id)
        .bind(&record.global_asset_id)
        .bind(record.asset_id)
        .bind(&record.provider_id)
        .execute(&self.pool)
        .await?;
        Ok(record)
    }

    async fn find_by_asset_id(
        &self,
        asset_id: AssetId,
    ) -> Result<Option<AssetRecord>, StorageError> {
        let row = sqlx::query(
            "select configuration_id, project_id, global_asset_id, asset_id, provider_id \
             from mystrom.asset where asset_id = $1 \
             order by id limit 1",
        )
        .bind(asset_id)
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(AssetRecord {
            configuration_id: row.try_get("configuration_id")?,
            project_id: row.try_get("project_id")?,
            global_asset_id: row.try_get("global_asset_id")?,
            asset_id: row.try_get("asset_id")?,
            provider_id: row.try_get("provider_id")?,
        }))
    }
}
