//! Postgres 配置存储实现

use crate::error::StorageError;
use crate::traits::ConfigurationStore;
use domain::{AssetFilter, Configuration};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

const SELECT_CONFIGURATION: &str = "select id, api_key, refresh_interval, data_poll_interval, \
     request_timeout, asset_filter::text as asset_filter, enable, active, project_ids \
     from mystrom.configuration";

pub struct PgConfigurationStore {
    pub pool: PgPool,
}

impl PgConfigurationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn seconds(row: &PgRow, column: &str) -> Result<u64, StorageError> {
    let value: i32 = row.try_get(column)?;
    u64::try_from(value).map_err(|_| StorageError::new(format!("{column} must not be negative")))
}

fn config_from_row(row: &PgRow) -> Result<Configuration, StorageError> {
    let asset_filter: Option<String> = row.try_get("asset_filter")?;
    let asset_filter: AssetFilter = match asset_filter {
        Some(raw) if !raw.trim().is_empty() && raw.trim() != "null" => serde_json::from_str(&raw)?,
        _ => Vec::new(),
    };
    let project_ids: Option<Vec<String>> = row.try_get("project_ids")?;
    Ok(Configuration {
        id: row.try_get("id")?,
        api_key: row.try_get("api_key")?,
        refresh_interval: seconds(row, "refresh_interval")?,
        data_poll_interval: seconds(row, "data_poll_interval")?,
        request_timeout: seconds(row, "request_timeout")?,
        asset_filter,
        enable: row.try_get("enable")?,
        active: row.try_get("active")?,
        project_ids: project_ids.unwrap_or_default(),
    })
}

#[async_trait::async_trait]
impl ConfigurationStore for PgConfigurationStore {
    async fn list_configs(&self) -> Result<Vec<Configuration>, StorageError> {
        let rows = sqlx::query(&format!("{SELECT_CONFIGURATION} order by id"))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(config_from_row).collect()
    }

    async fn find_config(
        &self,
        configuration_id: i64,
    ) -> Result<Option<Configuration>, StorageError> {
        let row = sqlx::query(&format!("{SELECT_CONFIGURATION} where id = $1"))
            .bind(configuration_id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(config_from_row(&row)?))
    }

    async fn set_config_active(
        &self,
        configuration_id: i64,
        active: bool,
    ) -> Result<bool, StorageError> {
        let result = sqlx::query("update mystrom.configuration set active = $2 where id = $1")
            .bind(configuration_id)
            .bind(active)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
