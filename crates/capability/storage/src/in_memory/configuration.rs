//! 配置内存存储实现

use crate::error::StorageError;
use crate::traits::ConfigurationStore;
use domain::Configuration;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// 配置内存存储，按 ID 有序。
#[derive(Default)]
pub struct InMemoryConfigurationStore {
    configs: RwLock<BTreeMap<i64, Configuration>>,
}

impl InMemoryConfigurationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_configs(configs: Vec<Configuration>) -> Self {
        let configs = configs.into_iter().map(|config| (config.id, config)).collect();
        Self {
            configs: RwLock::new(configs),
        }
    }
}

#[async_trait::async_trait]
impl ConfigurationStore for InMemoryConfigurationStore {
    async fn list_configs(&self) -> Result<Vec<Configuration>, StorageError> {
        let configs = self
            .configs
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        Ok(configs.values().cloned().collect())
    }

    async fn find_config(
        &self,
        configuration_id: i64,
    ) -> Result<Option<Configuration>, StorageError> {
        let configs = self
            .configs
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        Ok(configs.get(&configuration_id).cloned())
    }

    async fn set_config_active(
        &self,
        configuration_id: i64,
        active: bool,
    ) -> Result<bool, StorageError> {
        let mut configs = self
            .configs
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        let Some(config) = configs.get_mut(&configuration_id) else {
            return Ok(false);
        };
        config.active = active;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn poisoned_lock_is_an_error_not_an_empty_list() {
        let store = InMemoryConfigurationStore::with_configs(vec![Configuration {
            id: 1,
            ..Configuration::default()
        }]);
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = store.configs.write();
            panic!("poison");
        }));
        assert!(store.list_configs().await.is_err());
        assert!(store.find_config(1).await.is_err());
    }
}
