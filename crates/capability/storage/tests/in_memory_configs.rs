use domain::Configuration;
use mystrom_storage::{ConfigurationStore, InMemoryConfigurationStore};

fn config(id: i64) -> Configuration {
    Configuration {
        id,
        api_key: format!("key-{id}"),
        project_ids: vec!["project-1".to_string()],
        ..Configuration::default()
    }
}

#[tokio::test]
async fn list_configs_in_id_order() {
    let store = InMemoryConfigurationStore::with_configs(vec![config(2), config(1)]);
    let ids: Vec<i64> = store
        .list_configs()
        .await
        .expect("list")
        .iter()
        .map(|config| config.id)
        .collect();
    assert_eq!(ids, vec![1, 2]);
}

#[tokio::test]
async fn set_active_updates_flag() {
    let store = InMemoryConfigurationStore::with_configs(vec![config(1)]);
    assert!(store.set_config_active(1, true).await.expect("update"));
    let found = store.find_config(1).await.expect("find").expect("config");
    assert!(found.active);

    assert!(!store.set_config_active(9, true).await.expect("update"));
    assert!(store.find_config(9).await.expect("find").is_none());
}
