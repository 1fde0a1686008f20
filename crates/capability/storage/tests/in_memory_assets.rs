use domain::AssetScope;
use mystrom_storage::{AssetRecord, AssetStore, InMemoryAssetStore};

#[tokio::test]
async fn insert_then_lookup_asset_id() {
    let store = InMemoryAssetStore::new();
    let scope = AssetScope::new(1, "project-1");
    assert!(
        store
            .get_asset_id(&scope, "mystrom_root")
            .await
            .expect("lookup")
            .is_none()
    );

    store
        .insert_asset(&scope, AssetRecord::new(&scope, "mystrom_root", 10, ""))
        .await
        .expect("insert");

    let asset_id = store
        .get_asset_id(&scope, "mystrom_root")
        .await
        .expect("lookup");
    assert_eq!(asset_id, Some(10));
}

#[tokio::test]
async fn lookups_are_scoped_by_configuration_and_project() {
    let store = InMemoryAssetStore::new();
    let scope = AssetScope::new(1, "project-1");
    store
        .insert_asset(&scope, AssetRecord::new(&scope, "mystrom_switch_aa01", 11, "aa01"))
        .await
        .expect("insert");

    let other_project = AssetScope::new(1, "project-2");
    let other_config = AssetScope::new(2, "project-1");
    for scope in [other_project, other_config] {
        let asset_id = store
            .get_asset_id(&scope, "mystrom_switch_aa01")
            .await
            .expect("lookup");
        assert!(asset_id.is_none());
    }
}

#[tokio::test]
async fn insert_same_key_overwrites_without_duplicates() {
    let store = InMemoryAssetStore::new();
    let scope = AssetScope::new(1, "project-1");
    for asset_id in [11, 12] {
        store
            .insert_asset(&scope, AssetRecord::new(&scope, "mystrom_room_r1", asset_id, ""))
            .await
            .expect("insert");
    }
    assert_eq!(store.len(), 1);
    assert_eq!(
        store
            .get_asset_id(&scope, "mystrom_room_r1")
            .await
            .expect("lookup"),
        Some(12)
    );
}

#[tokio::test]
async fn reverse_lookup_returns_configuration_and_device() {
    let store = InMemoryAssetStore::new();
    let scope = AssetScope::new(3, "project-1");
    store
        .insert_asset(&scope, AssetRecord::new(&scope, "mystrom_switch_aa01", 21, "aa01"))
        .await
        .expect("insert");

    let record = store
        .find_by_asset_id(21)
        .await
        .expect("query")
        .expect("record");
    assert_eq!(record.configuration_id, 3);
    assert_eq!(record.provider_id, "aa01");
    assert_eq!(record.scope(), scope);
    assert!(store.find_by_asset_id(99).await.expect("query").is_none());
}

#[tokio::test]
async fn rejects_record_outside_scope() {
    let store = InMemoryAssetStore::new();
    let scope = AssetScope::new(1, "project-1");
    let other = AssetScope::new(1, "project-2");
    let err = store
        .insert_asset(&scope, AssetRecord::new(&other, "mystrom_root", 1, ""))
        .await
        .expect_err("mismatch");
    assert_eq!(err.message(), "asset scope mismatch");

    let empty = AssetScope::new(1, "");
    assert!(store.get_asset_id(&empty, "mystrom_root").await.is_err());
}
