// 平台 HTTP 客户端集成测试（wiremock）。

use chrono::{TimeZone, Utc};
use mystrom_platform::{
    AssetData, AssetDraft, AssetRegistry, CLIENT_REFERENCE, DataSink, DataSubtype, HttpPlatform,
    Notifier, PlatformError, new_assets_message,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn setup() -> (MockServer, HttpPlatform) {
    let server = MockServer::start().await;
    let platform = HttpPlatform::new(&format!("{}/v2", server.uri()), "token").expect("client");
    (server, platform)
}

fn draft() -> AssetDraft {
    AssetDraft {
        project_id: "project-1".to_string(),
        global_asset_identifier: "mystrom_switch_aa01".to_string(),
        name: "Kettle".to_string(),
        asset_type: "mystrom_switch".to_string(),
        description: "Kettle (aa01)".to_string(),
        parent_locational_asset_id: Some(2),
        parent_functional_asset_id: Some(1),
        is_tracker: false,
    }
}

#[tokio::test]
async fn upsert_asset_sends_camel_case_body() {
    let (server, platform) = setup().await;
    Mock::given(method("PUT"))
        .and(path("/v2/assets"))
        .and(header("X-API-Key", "token"))
        .and(body_partial_json(json!({
            "projectId": "project-1",
            "globalAssetIdentifier": "mystrom_switch_aa01",
            "assetType": "mystrom_switch",
            "parentLocationalAssetId": 2,
            "parentFunctionalAssetId": 1,
            "isTracker": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 42 })))
        .expect(1)
        .mount(&server)
        .await;

    let asset_id = platform.upsert_asset(&draft()).await.expect("upsert");
    assert_eq!(asset_id, Some(42));
}

#[tokio::test]
async fn upsert_asset_without_id_returns_none() {
    let (server, platform) = setup().await;
    Mock::given(method("PUT"))
        .and(path("/v2/assets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "Kettle" })))
        .mount(&server)
        .await;

    assert_eq!(platform.upsert_asset(&draft()).await.expect("upsert"), None);
}

#[tokio::test]
async fn upsert_asset_error_status() {
    let (server, platform) = setup().await;
    Mock::given(method("PUT"))
        .and(path("/v2/assets"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = platform.upsert_asset(&draft()).await.expect_err("status");
    assert!(matches!(err, PlatformError::Status { status: 500, ref body, .. } if body == "boom"));
}

#[tokio::test]
async fn upsert_data_reports_missing_asset() {
    let (server, platform) = setup().await;
    Mock::given(method("PUT"))
        .and(path("/v2/data"))
        .and(body_partial_json(json!({
            "assetId": 42,
            "subtype": "input",
            "clientReference": CLIENT_REFERENCE,
            "data": { "power": 12.5 }
        })))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/v2/data"))
        .and(body_partial_json(json!({ "assetId": 99 })))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let mut data = AssetData {
        asset_id: 42,
        subtype: DataSubtype::Input,
        timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
        data: serde_json::Map::from_iter([("power".to_string(), json!(12.5))]),
        client_reference: CLIENT_REFERENCE.to_string(),
    };
    assert!(platform.upsert_data(&data).await.expect("written"));

    data.asset_id = 99;
    assert!(!platform.upsert_data(&data).await.expect("missing"));
}

#[tokio::test]
async fn notify_users_posts_one_notification_per_user() {
    let (server, platform) = setup().await;
    Mock::given(method("GET"))
        .and(path("/v2/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "email": "a@example.com" },
            { "email": "b@example.com" },
            { "firstname": "no-mail" }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v2/notifications"))
        .and(body_partial_json(json!({ "projectId": "project-1" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    let sent = platform
        .notify_users("project-1", &new_assets_message(5))
        .await
        .expect("notify");
    assert_eq!(sent, 2);
}

#[test]
fn new_assets_message_mentions_count() {
    let message = new_assets_message(3);
    assert!(message.en.contains("added 3 new assets"));
    assert!(message.de.contains("3 neue Assets"));
}
