//! 平台 API 报文。

use chrono::{DateTime, Utc};
use domain::AssetId;
use serde::{Deserialize, Serialize};

/// 资产 upsert 请求。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetDraft {
    pub project_id: String,
    pub global_asset_identifier: String,
    pub name: String,
    pub asset_type: String,
    pub description: String,
    pub parent_locational_asset_id: Option<AssetId>,
    pub parent_functional_asset_id: Option<AssetId>,
    pub is_tracker: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AssetResponse {
    #[serde(default)]
    pub id: Option<AssetId>,
}

/// 数据子类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSubtype {
    Input,
    Output,
}

/// 资产数据点。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetData {
    pub asset_id: AssetId,
    pub subtype: DataSubtype,
    pub timestamp: DateTime<Utc>,
    pub data: serde_json::Map<String, serde_json::Value>,
    pub client_reference: String,
}

/// 平台推送的属性变更事件。
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputEvent {
    pub asset_id: AssetId,
    #[serde(default)]
    pub subtype: Option<DataSubtype>,
    #[serde(default)]
    pub client_reference: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// 双语消息。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Translation {
    pub de: String,
    pub en: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NotificationRequest<'a> {
    pub user: &'a str,
    pub project_id: &'a str,
    pub message: &'a Translation,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserResponse {
    #[serde(default)]
    pub email: String,
}
