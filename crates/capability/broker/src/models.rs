//! myStrom 云 API 报文。

use serde::Deserialize;

/// v1 设备列表响应。
#[derive(Debug, Clone, Deserialize)]
pub struct DevicesV1Response {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub devices: Vec<DeviceV1>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceV1 {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub device_type: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub power: Option<f64>,
    #[serde(default)]
    pub wifi_switch_temp: Option<f64>,
    #[serde(default)]
    pub room: Option<RoomV1>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoomV1 {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// v2 设备列表响应。
#[derive(Debug, Clone, Deserialize)]
pub struct DevicesV2Response {
    #[serde(default)]
    pub devices: Vec<DeviceV2>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceV2 {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub device_type: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub power: Option<f64>,
    #[serde(default)]
    pub temperature: Option<f64>,
}

/// 仅 WiFi Switch（ws2 / wse）映射为开关资产。
pub fn is_supported_switch(device_type: &str) -> bool {
    device_type.eq_ignore_ascii_case("ws2") || device_type.eq_ignore_ascii_case("wse")
}

/// v1 为 "on"，v2 为 "ON"。
pub fn relay_from_state(state: &str) -> i64 {
    if state.eq_ignore_ascii_case("on") { 1 } else { 0 }
}
