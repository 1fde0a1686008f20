//! 输出命令链路：平台属性变更 → 厂商继电器命令。
//!
//! 处理单个事件：
//! 1. 客户端标识为本连接器的事件是自身写入的回声，直接丢弃
//! 2. 按平台资产 ID 反查身份记录，得到配置与厂商设备 ID
//! 3. 从事件数据中提取 `relay`（数字或十进制整数字符串）
//! 4. 下发厂商命令，随后立即刷新该设备的读数

use domain::{ASSET_TYPE_SWITCH, AssetId, Configuration};
use mystrom_broker::{BrokerError, DeviceBroker};
use mystrom_pipeline::{DataUpserter, PipelineError};
use mystrom_platform::{CLIENT_REFERENCE, OutputChangeSource, OutputEvent};
use mystrom_storage::{AssetRecord, AssetStore, ConfigurationStore, StorageError};
use mystrom_telemetry::{
    record_command_failure, record_command_sent, record_listener_reconnect,
    record_output_echo_ignored, record_output_event,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// 控制链路错误。
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("unknown asset: {0}")]
    UnknownAsset(AssetId),
    #[error("unknown configuration: {0}")]
    UnknownConfiguration(i64),
    #[error("payload error: {0}")]
    Payload(String),
    #[error("dispatch error: {0}")]
    Dispatch(#[from] BrokerError),
}

/// 单个事件的处理结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// 自身写入的回声。
    EchoIgnored,
    Dispatched {
        configuration_id: i64,
        device_id: String,
        value: i64,
        /// 命令后刷新是否成功。
        refreshed: bool,
    },
}

/// 输出事件分发器。
#[derive(Clone)]
pub struct OutputDispatcher {
    assets: Arc<dyn AssetStore>,
    configs: Arc<dyn ConfigurationStore>,
    broker: Arc<dyn DeviceBroker>,
    upserter: DataUpserter,
}

impl OutputDispatcher {
    pub fn new(
        assets: Arc<dyn AssetStore>,
        configs: Arc<dyn ConfigurationStore>,
        broker: Arc<dyn DeviceBroker>,
        upserter: DataUpserter,
    ) -> Self {
        Self {
            assets,
            configs,
            broker,
            upserter,
        }
    }

    pub async fn handle(&self, event: &OutputEvent) -> Result<DispatchOutcome, ControlError> {
        record_output_event();
        if event.client_reference.as_deref() == Some(CLIENT_REFERENCE) {
            record_output_echo_ignored();
            debug!(target: "mystrom.control", asset_id = event.asset_id, "output_echo_ignored");
            return Ok(DispatchOutcome::EchoIgnored);
        }

        let record = self
            .assets
            .find_by_asset_id(event.asset_id)
            .await?
            .ok_or(ControlError::UnknownAsset(event.asset_id))?;
        // 根与房间没有厂商设备，不能下发命令
        if !is_switch_record(&record) {
            return Err(ControlError::UnknownAsset(event.asset_id));
        }
        let config = self
            .configs
            .find_config(record.configuration_id)
            .await?
            .ok_or(ControlError::UnknownConfiguration(record.configuration_id))?;
        let value = extract_relay(&event.data)?;

        if let Err(err) = self
            .broker
            .set_relay(&config, &record.provider_id, value)
            .await
        {
            record_command_failure();
            return Err(err.into());
        }
        record_command_sent();
        info!(
            target: "mystrom.control",
            config_id = config.id,
            asset_id = event.asset_id,
            device_id = %record.provider_id,
            value,
            "relay_command_sent"
        );

        let refreshed = match self.refresh_device(&config, &record.provider_id).await {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    target: "mystrom.control",
                    config_id = config.id,
                    device_id = %record.provider_id,
                    error = %err,
                    "device_refresh_failed"
                );
                false
            }
        };

        Ok(DispatchOutcome::Dispatched {
            configuration_id: config.id,
            device_id: record.provider_id,
            value,
            refreshed,
        })
    }

    /// 命令后的即时刷新，仅写入该设备。
    async fn refresh_device(
        &self,
        config: &Configuration,
        device_id: &str,
    ) -> Result<(), RefreshError> {
        let switches = self.broker.fetch_data(config).await?;
        let switches: Vec<_> = switches
            .into_iter()
            .filter(|switch| switch.id == device_id)
            .collect();
        self.upserter.upsert_switches(config, &switches).await?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
enum RefreshError {
    #[error(transparent)]
    Broker(#[from] BrokerError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

fn is_switch_record(record: &AssetRecord) -> bool {
    !record.provider_id.is_empty()
        && record
            .global_asset_id
            .strip_prefix(ASSET_TYPE_SWITCH)
            .is_some_and(|rest| rest.starts_with('_'))
}

/// 提取 `relay`：数字取整（截断），字符串按十进制整数解析，其余类型报错。
pub fn extract_relay(data: &Value) -> Result<i64, ControlError> {
    let relay = data
        .get("relay")
        .ok_or_else(|| ControlError::Payload("relay missing".to_string()))?;
    match relay {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|value| value.trunc() as i64))
            .ok_or_else(|| ControlError::Payload(format!("relay out of range: {number}"))),
        Value::String(text) => text
            .parse::<i64>()
            .map_err(|_| ControlError::Payload(format!("relay not an integer: {text:?}"))),
        other => Err(ControlError::Payload(format!(
            "relay has unsupported type: {other}"
        ))),
    }
}

/// 启动输出事件监听：连接断开或失败后等待 `retry` 再重连，永不退出。
pub fn spawn_output_listener(
    source: Arc<dyn OutputChangeSource>,
    dispatcher: OutputDispatcher,
    retry: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match source.listen().await {
                Ok(mut events) => {
                    while let Some(event) = events.recv().await {
                        if let Err(err) = dispatcher.handle(&event).await {
                            warn!(
                                target: "mystrom.control",
                                asset_id = event.asset_id,
                                error = %err,
                                "output_event_dropped"
                            );
                        }
                    }
                    warn!(target: "mystrom.control", "output_stream_ended");
                }
                Err(err) => {
                    warn!(target: "mystrom.control", error = %err, "output_stream_connect_failed");
                }
            }
            record_listener_reconnect();
            tokio::time::sleep(retry).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn storage_errors_keep_their_source() {
        let err = ControlError::from(StorageError::new("connection reset"));
        assert!(matches!(err, ControlError::Storage(_)));
        let source = std::error::Error::source(&err).map(|source| source.to_string());
        assert_eq!(source.as_deref(), Some("connection reset"));
    }

    #[test]
    fn relay_accepts_numbers_and_integer_strings() {
        assert_eq!(extract_relay(&json!({ "relay": 1 })).expect("int"), 1);
        assert_eq!(extract_relay(&json!({ "relay": 1.0 })).expect("float"), 1);
        assert_eq!(extract_relay(&json!({ "relay": 0.9 })).expect("trunc"), 0);
        assert_eq!(extract_relay(&json!({ "relay": "1" })).expect("string"), 1);
        assert_eq!(extract_relay(&json!({ "relay": "-3" })).expect("negative"), -3);
    }

    #[test]
    fn relay_rejects_other_shapes() {
        for data in [
            json!({ "relay": "abc" }),
            json!({ "relay": "1.0" }),
            json!({ "relay": true }),
            json!({ "relay": null }),
            json!({ "relay": [1] }),
            json!({ "power": 1 }),
            json!(null),
        ] {
            let err = extract_relay(&data).expect_err("invalid");
            assert!(matches!(err, ControlError::Payload(_)), "{data}");
        }
    }
}
