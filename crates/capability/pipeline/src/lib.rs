//! 开关读数写入平台。
//!
//! 每个项目、每个开关：优先使用本周期对账缓存在节点上的资产 ID，否则查身份存储；
//! 仍未解析（被过滤或尚未创建）则跳过。每个开关写两个数据点：
//! `input`（power、temperature）与 `output`（relay），均带连接器的客户端标识。

use chrono::{DateTime, Utc};
use domain::{Asset, AssetId, AssetScope, Configuration, SwitchNode};
use mystrom_platform::{AssetData, CLIENT_REFERENCE, DataSink, DataSubtype, PlatformError};
use mystrom_storage::{AssetStore, StorageError};
use mystrom_telemetry::{record_data_point_skipped, record_data_point_written};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tracing::debug;

/// 数据写入错误。
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("data sink error: {0}")]
    Sink(#[from] PlatformError),
    #[error("data sink timed out for asset {0}")]
    Timeout(AssetId),
}

/// 一次写入的统计。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertReport {
    pub written: usize,
    pub skipped: usize,
}

/// 开关读数写入器。
#[derive(Clone)]
pub struct DataUpserter {
    assets: Arc<dyn AssetStore>,
    sink: Arc<dyn DataSink>,
}

impl DataUpserter {
    pub fn new(assets: Arc<dyn AssetStore>, sink: Arc<dyn DataSink>) -> Self {
        Self { assets, sink }
    }

    /// 写入配置下所有项目的开关读数。首个写入错误即中止。
    pub async fn upsert_switches(
        &self,
        config: &Configuration,
        switches: &[SwitchNode],
    ) -> Result<UpsertReport, PipelineError> {
        let timestamp = Utc::now();
        let mut report = UpsertReport::default();
        for project_id in &config.project_ids {
            let scope = AssetScope::new(config.id, project_id.clone());
            for switch in switches {
                let Some(asset_id) = self.resolve(&scope, switch).await? else {
                    debug!(
                        target: "mystrom.pipeline",
                        config_id = config.id,
                        project_id = %project_id,
                        device_id = %switch.id,
                        "switch_data_skipped"
                    );
                    record_data_point_skipped();
                    report.skipped += 1;
                    continue;
                };
                for data in switch_data(asset_id, switch, timestamp) {
                    let written =
                        tokio::time::timeout(config.request_timeout(), self.sink.upsert_data(&data))
                            .await
                            .map_err(|_| PipelineError::Timeout(asset_id))??;
                    if written {
                        record_data_point_written();
                        report.written += 1;
                    } else {
                        debug!(
                            target: "mystrom.pipeline",
                            asset_id,
                            "asset_missing_on_platform"
                        );
                        record_data_point_skipped();
                        report.skipped += 1;
                    }
                }
            }
        }
        Ok(report)
    }

    async fn resolve(
        &self,
        scope: &AssetScope,
        switch: &SwitchNode,
    ) -> Result<Option<AssetId>, PipelineError> {
        if let Some(asset_id) = switch.asset_ids.get(&scope.project_id) {
            return Ok(Some(asset_id));
        }
        Ok(self
            .assets
            .get_asset_id(scope, &switch.global_identifier())
            .await?)
    }
}

/// 构造开关的 input / output 数据点。
pub fn switch_data(
    asset_id: AssetId,
    switch: &SwitchNode,
    timestamp: DateTime<Utc>,
) -> [AssetData; 2] {
    let point = |subtype, data: Map<String, Value>| AssetData {
        asset_id,
        subtype,
        timestamp,
        data,
        client_reference: CLIENT_REFERENCE.to_string(),
    };
    [
        point(
            DataSubtype::Input,
            Map::from_iter([
                ("power".to_string(), json!(switch.power)),
                ("temperature".to_string(), json!(switch.temperature)),
            ]),
        ),
        point(
            DataSubtype::Output,
            Map::from_iter([("relay".to_string(), json!(switch.relay))]),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_keep_their_source() {
        let err = PipelineError::from(StorageError::new("connection reset"));
        assert!(matches!(err, PipelineError::Storage(_)));
        let source = std::error::Error::source(&err).map(|source| source.to_string());
        assert_eq!(source.as_deref(), Some("connection reset"));
    }

    #[test]
    fn switch_data_splits_input_and_output() {
        let switch = SwitchNode {
            power: 7.5,
            temperature: 22.0,
            relay: 1,
            ..SwitchNode::new("aa01", "Kettle")
        };
        let [input, output] = switch_data(3, &switch, Utc::now());
        assert_eq!(input.subtype, DataSubtype::Input);
        assert_eq!(input.data["power"], 7.5);
        assert_eq!(input.data["temperature"], 22.0);
        assert!(!input.data.contains_key("relay"));
        assert_eq!(output.subtype, DataSubtype::Output);
        assert_eq!(output.data["relay"], 1);
        assert_eq!(output.client_reference, CLIENT_REFERENCE);
    }
}
