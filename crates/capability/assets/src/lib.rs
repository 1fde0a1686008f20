//! # 资产树对账
//!
//! 将一次抓取得到的设备树映射为平台上的资产层级（根 → 房间 → 开关），并保证跨周期的
//! 身份稳定与幂等创建。
//!
//! ## 流程
//!
//! 对每个 (配置, 项目) 分两趟遍历同一棵树：
//!
//! 1. **位置轴**：根不带父节点；子节点的位置父为当前节点 ID，功能父固定为根 ID
//! 2. **功能轴**：根不带父节点；子节点的功能父为当前节点 ID，位置父固定为根 ID
//!
//! 两趟均为先序遍历，每个节点执行一次 `upsert_one`：
//!
//! - 身份存储命中：直接返回已有 ID，不调用平台、不写存储
//! - 未命中：调用平台 upsert，要求返回非空 ID，写入身份存储并缓存到节点
//!
//! 节点在第一趟创建后即写入身份存储，第二趟必然命中，因此每个节点每周期至多一次
//! 远程创建。
//!
//! ## 失败语义
//!
//! 任一平台错误、超时、缺失 ID 或存储错误都会中止该项目的整趟对账，由调用方记录并
//! 在下一周期重试。

use domain::{
    Asset, AssetId, AssetScope, Configuration, DeviceTree, FunctionalNode, LocationalNode, NodeId,
};
use mystrom_platform::{AssetDraft, AssetRegistry, PlatformError};
use mystrom_storage::{AssetRecord, AssetStore, StorageError};
use mystrom_telemetry::{record_asset_created, record_asset_lookup};
use std::sync::Arc;
use tracing::{debug, info};

/// 对账错误。
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("asset registry error: {0}")]
    Registry(#[from] PlatformError),
    #[error("asset registry returned no id for {0}")]
    MissingAssetId(String),
    #[error("asset registry timed out for {0}")]
    Timeout(String),
    #[error("node {0} not in tree")]
    UnknownNode(usize),
}

/// 遍历轴。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Locational,
    Functional,
}

/// 单节点 upsert 结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub asset_id: AssetId,
    pub created: bool,
}

/// 一次对账的统计。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// 本周期新建的资产数（用于批量通知）。
    pub created: usize,
    /// 访问过的节点数（含两趟）。
    pub resolved: usize,
}

impl ReconcileReport {
    fn record(&mut self, outcome: UpsertOutcome) {
        self.resolved += 1;
        if outcome.created {
            self.created += 1;
        }
    }
}

/// 资产树对账器，本身无状态。
#[derive(Clone)]
pub struct Reconciler {
    assets: Arc<dyn AssetStore>,
    registry: Arc<dyn AssetRegistry>,
}

impl Reconciler {
    pub fn new(assets: Arc<dyn AssetStore>, registry: Arc<dyn AssetRegistry>) -> Self {
        Self { assets, registry }
    }

    /// 对一个项目执行两趟遍历。
    pub async fn reconcile(
        &self,
        config: &Configuration,
        project_id: &str,
        tree: &mut DeviceTree,
    ) -> Result<ReconcileReport, ReconcileError> {
        let scope = AssetScope::new(config.id, project_id);
        let mut report = ReconcileReport::default();
        self.traverse(Axis::Locational, config, &scope, tree, &mut report)
            .await?;
        self.traverse(Axis::Functional, config, &scope, tree, &mut report)
            .await?;
        debug!(
            target: "mystrom.assets",
            config_id = config.id,
            project_id,
            created = report.created,
            resolved = report.resolved,
            "reconcile_done"
        );
        Ok(report)
    }

    /// 沿指定轴先序遍历整棵树。
    pub async fn traverse(
        &self,
        axis: Axis,
        config: &Configuration,
        scope: &AssetScope,
        tree: &mut DeviceTree,
        report: &mut ReconcileReport,
    ) -> Result<(), ReconcileError> {
        let root = tree.root();
        let outcome = self.upsert_one(config, scope, tree, root, None, None).await?;
        report.record(outcome);
        let root_id = outcome.asset_id;

        let mut stack: Vec<(NodeId, AssetId)> = children(axis, tree, root)?
            .into_iter()
            .rev()
            .map(|child| (child, root_id))
            .collect();
        while let Some((node, parent_id)) = stack.pop() {
            let (locational_parent, functional_parent) = match axis {
                Axis::Locational => (parent_id, root_id),
                Axis::Functional => (root_id, parent_id),
            };
            let outcome = self
                .upsert_one(
                    config,
                    scope,
                    tree,
                    node,
                    Some(locational_parent),
                    Some(functional_parent),
                )
                .await?;
            report.record(outcome);
            for child in children(axis, tree, node)?.into_iter().rev() {
                stack.push((child, outcome.asset_id));
            }
        }
        Ok(())
    }

    /// 查找或创建单个节点的平台资产，并把 ID 缓存到节点。
    pub async fn upsert_one(
        &self,
        config: &Configuration,
        scope: &AssetScope,
        tree: &mut DeviceTree,
        node: NodeId,
        locational_parent: Option<AssetId>,
        functional_parent: Option<AssetId>,
    ) -> Result<UpsertOutcome, ReconcileError> {
        let current = tree
            .node(node)
            .ok_or(ReconcileError::UnknownNode(node.index()))?;
        let global_asset_id = current.global_identifier();

        if let Some(asset_id) = self.assets.get_asset_id(scope, &global_asset_id).await? {
            record_asset_lookup();
            cache_asset_id(tree, node, &scope.project_id, asset_id)?;
            return Ok(UpsertOutcome {
                asset_id,
                created: false,
            });
        }

        let draft = AssetDraft {
            project_id: scope.project_id.clone(),
            global_asset_identifier: global_asset_id.clone(),
            name: current.name().to_string(),
            asset_type: current.asset_type().to_string(),
            description: current.description(),
            parent_locational_asset_id: locational_parent,
            parent_functional_asset_id: functional_parent,
            is_tracker: false,
        };
        let provider_id = current.provider_id().unwrap_or_default().to_string();

        let asset_id = tokio::time::timeout(
            config.request_timeout(),
            self.registry.upsert_asset(&draft),
        )
        .await
        .map_err(|_| ReconcileError::Timeout(global_asset_id.clone()))??
        .ok_or_else(|| ReconcileError::MissingAssetId(global_asset_id.clone()))?;

        self.assets
            .insert_asset(
                scope,
                AssetRecord::new(scope, global_asset_id.clone(), asset_id, provider_id),
            )
            .await?;
        cache_asset_id(tree, node, &scope.project_id, asset_id)?;

        record_asset_created();
        info!(
            target: "mystrom.assets",
            config_id = config.id,
            project_id = %scope.project_id,
            global_asset_id = %global_asset_id,
            asset_id,
            "asset_created"
        );
        Ok(UpsertOutcome {
            asset_id,
            created: true,
        })
    }
}

fn children(axis: Axis, tree: &DeviceTree, node: NodeId) -> Result<Vec<NodeId>, ReconcileError> {
    let current = tree
        .node(node)
        .ok_or(ReconcileError::UnknownNode(node.index()))?;
    let children = match axis {
        Axis::Locational => current.locational_children(),
        Axis::Functional => current.functional_children(),
    };
    Ok(children.to_vec())
}

fn cache_asset_id(
    tree: &mut DeviceTree,
    node: NodeId,
    project_id: &str,
    asset_id: AssetId,
) -> Result<(), ReconcileError> {
    tree.node_mut(node)
        .ok_or(ReconcileError::UnknownNode(node.index()))?
        .asset_ids_mut()
        .set(project_id, asset_id);
    Ok(())
}
