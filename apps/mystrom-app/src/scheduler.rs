//! 配置调度。
//!
//! 扫描循环按固定间隔读取全部配置：
//! - 已停用但仍标记为运行中：清除 active 标记后跳过
//! - 已启用但未标记：置 active 并记录
//! - 每个启用的配置启动一个 worker，同一配置 ID 同时只运行一个
//!
//! worker 在一个刷新窗口（`refresh_interval`）内先做一次完整采集
//! （v1 设备树 → 逐项目对账 → 通知 → 写入读数），随后按 `data_poll_interval`
//! 轮询 v2 读数。窗口结束时退出并释放配置 ID，由下一次扫描重新启动。

use domain::Configuration;
use mystrom_assets::{ReconcileError, Reconciler};
use mystrom_broker::{BrokerError, DeviceBroker};
use mystrom_pipeline::{DataUpserter, PipelineError, UpsertReport};
use mystrom_platform::{Notifier, new_assets_message};
use mystrom_storage::ConfigurationStore;
use mystrom_telemetry::record_poll_failure;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::{Instant, interval_at, sleep};
use tracing::{debug, info, warn};

/// 单个 worker 的失败原因。
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("vendor error: {0}")]
    Broker(#[from] BrokerError),
    #[error("reconcile error: {0}")]
    Reconcile(#[from] ReconcileError),
    #[error("data upsert error: {0}")]
    Pipeline(#[from] PipelineError),
}

/// worker 共享的依赖。
pub struct Services {
    pub configs: Arc<dyn ConfigurationStore>,
    pub broker: Arc<dyn DeviceBroker>,
    pub reconciler: Reconciler,
    pub upserter: DataUpserter,
    pub notifier: Arc<dyn Notifier>,
    pub notify_new_assets: bool,
}

/// 运行中的配置 ID 集合。
#[derive(Clone, Default)]
pub struct WorkerRegistry {
    running: Arc<Mutex<HashSet<i64>>>,
}

impl WorkerRegistry {
    fn lock(&self) -> MutexGuard<'_, HashSet<i64>> {
        self.running
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 占用配置 ID；已被占用时返回 None。
    pub fn try_acquire(&self, configuration_id: i64) -> Option<WorkerGuard> {
        if !self.lock().insert(configuration_id) {
            return None;
        }
        Some(WorkerGuard {
            registry: self.clone(),
            configuration_id,
        })
    }

    pub fn active(&self) -> usize {
        self.lock().len()
    }
}

/// 释放时归还配置 ID。
pub struct WorkerGuard {
    registry: WorkerRegistry,
    configuration_id: i64,
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.configuration_id);
    }
}

/// 一次完整采集的统计。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectReport {
    pub created: usize,
    pub data: UpsertReport,
}

pub struct Scheduler {
    services: Arc<Services>,
    workers: WorkerRegistry,
    interval: Duration,
    idle_logged: bool,
}

impl Scheduler {
    pub fn new(services: Arc<Services>, workers: WorkerRegistry, interval: Duration) -> Self {
        Self {
            services,
            workers,
            interval,
            idle_logged: false,
        }
    }

    pub fn spawn(mut self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                self.scan_once().await;
                sleep(self.interval).await;
            }
        })
    }

    /// 执行一次扫描，返回本次新启动的 worker 数。
    pub async fn scan_once(&mut self) -> usize {
        let configs = match self.services.configs.list_configs().await {
            Ok(configs) => configs,
            Err(err) => {
                warn!(target: "mystrom.scheduler", error = %err, "list_configs_failed");
                return 0;
            }
        };
        if configs.is_empty() {
            if !self.idle_logged {
                info!(target: "mystrom.scheduler", "no_configurations");
                self.idle_logged = true;
            }
            return 0;
        }
        self.idle_logged = false;

        let mut started = 0;
        for mut config in configs {
            if !config.enable {
                if config.active {
                    self.mark_active(config.id, false).await;
                    info!(target: "mystrom.scheduler", config_id = config.id, "configuration_paused");
                }
                continue;
            }
            if !config.active {
                self.mark_active(config.id, true).await;
                config.active = true;
                info!(
                    target: "mystrom.scheduler",
                    config_id = config.id,
                    projects = ?config.project_ids,
                    refresh_interval = config.refresh_interval,
                    data_poll_interval = config.data_poll_interval,
                    "configuration_activated"
                );
            }
            let Some(guard) = self.workers.try_acquire(config.id) else {
                continue;
            };
            let services = self.services.clone();
            tokio::spawn(async move {
                let _guard = guard;
                run_worker(&services, &config).await;
            });
            started += 1;
        }
        started
    }

    async fn mark_active(&self, configuration_id: i64, active: bool) {
        if let Err(err) = self
            .services
            .configs
            .set_config_active(configuration_id, active)
            .await
        {
            warn!(
                target: "mystrom.scheduler",
                config_id = configuration_id,
                active,
                error = %err,
                "set_config_active_failed"
            );
        }
    }
}

/// 一个刷新窗口内的 worker 生命周期。
pub async fn run_worker(services: &Services, config: &Configuration) {
    let window = sleep(config.refresh_window());
    tokio::pin!(window);

    match collect_resources(services, config).await {
        Ok(report) => info!(
            target: "mystrom.scheduler",
            config_id = config.id,
            created = report.created,
            written = report.data.written,
            skipped = report.data.skipped,
            "collect_resources_done"
        ),
        Err(err) => {
            warn!(
                target: "mystrom.scheduler",
                config_id = config.id,
                error = %err,
                "collect_resources_failed"
            );
            // 不立即重试，等窗口结束后由下一次扫描重启
            window.await;
            return;
        }
    }

    let period = config.poll_period();
    let mut ticker = interval_at(Instant::now() + period, period);
    loop {
        tokio::select! {
            _ = &mut window => break,
            _ = ticker.tick() => {
                if let Err(err) = poll_data(services, config).await {
                    record_poll_failure();
                    warn!(
                        target: "mystrom.scheduler",
                        config_id = config.id,
                        error = %err,
                        "poll_data_failed"
                    );
                }
            }
        }
    }
    debug!(target: "mystrom.scheduler", config_id = config.id, "worker_window_closed");
}

/// 完整采集：v1 设备树 → 逐项目对账 → 新资产通知 → 写入读数。
pub async fn collect_resources(
    services: &Services,
    config: &Configuration,
) -> Result<CollectReport, WorkerError> {
    let mut tree = services.broker.fetch_devices(config).await?;
    let mut report = CollectReport::default();
    for project_id in &config.project_ids {
        let reconciled = services
            .reconciler
            .reconcile(config, project_id, &mut tree)
            .await?;
        report.created += reconciled.created;
        if reconciled.created > 0 && services.notify_new_assets {
            notify_new_assets(services, config, project_id, reconciled.created).await;
        }
    }
    let switches = tree.into_switches();
    report.data = services.upserter.upsert_switches(config, &switches).await?;
    Ok(report)
}

async fn notify_new_assets(services: &Services, config: &Configuration, project_id: &str, count: usize) {
    let message = new_assets_message(count);
    let sent = tokio::time::timeout(
        config.request_timeout(),
        services.notifier.notify_users(project_id, &message),
    )
    .await;
    match sent {
        Ok(Ok(sent)) => debug!(
            target: "mystrom.scheduler",
            config_id = config.id,
            project_id,
            sent,
            "new_assets_notified"
        ),
        Ok(Err(err)) => warn!(
            target: "mystrom.scheduler",
            config_id = config.id,
            project_id,
            error = %err,
            "new_assets_notification_failed"
        ),
        Err(_) => warn!(
            target: "mystrom.scheduler",
            config_id = config.id,
            project_id,
            timeout_secs = config.request_timeout().as_secs(),
            "new_assets_notification_timed_out"
        ),
    }
}

/// 轮询：v2 读数 → 写入。
pub async fn poll_data(
    services: &Services,
    config: &Configuration,
) -> Result<UpsertReport, WorkerError> {
    let switches = services.broker.fetch_data(config).await?;
    Ok(services.upserter.upsert_switches(config, &switches).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use domain::{AssetId, DeviceTree, SwitchNode};
    use mystrom_platform::{AssetData, AssetDraft, AssetRegistry, DataSink, PlatformError, Translation};
    use mystrom_storage::{AssetStore, InMemoryAssetStore, InMemoryConfigurationStore};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeBroker {
        tree_fetches: AtomicUsize,
        data_fetches: AtomicUsize,
        fail_tree: bool,
    }

    #[async_trait]
    impl DeviceBroker for FakeBroker {
        async fn fetch_devices(&self, _config: &Configuration) -> Result<DeviceTree, BrokerError> {
            self.tree_fetches.fetch_add(1, Ordering::SeqCst);
            if self.fail_tree {
                return Err(BrokerError::Api("rate limited".to_string()));
            }
            let mut tree = DeviceTree::new();
            let room = tree.add_room("r1", "Kitchen");
            tree.add_switch(SwitchNode::new("aa01", "Kettle"), Some(room));
            tree.add_switch(SwitchNode::new("bb02", "Lamp"), None);
            Ok(tree)
        }

        async fn fetch_data(&self, _config: &Configuration) -> Result<Vec<SwitchNode>, BrokerError> {
            self.data_fetches.fetch_add(1, Ordering::SeqCst);
            Ok(vec![SwitchNode::new("aa01", "Kettle")])
        }

        async fn set_relay(
            &self,
            _config: &Configuration,
            _device_id: &str,
            _value: i64,
        ) -> Result<(), BrokerError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakePlatform {
        next_id: Mutex<AssetId>,
        writes: AtomicUsize,
        notifications: Mutex<Vec<(String, Translation)>>,
        stall_notifications: bool,
    }

    #[async_trait]
    impl AssetRegistry for FakePlatform {
        async fn upsert_asset(&self, _draft: &AssetDraft) -> Result<Option<AssetId>, PlatformError> {
            let mut next = self.next_id.lock().expect("lock");
            *next += 1;
            Ok(Some(*next))
        }
    }

    #[async_trait]
    impl DataSink for FakePlatform {
        async fn upsert_data(&self, _data: &AssetData) -> Result<bool, PlatformError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(true)
        }
    }

    #[async_trait]
    impl Notifier for FakePlatform {
        async fn notify_users(
            &self,
            project_id: &str,
            message: &Translation,
        ) -> Result<usize, PlatformError> {
            if self.stall_notifications {
                std::future::pending::<()>().await;
            }
            self.notifications
                .lock()
                .expect("lock")
                .push((project_id.to_string(), message.clone()));
            Ok(1)
        }
    }

    struct Harness {
        services: Arc<Services>,
        configs: Arc<InMemoryConfigurationStore>,
        broker: Arc<FakeBroker>,
        platform: Arc<FakePlatform>,
    }

    fn harness(configs: Vec<Configuration>, broker: FakeBroker) -> Harness {
        harness_with(configs, broker, FakePlatform::default())
    }

    fn harness_with(
        configs: Vec<Configuration>,
        broker: FakeBroker,
        platform: FakePlatform,
    ) -> Harness {
        let configs = Arc::new(InMemoryConfigurationStore::with_configs(configs));
        let assets: Arc<dyn AssetStore> = Arc::new(InMemoryAssetStore::new());
        let broker = Arc::new(broker);
        let platform = Arc::new(platform);
        let services = Arc::new(Services {
            configs: configs.clone(),
            broker: broker.clone(),
            reconciler: Reconciler::new(assets.clone(), platform.clone()),
            upserter: DataUpserter::new(assets, platform.clone()),
            notifier: platform.clone(),
            notify_new_assets: true,
        });
        Harness {
            services,
            configs,
            broker,
            platform,
        }
    }

    fn config(id: i64, enable: bool, active: bool) -> Configuration {
        Configuration {
            id,
            enable,
            active,
            refresh_interval: 60,
            data_poll_interval: 10,
            project_ids: vec!["project-1".to_string()],
            ..Configuration::default()
        }
    }

    #[test]
    fn registry_runs_each_configuration_once() {
        let registry = WorkerRegistry::default();
        let guard = registry.try_acquire(1).expect("first");
        assert!(registry.try_acquire(1).is_none());
        assert_eq!(registry.active(), 1);
        drop(guard);
        assert_eq!(registry.active(), 0);
        assert!(registry.try_acquire(1).is_some());
    }

    #[tokio::test]
    async fn collect_creates_assets_notifies_and_writes() {
        let h = harness(vec![config(1, true, true)], FakeBroker::default());
        let report = collect_resources(&h.services, &config(1, true, true))
            .await
            .expect("collect");
        // 根、房间、两个开关
        assert_eq!(report.created, 4);
        assert_eq!(report.data.written, 4);
        let notifications = h.platform.notifications.lock().expect("lock").clone();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].0, "project-1");
        assert!(notifications[0].1.en.contains("added 4 new assets"));

        let again = collect_resources(&h.services, &config(1, true, true))
            .await
            .expect("collect again");
        assert_eq!(again.created, 0);
        assert_eq!(h.platform.notifications.lock().expect("lock").len(), 1);
    }

    #[tokio::test]
    async fn scan_updates_active_flags_and_starts_enabled_workers() {
        let h = harness(
            vec![config(1, true, false), config(2, false, true)],
            FakeBroker::default(),
        );
        let registry = WorkerRegistry::default();
        let mut scheduler = Scheduler::new(h.services.clone(), registry.clone(), Duration::from_secs(1));

        assert_eq!(scheduler.scan_once().await, 1);
        let first = h.configs.find_config(1).await.expect("find").expect("exists");
        let second = h.configs.find_config(2).await.expect("find").expect("exists");
        assert!(first.active);
        assert!(!second.active);
        assert_eq!(registry.active(), 1);

        // 已在运行的配置不会重复启动
        assert_eq!(scheduler.scan_once().await, 0);
    }

    #[tokio::test]
    async fn empty_scan_starts_nothing() {
        let h = harness(Vec::new(), FakeBroker::default());
        let mut scheduler = Scheduler::new(h.services, WorkerRegistry::default(), Duration::from_secs(1));
        assert_eq!(scheduler.scan_once().await, 0);
        assert_eq!(scheduler.scan_once().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn worker_polls_until_the_window_closes() {
        let h = harness(vec![config(1, true, true)], FakeBroker::default());
        run_worker(&h.services, &config(1, true, true)).await;
        assert_eq!(h.broker.tree_fetches.load(Ordering::SeqCst), 1);
        // 60 秒窗口、10 秒周期，首个 tick 在 10 秒后
        let polls = h.broker.data_fetches.load(Ordering::SeqCst);
        assert!((5..=6).contains(&polls), "polls = {polls}");
    }

    #[tokio::test(start_paused = true)]
    async fn failed_collection_waits_out_the_window_without_polling() {
        let h = harness(
            vec![config(1, true, true)],
            FakeBroker {
                fail_tree: true,
                ..FakeBroker::default()
            },
        );
        let started = Instant::now();
        run_worker(&h.services, &config(1, true, true)).await;
        assert!(started.elapsed() >= Duration::from_secs(60));
        assert_eq!(h.broker.data_fetches.load(Ordering::SeqCst), 0);
        assert_eq!(h.platform.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_notification_does_not_pin_the_worker() {
        let h = harness_with(
            vec![config(1, true, true)],
            FakeBroker::default(),
            FakePlatform {
                stall_notifications: true,
                ..FakePlatform::default()
            },
        );
        let config = Configuration {
            request_timeout: 5,
            ..config(1, true, true)
        };
        let finished =
            tokio::time::timeout(Duration::from_secs(3600), run_worker(&h.services, &config)).await;
        assert!(finished.is_ok());
        // 通知超时后仍继续写入读数并轮询
        assert!(h.platform.writes.load(Ordering::SeqCst) >= 4);
        assert!(h.broker.data_fetches.load(Ordering::SeqCst) >= 1);
        assert!(h.platform.notifications.lock().expect("lock").is_empty());
    }
}
