//! 追踪初始化、请求 ID 与连接器计数指标。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 请求级追踪标识。
#[derive(Debug, Clone)]
pub struct RequestIds {
    pub request_id: String,
    pub trace_id: String,
}

/// 指标快照。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub assets_created: u64,
    pub asset_lookups: u64,
    pub data_points_written: u64,
    pub data_points_skipped: u64,
    pub poll_failures: u64,
    pub output_events: u64,
    pub output_echoes_ignored: u64,
    pub commands_sent: u64,
    pub command_failures: u64,
    pub listener_reconnects: u64,
}

/// 进程级计数器。
#[derive(Default)]
pub struct TelemetryMetrics {
    assets_created: AtomicU64,
    asset_lookups: AtomicU64,
    data_points_written: AtomicU64,
    data_points_skipped: AtomicU64,
    poll_failures: AtomicU64,
    output_events: AtomicU64,
    output_echoes_ignored: AtomicU64,
    commands_sent: AtomicU64,
    command_failures: AtomicU64,
    listener_reconnects: AtomicU64,
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            assets_created: self.assets_created.load(Ordering::Relaxed),
            asset_lookups: self.asset_lookups.load(Ordering::Relaxed),
            data_points_written: self.data_points_written.load(Ordering::Relaxed),
            data_points_skipped: self.data_points_skipped.load(Ordering::Relaxed),
            poll_failures: self.poll_failures.load(Ordering::Relaxed),
            output_events: self.output_events.load(Ordering::Relaxed),
            output_echoes_ignored: self.output_echoes_ignored.load(Ordering::Relaxed),
            commands_sent: self.commands_sent.load(Ordering::Relaxed),
            command_failures: self.command_failures.load(Ordering::Relaxed),
            listener_reconnects: self.listener_reconnects.load(Ordering::Relaxed),
        }
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 获取全局指标实例。
pub fn metrics() -> &'static TelemetryMetrics {
    METRICS.get_or_init(TelemetryMetrics::new)
}

/// 初始化 tracing（默认 info，可由 RUST_LOG 覆盖）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 生成新的 request_id 与 trace_id。
pub fn new_request_ids() -> RequestIds {
    RequestIds {
        request_id: uuid::Uuid::new_v4().to_string(),
        trace_id: uuid::Uuid::new_v4().to_string(),
    }
}

/// 记录新建资产次数。
pub fn record_asset_created() {
    metrics().assets_created.fetch_add(1, Ordering::Relaxed);
}

/// 记录命中身份记录的次数。
pub fn record_asset_lookup() {
    metrics().asset_lookups.fetch_add(1, Ordering::Relaxed);
}

/// 记录写入平台的数据点数。
pub fn record_data_point_written() {
    metrics().data_points_written.fetch_add(1, Ordering::Relaxed);
}

/// 记录因资产未解析而跳过的数据点数。
pub fn record_data_point_skipped() {
    metrics().data_points_skipped.fetch_add(1, Ordering::Relaxed);
}

/// 记录轮询失败次数。
pub fn record_poll_failure() {
    metrics().poll_failures.fetch_add(1, Ordering::Relaxed);
}

/// 记录收到的输出变更事件数。
pub fn record_output_event() {
    metrics().output_events.fetch_add(1, Ordering::Relaxed);
}

/// 记录被识别为回声而丢弃的事件数。
pub fn record_output_echo_ignored() {
    metrics()
        .output_echoes_ignored
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录成功下发的厂商命令数。
pub fn record_command_sent() {
    metrics().commands_sent.fetch_add(1, Ordering::Relaxed);
}

/// 记录下发失败的厂商命令数。
pub fn record_command_failure() {
    metrics().command_failures.fetch_add(1, Ordering::Relaxed);
}

/// 记录事件流重连次数。
pub fn record_listener_reconnect() {
    metrics()
        .listener_reconnects
        .fetch_add(1, Ordering::Relaxed);
}
