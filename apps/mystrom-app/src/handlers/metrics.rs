//! 指标快照。
//!
//! - GET /metrics

use api_contract::{ApiResponse, MetricsDto};
use axum::{Json, extract::State};
use mystrom_telemetry::metrics;

use crate::AppState;

pub async fn get_metrics(State(state): State<AppState>) -> Json<ApiResponse<MetricsDto>> {
    let snapshot = metrics().snapshot();
    Json(ApiResponse::success(MetricsDto {
        active_workers: state.workers.active(),
        assets_created: snapshot.assets_created,
        asset_lookups: snapshot.asset_lookups,
        data_points_written: snapshot.data_points_written,
        data_points_skipped: snapshot.data_points_skipped,
        poll_failures: snapshot.poll_failures,
        output_events: snapshot.output_events,
        output_echoes_ignored: snapshot.output_echoes_ignored,
        commands_sent: snapshot.commands_sent,
        command_failures: snapshot.command_failures,
        listener_reconnects: snapshot.listener_reconnects,
    }))
}
