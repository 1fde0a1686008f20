use mystrom_telemetry::{
    MetricsSnapshot, TelemetryMetrics, metrics, record_asset_created, record_output_echo_ignored,
};

#[test]
fn new_metrics_start_at_zero() {
    let snapshot = TelemetryMetrics::new().snapshot();
    assert_eq!(snapshot, MetricsSnapshot::default());
}

#[test]
fn recorders_increment_global_counters() {
    let before = metrics().snapshot();
    record_asset_created();
    record_asset_created();
    record_output_echo_ignored();
    let after = metrics().snapshot();
    assert!(after.assets_created >= before.assets_created + 2);
    assert!(after.output_echoes_ignored > before.output_echoes_ignored);
}
