// MXBridge Exporter - Prometheus exporter for MXBridge
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Prometheus metrics for collected dimensions.
//!
//! Every dimension becomes one sample of `mxbridge_dimension_value`, with
//! multiplier and divisor applied. Dimensions without a value yet are not
//! exported.

use lazy_static::lazy_static;
use mxbridge::CollectorSet;
use prometheus::{
    register_counter, register_gauge, register_gauge_vec, Counter, Encoder, Gauge, GaugeVec,
    TextEncoder,
};
use tracing::warn;

lazy_static! {
    /// Latest value of each dimension.
    pub static ref DIMENSION_VALUE: GaugeVec = register_gauge_vec!(
        "mxbridge_dimension_value",
        "Latest collected dimension value (multiplier and divisor applied)",
        &["server", "chart", "dimension"]
    ).unwrap();

    /// Connection state per server (1 = connected).
    pub static ref SERVER_CONNECTED: GaugeVec = register_gauge_vec!(
        "mxbridge_server_connected",
        "Whether the connection to the server is open (1=connected, 0=disconnected)",
        &["server"]
    ).unwrap();

    /// Queries sampled per cycle, per server (0 while disconnected).
    pub static ref QUERIES_ENABLED: GaugeVec = register_gauge_vec!(
        "mxbridge_queries_enabled",
        "Number of queries sampled each cycle",
        &["server"]
    ).unwrap();

    /// Completed collection cycles.
    pub static ref COLLECTION_CYCLES_TOTAL: Counter = register_counter!(
        "mxbridge_collection_cycles_total",
        "Total collection cycles run"
    ).unwrap();

    /// Duration of the last collection cycle.
    pub static ref CYCLE_DURATION_SECONDS: Gauge = register_gauge!(
        "mxbridge_cycle_duration_seconds",
        "Duration of the last collection cycle in seconds"
    ).unwrap();
}

/// Publish the state of every collector after a cycle.
pub fn publish(set: &CollectorSet, cycle_duration_secs: f64) {
    for collector in set.collectors() {
        let server = collector.name();
        SERVER_CONNECTED
            .with_label_values(&[server])
            .set(if collector.is_connected() { 1.0 } else { 0.0 });
        QUERIES_ENABLED
            .with_label_values(&[server])
            .set(collector.active_queries() as f64);

        for chart in collector.charts() {
            for dimension in chart.dimensions() {
                if let Some(value) = dimension.scaled_value() {
                    DIMENSION_VALUE
                        .with_label_values(&[server, chart.id.as_str(), dimension.id.as_str()])
                        .set(value);
                }
            }
        }
    }

    COLLECTION_CYCLES_TOTAL.inc();
    CYCLE_DURATION_SECONDS.set(cycle_duration_secs);
}

/// Encode all metrics to Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
