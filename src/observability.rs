use std::net::SocketAddr;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: reservations committed.
pub const BOOKINGS_TOTAL: &str = "vacancy_bookings_total";

/// Counter: booking attempts rejected because the slot was taken.
pub const BOOKING_CONFLICTS_TOTAL: &str = "vacancy_booking_conflicts_total";

/// Counter: availability queries served.
pub const AVAILABILITY_QUERIES_TOTAL: &str = "vacancy_availability_queries_total";

/// Histogram: availability query latency in seconds.
pub const AVAILABILITY_QUERY_DURATION_SECONDS: &str =
    "vacancy_availability_query_duration_seconds";

/// Counter: block-edit submissions applied.
pub const BLOCK_EDITS_TOTAL: &str = "vacancy_block_edits_total";

// ── USE metrics (resource utilization) ──────────────────────────

/// Gauge: reservation drafts currently held.
pub const DRAFTS_ACTIVE: &str = "vacancy_drafts_active";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}
