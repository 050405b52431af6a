use std::net::SocketAddr;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: bookings accepted into `pending`.
pub const BOOKINGS_CREATED_TOTAL: &str = "villad_bookings_created_total";

/// Counter: applied lifecycle transitions. Labels: status.
pub const TRANSITIONS_TOTAL: &str = "villad_transitions_total";

// ── USE metrics (background work) ───────────────────────────────

/// Counter: sweep passes executed.
pub const SWEEPS_TOTAL: &str = "villad_sweeps_total";

/// Counter: overdue holds reclaimed (expired or deleted).
pub const SWEEP_RECLAIMED_TOTAL: &str = "villad_sweep_reclaimed_total";

/// Histogram: WAL group-commit flush duration in seconds.
pub const WAL_FLUSH_DURATION_SECONDS: &str = "villad_wal_flush_duration_seconds";

/// Histogram: WAL group-commit batch size (events per flush).
pub const WAL_FLUSH_BATCH_SIZE: &str = "villad_wal_flush_batch_size";

/// Install the Prometheus exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}
