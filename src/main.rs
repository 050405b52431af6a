use std::sync::Arc;

use tracing::info;

use villad::config::Config;
use villad::engine::Engine;
use villad::notify::NotifyHub;
use villad::sweeper;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env();
    villad::observability::init(config.metrics_port);

    std::fs::create_dir_all(&config.data_dir)?;
    let wal_path = config.data_dir.join("bookings.wal");

    let notify = Arc::new(NotifyHub::new());
    let engine = Arc::new(Engine::new(wal_path, notify, config.policy)?);

    info!("villad started");
    info!("  data_dir: {}", config.data_dir.display());
    info!("  bookings replayed: {}", engine.booking_count());
    info!(
        "  hold_window: {}s, payment_window: {}s",
        config.policy.hold_window_ms / 1000,
        config.policy.payment_window_ms / 1000
    );
    info!("  sweep_interval: {:?}", config.sweep_interval);
    info!(
        "  metrics: {}",
        config
            .metrics_port
            .map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics"))
    );

    // The sweeper and compactor are owned tasks: started here, stopped at
    // shutdown — not fire-and-forget timers.
    let sweeper_handle = tokio::spawn(sweeper::run_sweeper(
        engine.clone(),
        config.sweep_interval,
    ));
    let compactor_handle = tokio::spawn(sweeper::run_compactor(
        engine.clone(),
        config.compact_threshold,
    ));

    // Graceful shutdown on SIGTERM/ctrl-c.
    let shutdown = async {
        let ctrl_c = tokio::signal::ctrl_c();
        #[cfg(unix)]
        {
            let mut sigterm =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .expect("failed to register SIGTERM handler");
            tokio::select! {
                _ = ctrl_c => {}
                _ = sigterm.recv() => {}
            }
        }
        #[cfg(not(unix))]
        {
            ctrl_c.await.ok();
        }
    };
    shutdown.await;

    info!("shutdown signal received");
    sweeper_handle.abort();
    compactor_handle.abort();

    info!("villad stopped");
    Ok(())
}
