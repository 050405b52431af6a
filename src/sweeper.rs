use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::engine::Engine;

fn unix_now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as i64
}

/// Background task that periodically reclaims overdue holds. Spawned at
/// startup and aborted at shutdown by the process owner; a failing pass
/// logs and waits for the next tick.
pub async fn run_sweeper(engine: Arc<Engine>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        sweep_once(&engine).await;
    }
}

/// One sweep pass. Returns the number of holds reclaimed; safe to run
/// concurrently with itself or with live traffic — `expire_booking`
/// re-checks the overdue predicate under the write lock.
pub async fn sweep_once(engine: &Engine) -> usize {
    let now = unix_now_ms();
    let mut reclaimed = 0;
    for id in engine.collect_overdue(now) {
        match engine.expire_booking(id, now).await {
            Ok(true) => {
                info!("reclaimed overdue hold {id}");
                reclaimed += 1;
            }
            Ok(false) => {} // protected or already swept in the meantime
            Err(e) => {
                tracing::debug!("sweep skip {id}: {e}");
            }
        }
    }
    metrics::counter!(crate::observability::SWEEPS_TOTAL).increment(1);
    reclaimed
}

/// Background task that compacts the WAL once enough appends accumulate.
pub async fn run_compactor(engine: Arc<Engine>, threshold: u64) {
    let mut ticker = tokio::time::interval(Duration::from_secs(60));
    loop {
        ticker.tick().await;
        if engine.wal_appends_since_compact().await >= threshold {
            match engine.compact_wal().await {
                Ok(()) => info!("WAL compacted"),
                Err(e) => tracing::warn!("WAL compaction failed: {e}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LifecyclePolicy;
    use crate::model::{DateRange, RateCard, RatePair};
    use crate::notify::NotifyHub;
    use chrono::NaiveDate;
    use std::path::PathBuf;
    use ulid::Ulid;

    fn test_wal_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("villad_test_sweeper");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let _ = std::fs::remove_file(&path);
        path
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    async fn engine_with_instant_expiry(name: &str) -> Engine {
        // A negative hold window makes every new hold already overdue.
        let policy = LifecyclePolicy {
            hold_window_ms: -1_000,
            ..LifecyclePolicy::default()
        };
        let engine = Engine::new(test_wal_path(name), Arc::new(NotifyHub::new()), policy).unwrap();
        engine
            .set_rate_card(RateCard {
                weekday: RatePair { regular: 1000, discounted: None },
                weekend: RatePair { regular: 1500, discounted: None },
                max_guests: 8,
            })
            .await
            .unwrap();
        engine
    }

    #[tokio::test]
    async fn sweep_reclaims_overdue_holds() {
        let engine = engine_with_instant_expiry("reclaim.wal").await;
        let id = Ulid::new();
        engine
            .create_booking(id, DateRange::new(d(2025, 7, 1), d(2025, 7, 3)), 2, None)
            .await
            .unwrap();

        assert_eq!(sweep_once(&engine).await, 1);
        let b = engine.get_booking(id).await.unwrap();
        assert_eq!(b.status, crate::model::BookingStatus::Expired);
    }

    #[tokio::test]
    async fn sweep_twice_is_idempotent() {
        let engine = engine_with_instant_expiry("idempotent.wal").await;
        let id = Ulid::new();
        engine
            .create_booking(id, DateRange::new(d(2025, 7, 10), d(2025, 7, 12)), 2, None)
            .await
            .unwrap();

        assert_eq!(sweep_once(&engine).await, 1);
        let after_first = engine.get_booking(id).await.unwrap();
        assert_eq!(sweep_once(&engine).await, 0);
        let after_second = engine.get_booking(id).await.unwrap();
        assert_eq!(after_first, after_second);
    }
}
