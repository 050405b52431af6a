use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use ulid::Ulid;

use villad::config::LifecyclePolicy;
use villad::engine::Engine;
use villad::model::{DateRange, RateCard, RatePair};
use villad::notify::NotifyHub;

fn percentile(sorted: &[Duration], p: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let idx = ((sorted.len() as f64) * p / 100.0) as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn print_latency(label: &str, latencies: &mut [Duration]) {
    latencies.sort();
    let total: Duration = latencies.iter().sum();
    let avg = total / latencies.len() as u32;
    println!("  {label}:");
    println!(
        "    n={}, avg={:.2}ms, p50={:.2}ms, p95={:.2}ms, p99={:.2}ms, max={:.2}ms",
        latencies.len(),
        avg.as_secs_f64() * 1000.0,
        percentile(latencies, 50.0).as_secs_f64() * 1000.0,
        percentile(latencies, 95.0).as_secs_f64() * 1000.0,
        percentile(latencies, 99.0).as_secs_f64() * 1000.0,
        latencies.last().unwrap().as_secs_f64() * 1000.0,
    );
}

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

async fn setup() -> Arc<Engine> {
    let dir = std::env::temp_dir().join(format!("villad_bench_{}", Ulid::new()));
    std::fs::create_dir_all(&dir).unwrap();
    let engine = Arc::new(
        Engine::new(
            dir.join("bench.wal"),
            Arc::new(NotifyHub::new()),
            LifecyclePolicy::default(),
        )
        .unwrap(),
    );
    engine
        .set_rate_card(RateCard {
            weekday: RatePair { regular: 1000, discounted: None },
            weekend: RatePair { regular: 1500, discounted: Some(1200) },
            max_guests: 8,
        })
        .await
        .unwrap();
    engine
}

#[tokio::main]
async fn main() {
    const ITERATIONS: usize = 2_000;
    const OCCUPANCY: usize = 200;

    let engine = setup().await;
    println!("villad churn bench ({ITERATIONS} iterations, {OCCUPANCY} standing bookings)");

    // Standing occupancy: confirmed three-night stays spread over the year.
    let base = d(2026, 1, 1);
    for i in 0..OCCUPANCY {
        let check_in = base + chrono::Days::new((i * 5) as u64);
        let check_out = check_in + chrono::Days::new(3);
        let id = Ulid::new();
        let b = engine
            .create_booking(id, DateRange::new(check_in, check_out), 2, None)
            .await
            .expect("seed create");
        engine.confirm_booking(id, b.version).await.expect("seed confirm");
    }

    // Create/cancel churn on a gap the seeds leave free.
    let churn_range = DateRange::new(d(2025, 6, 1), d(2025, 6, 4));
    let mut create_lat = Vec::with_capacity(ITERATIONS);
    let mut cancel_lat = Vec::with_capacity(ITERATIONS);
    for _ in 0..ITERATIONS {
        let id = Ulid::new();
        let start = Instant::now();
        let b = engine
            .create_booking(id, churn_range, 2, None)
            .await
            .expect("churn create");
        create_lat.push(start.elapsed());

        let start = Instant::now();
        engine.cancel_booking(id, b.version).await.expect("churn cancel");
        cancel_lat.push(start.elapsed());
    }
    print_latency("create", &mut create_lat);
    print_latency("cancel", &mut cancel_lat);

    // Availability probes across the occupied year.
    let mut avail_lat = Vec::with_capacity(ITERATIONS);
    for i in 0..ITERATIONS {
        let check_in = base + chrono::Days::new((i % 300) as u64);
        let check_out = check_in + chrono::Days::new(2);
        let start = Instant::now();
        let _ = engine
            .is_range_available(DateRange::new(check_in, check_out))
            .await
            .expect("availability");
        avail_lat.push(start.elapsed());
    }
    print_latency("is_range_available", &mut avail_lat);

    // Month-long day calendars, the date-picker query.
    let mut cal_lat = Vec::with_capacity(ITERATIONS / 10);
    for i in 0..ITERATIONS / 10 {
        let start_day = base + chrono::Days::new((i % 330) as u64);
        let end_day = start_day + chrono::Days::new(30);
        let start = Instant::now();
        let _ = engine
            .available_dates(start_day, end_day)
            .await
            .expect("day calendar");
        cal_lat.push(start.elapsed());
    }
    print_latency("available_dates (31 days)", &mut cal_lat);
}
