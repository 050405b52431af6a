use std::path::PathBuf;
use std::time::Duration;

use crate::model::Ms;

/// What the sweeper does with an overdue hold. The reference systems did
/// both across revisions; keeping the record is the auditable default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retention {
    /// Soft-transition to `expired`, record retained.
    Keep,
    /// Remove the record entirely.
    Delete,
}

/// Lifecycle tunables the engine needs. All of these are deployment
/// configuration — none of them is a correct constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecyclePolicy {
    /// How long a `pending` hold lives before the sweeper may reclaim it.
    pub hold_window_ms: Ms,
    /// How long a `pending_payment` hold waits for a slip.
    pub payment_window_ms: Ms,
    pub retention: Retention,
}

impl Default for LifecyclePolicy {
    fn default() -> Self {
        Self {
            hold_window_ms: 30 * 60 * 1000,
            payment_window_ms: 24 * 60 * 60 * 1000,
            retention: Retention::Keep,
        }
    }
}

/// Process configuration, read once at startup from `VILLAD_*` variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub policy: LifecyclePolicy,
    pub sweep_interval: Duration,
    pub compact_threshold: u64,
    pub metrics_port: Option<u16>,
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

impl Config {
    pub fn from_env() -> Self {
        let hold_secs: i64 = env_parse("VILLAD_HOLD_WINDOW_SECS").unwrap_or(30 * 60);
        let payment_secs: i64 = env_parse("VILLAD_PAYMENT_WINDOW_SECS").unwrap_or(24 * 60 * 60);
        let sweep_secs: u64 = env_parse("VILLAD_SWEEP_INTERVAL_SECS").unwrap_or(30);
        let retention = match std::env::var("VILLAD_EXPIRED_RETENTION").as_deref() {
            Ok("delete") => Retention::Delete,
            _ => Retention::Keep,
        };

        Self {
            data_dir: std::env::var("VILLAD_DATA_DIR")
                .unwrap_or_else(|_| "./data".into())
                .into(),
            policy: LifecyclePolicy {
                hold_window_ms: hold_secs * 1000,
                payment_window_ms: payment_secs * 1000,
                retention,
            },
            sweep_interval: Duration::from_secs(sweep_secs),
            compact_threshold: env_parse("VILLAD_COMPACT_THRESHOLD").unwrap_or(1000),
            metrics_port: env_parse("VILLAD_METRICS_PORT"),
        }
    }
}
