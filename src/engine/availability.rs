//! Availability over the property calendar. Pure functions — the engine
//! wrappers in `queries.rs`/`mutations.rs` own the locks.

use chrono::NaiveDate;

use crate::model::{Calendar, DateRange, DayAvailability, Ms, RateCard};

use super::conflict::check_no_conflict;
use super::pricing::nightly_rate;

/// True iff no live slot overlaps the candidate range at `now`.
pub fn range_is_free(cal: &Calendar, range: &DateRange, now: Ms) -> bool {
    check_no_conflict(cal, range, now).is_ok()
}

/// Per-day availability and price over the inclusive `[start, end]` day
/// range, for the front-end date picker. A day is unavailable iff some
/// live slot occupies it as a night.
pub fn day_calendar(
    cal: &Calendar,
    start: NaiveDate,
    end: NaiveDate,
    card: &RateCard,
    now: Ms,
) -> Vec<DayAvailability> {
    // One overlap scan for the whole window, then a per-day membership test.
    let window = DateRange::new(start, end.succ_opt().unwrap_or(end));
    let live: Vec<DateRange> = cal
        .overlapping(&window)
        .filter(|s| s.kind.blocks(now))
        .map(|s| s.range)
        .collect();

    let days = (end - start).num_days().max(0) as usize + 1;
    start
        .iter_days()
        .take(days)
        .map(|date| DayAvailability {
            date,
            available: !live.iter().any(|r| r.contains_night(date)),
            weekend: crate::model::is_weekend(date),
            price: nightly_rate(date, card),
        })
        .collect()
}
