use chrono::NaiveDate;
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::availability::{day_calendar, range_is_free};
use super::conflict::{now_ms, validate_range};
use super::lifecycle;
use super::pricing::compute_total_price;
use super::{Engine, EngineError};

/// Snapshot with lazy expiry applied: an overdue-but-unswept hold reads
/// as `expired` so sweep latency never leaks a live-looking hold.
fn lazy_view(mut b: Booking, now: Ms) -> Booking {
    if lifecycle::is_overdue(&b, now) {
        b.status = BookingStatus::Expired;
        lifecycle::reconcile_expiry(&mut b);
    }
    b
}

impl Engine {
    pub async fn get_booking(&self, id: Ulid) -> Result<Booking, EngineError> {
        let shared = self.store.get(&id).ok_or(EngineError::NotFound(id))?;
        let b = shared.read().await.clone();
        Ok(lazy_view(b, now_ms()))
    }

    /// All bookings, newest first.
    pub async fn list_bookings(&self) -> Vec<Booking> {
        let now = now_ms();
        let mut out = Vec::with_capacity(self.store.booking_count());
        for id in self.store.ids() {
            if let Some(shared) = self.store.get(&id) {
                out.push(lazy_view(shared.read().await.clone(), now));
            }
        }
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out
    }

    pub fn booking_count(&self) -> usize {
        self.store.booking_count()
    }

    /// True iff no live hold or reservation overlaps the candidate range.
    pub async fn is_range_available(&self, range: DateRange) -> Result<bool, EngineError> {
        validate_range(range.check_in, range.check_out)?;
        let cal = self.store.calendar().read().await;
        Ok(range_is_free(&cal, &range, now_ms()))
    }

    /// Active bookings whose dates overlap the range — admin tooling.
    pub async fn query_overlapping(&self, range: DateRange) -> Result<Vec<Ulid>, EngineError> {
        validate_range(range.check_in, range.check_out)?;
        let cal = self.store.calendar().read().await;
        Ok(cal.overlapping(&range).map(|s| s.booking_id).collect())
    }

    /// Per-day availability and price over the inclusive `[start, end]`
    /// window, for the date picker.
    pub async fn available_dates(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DayAvailability>, EngineError> {
        if end < start {
            return Err(EngineError::InvalidRange { check_in: start, check_out: end });
        }
        if (end - start).num_days() > MAX_QUERY_WINDOW_DAYS {
            return Err(EngineError::LimitExceeded("query window too wide"));
        }
        let card = self.current_rate_card().await?;
        let cal = self.store.calendar().read().await;
        Ok(day_calendar(&cal, start, end, &card, now_ms()))
    }

    /// Price preview for a candidate stay. Same computation as the quote
    /// recorded at creation; creates nothing.
    pub async fn quote(&self, range: DateRange) -> Result<Baht, EngineError> {
        validate_range(range.check_in, range.check_out)?;
        let card = self.current_rate_card().await?;
        compute_total_price(range.check_in, range.check_out, &card)
    }
}
