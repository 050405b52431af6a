use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::RwLock;
use ulid::Ulid;

use crate::model::*;

use super::lifecycle;

pub type SharedBooking = Arc<RwLock<Booking>>;

/// Authoritative copy of all bookings plus the occupancy index.
///
/// Lock discipline: `create` holds the calendar write lock across
/// conflict-check + insert and never touches a booking lock; transitions
/// hold a booking write lock and then briefly take the calendar write
/// lock to refresh the slot. No path holds the calendar and waits on a
/// booking, so the two orders cannot deadlock.
pub struct BookingStore {
    bookings: DashMap<Ulid, SharedBooking>,
    calendar: RwLock<Calendar>,
}

impl Default for BookingStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BookingStore {
    pub fn new() -> Self {
        Self {
            bookings: DashMap::new(),
            calendar: RwLock::new(Calendar::new()),
        }
    }

    // ── Booking records ──────────────────────────────────────

    pub fn booking_count(&self) -> usize {
        self.bookings.len()
    }

    pub fn contains(&self, id: &Ulid) -> bool {
        self.bookings.contains_key(id)
    }

    pub fn get(&self, id: &Ulid) -> Option<SharedBooking> {
        self.bookings.get(id).map(|e| e.value().clone())
    }

    pub fn insert(&self, id: Ulid, booking: SharedBooking) {
        self.bookings.insert(id, booking);
    }

    pub fn remove(&self, id: &Ulid) -> Option<(Ulid, SharedBooking)> {
        self.bookings.remove(id)
    }

    pub fn ids(&self) -> Vec<Ulid> {
        self.bookings.iter().map(|e| *e.key()).collect()
    }

    pub fn calendar(&self) -> &RwLock<Calendar> {
        &self.calendar
    }

    // ── Event application ────────────────────────────────────

    /// Build the initial record from a `BookingCreated` event.
    /// Returns `None` for any other event type.
    pub fn materialize(event: &Event) -> Option<Booking> {
        let Event::BookingCreated { id, range, guests, total_price, note, expires_at, at } = event
        else {
            return None;
        };
        let mut b = Booking {
            id: *id,
            customer: None,
            range: *range,
            guests: *guests,
            total_price: *total_price,
            status: BookingStatus::Pending,
            payment_method: None,
            slip_ref: None,
            note: note.clone(),
            can_expire: true,
            expires_at: Some(*expires_at),
            payment_deadline: None,
            version: 1,
            created_at: *at,
            updated_at: *at,
        };
        lifecycle::reconcile_expiry(&mut b);
        Some(b)
    }

    /// Apply a non-create event to a booking record: field updates, then
    /// expiry reconciliation, version bump and `updated_at`. The calendar
    /// slot is refreshed separately via [`BookingStore::refresh_slot`].
    pub fn apply_event(&self, b: &mut Booking, event: &Event) {
        let at = match event {
            Event::CustomerInfoSet { customer, at, .. } => {
                b.customer = Some(customer.clone());
                *at
            }
            Event::PaymentMethodSelected { method, deadline, at, .. } => {
                b.payment_method = Some(*method);
                b.payment_deadline = Some(*deadline);
                if b.status == BookingStatus::Pending {
                    b.status = BookingStatus::PendingPayment;
                }
                *at
            }
            Event::SlipAttached { slip_ref, at, .. } => {
                b.slip_ref = Some(slip_ref.clone());
                b.status = BookingStatus::InReview;
                *at
            }
            Event::StatusChanged { status, at, .. } => {
                b.status = *status;
                *at
            }
            // Creation and deletion are handled at the map level.
            Event::BookingCreated { .. } | Event::BookingDeleted { .. } | Event::RateCardSet { .. } => {
                return;
            }
        };
        lifecycle::reconcile_expiry(b);
        b.version += 1;
        b.updated_at = at;
    }

    /// Bring the calendar in line with a booking's current state.
    pub fn refresh_slot(cal: &mut Calendar, b: &Booking) {
        match lifecycle::slot_kind_for(b) {
            Some(kind) => {
                if cal.get(b.id).is_some() {
                    cal.set_kind(b.id, kind);
                } else {
                    cal.insert(Slot { booking_id: b.id, range: b.range, kind });
                }
            }
            None => {
                cal.remove(b.id);
            }
        }
    }
}
