use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unix milliseconds — the only instant type.
pub type Ms = i64;

/// Whole Thai baht — all prices are integral.
pub type Baht = i64;

/// Half-open stay `[check_in, check_out)` — the checkout day is not a night.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

impl DateRange {
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> Self {
        debug_assert!(check_in < check_out, "check_in must precede check_out");
        Self { check_in, check_out }
    }

    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }

    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.check_in < other.check_out && other.check_in < self.check_out
    }

    /// Returns true if `date` is one of the nights of this stay.
    pub fn contains_night(&self, date: NaiveDate) -> bool {
        self.check_in <= date && date < self.check_out
    }

    /// Iterate the nights of the stay, checkout day excluded.
    pub fn iter_nights(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.check_in.iter_days().take(self.nights().max(0) as usize)
    }
}

/// Weekend = Saturday or Sunday in the property's local calendar.
pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingStatus {
    Pending,
    PendingPayment,
    InReview,
    Confirmed,
    Cancelled,
    Expired,
    CheckedIn,
    CheckedOut,
}

impl BookingStatus {
    /// Absorbing or final — no transition leaves these states.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::Cancelled | BookingStatus::Expired | BookingStatus::CheckedOut
        )
    }

    /// Counts against availability. Cancelled/expired bookings never conflict.
    pub fn is_active(&self) -> bool {
        !matches!(self, BookingStatus::Cancelled | BookingStatus::Expired)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::PendingPayment => "pending_payment",
            BookingStatus::InReview => "in_review",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Expired => "expired",
            BookingStatus::CheckedIn => "checked_in",
            BookingStatus::CheckedOut => "checked_out",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    BankTransfer,
    Promptpay,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Promptpay => "promptpay",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

/// Nightly rate for one class of night.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatePair {
    pub regular: Baht,
    /// Takes precedence over `regular` when set and nonzero.
    pub discounted: Option<Baht>,
}

impl RatePair {
    pub fn nightly(&self) -> Baht {
        match self.discounted {
            Some(d) if d > 0 => d,
            _ => self.regular,
        }
    }
}

/// Singleton property configuration, owned by the admin collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateCard {
    pub weekday: RatePair,
    pub weekend: RatePair,
    pub max_guests: u32,
}

/// The central entity. Mutated only through lifecycle transitions; the
/// store holds the authoritative copy and bumps `version` on every event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Booking {
    pub id: Ulid,
    pub customer: Option<CustomerInfo>,
    pub range: DateRange,
    pub guests: u32,
    /// Quote recorded at creation — never silently recomputed.
    pub total_price: Baht,
    pub status: BookingStatus,
    pub payment_method: Option<PaymentMethod>,
    pub slip_ref: Option<String>,
    pub note: Option<String>,
    pub can_expire: bool,
    pub expires_at: Option<Ms>,
    pub payment_deadline: Option<Ms>,
    pub version: u64,
    pub created_at: Ms,
    pub updated_at: Ms,
}

// ── Calendar index ───────────────────────────────────────────────

/// How a slot occupies its dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// Unconfirmed hold, no payment method yet.
    Hold { expires_at: Ms },
    /// Payment method selected, slip not yet uploaded.
    PaymentHold { deadline: Ms },
    /// Slip uploaded or confirmed — never reclaimed automatically.
    Reserved,
}

impl SlotKind {
    /// Does this slot block the dates at instant `now`? An overdue hold
    /// never blocks, regardless of sweep latency.
    pub fn blocks(&self, now: Ms) -> bool {
        match self {
            SlotKind::Hold { expires_at } => *expires_at > now,
            SlotKind::PaymentHold { deadline } => *deadline > now,
            SlotKind::Reserved => true,
        }
    }
}

/// One calendar entry per booking that occupies dates. Cancelled and
/// expired bookings have no slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub booking_id: Ulid,
    pub range: DateRange,
    pub kind: SlotKind,
}

/// The single property's occupancy index, sorted by `range.check_in`.
/// Derived state — booking records are authoritative.
#[derive(Debug, Default)]
pub struct Calendar {
    slots: Vec<Slot>,
}

impl Calendar {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Insert a slot maintaining sort order by check-in date.
    pub fn insert(&mut self, slot: Slot) {
        let pos = self
            .slots
            .binary_search_by_key(&slot.range.check_in, |s| s.range.check_in)
            .unwrap_or_else(|e| e);
        self.slots.insert(pos, slot);
    }

    pub fn remove(&mut self, booking_id: Ulid) -> Option<Slot> {
        let pos = self.slots.iter().position(|s| s.booking_id == booking_id)?;
        Some(self.slots.remove(pos))
    }

    pub fn get(&self, booking_id: Ulid) -> Option<&Slot> {
        self.slots.iter().find(|s| s.booking_id == booking_id)
    }

    /// Replace the kind of an existing slot. No-op if the booking has no slot.
    pub fn set_kind(&mut self, booking_id: Ulid, kind: SlotKind) {
        if let Some(slot) = self.slots.iter_mut().find(|s| s.booking_id == booking_id) {
            slot.kind = kind;
        }
    }

    /// Slots whose range overlaps the query. Binary search skips slots
    /// checking in at or after `query.check_out`.
    pub fn overlapping<'a>(&'a self, query: &'a DateRange) -> impl Iterator<Item = &'a Slot> {
        let right_bound = self
            .slots
            .partition_point(|s| s.range.check_in < query.check_out);
        self.slots[..right_bound]
            .iter()
            .filter(move |s| s.range.check_out > query.check_in)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Slot> {
        self.slots.iter()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

// ── Query result types ───────────────────────────────────────────

/// One date-picker cell: can this night be booked, and at what rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayAvailability {
    pub date: NaiveDate,
    pub available: bool,
    pub weekend: bool,
    pub price: Baht,
}

// ── WAL record format ────────────────────────────────────────────

/// The event types — flat, no nesting. Replay rebuilds all state from these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    RateCardSet {
        card: RateCard,
        at: Ms,
    },
    BookingCreated {
        id: Ulid,
        range: DateRange,
        guests: u32,
        total_price: Baht,
        note: Option<String>,
        expires_at: Ms,
        at: Ms,
    },
    CustomerInfoSet {
        id: Ulid,
        customer: CustomerInfo,
        at: Ms,
    },
    PaymentMethodSelected {
        id: Ulid,
        method: PaymentMethod,
        deadline: Ms,
        at: Ms,
    },
    SlipAttached {
        id: Ulid,
        slip_ref: String,
        at: Ms,
    },
    StatusChanged {
        id: Ulid,
        status: BookingStatus,
        at: Ms,
    },
    BookingDeleted {
        id: Ulid,
    },
}

/// Extract the booking id from an event. `RateCardSet` has none.
pub fn event_booking_id(event: &Event) -> Option<Ulid> {
    match event {
        Event::BookingCreated { id, .. }
        | Event::CustomerInfoSet { id, .. }
        | Event::PaymentMethodSelected { id, .. }
        | Event::SlipAttached { id, .. }
        | Event::StatusChanged { id, .. }
        | Event::BookingDeleted { id } => Some(*id),
        Event::RateCardSet { .. } => None,
    }
}
