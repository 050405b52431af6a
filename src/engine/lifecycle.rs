//! The booking state machine: which status moves are legal, and how the
//! expiration fields follow the status. Pure functions over model types —
//! no I/O, no clocks; callers pass `now`.

use crate::model::{Booking, BookingStatus, Ms, SlotKind};

use super::EngineError;

/// Legal status moves. Forward-only along
/// `pending → pending_payment → in_review → confirmed → checked_in →
/// checked_out`; `cancelled` absorbs from any non-terminal state before
/// check-in, `expired` only from the two hold states.
pub fn can_transition(from: BookingStatus, to: BookingStatus) -> bool {
    use BookingStatus::*;
    if from.is_terminal() {
        return false;
    }
    match to {
        Pending => false,
        PendingPayment => matches!(from, Pending),
        InReview => matches!(from, PendingPayment),
        Confirmed => matches!(from, Pending | PendingPayment | InReview),
        CheckedIn => matches!(from, Confirmed),
        CheckedOut => matches!(from, CheckedIn),
        Cancelled => !matches!(from, CheckedIn),
        Expired => matches!(from, Pending | PendingPayment),
    }
}

/// `can_transition` as a guard; the error names both states.
pub fn guard(from: BookingStatus, to: BookingStatus) -> Result<(), EngineError> {
    if can_transition(from, to) {
        Ok(())
    } else {
        Err(EngineError::InvalidTransition { from, requested: to })
    }
}

/// Reconcile the expiration fields with the status. The deadline values
/// themselves are recorded by the events that set them; this clears
/// whichever no longer applies so that `can_expire == true` always means
/// exactly one deadline is live.
pub fn reconcile_expiry(b: &mut Booking) {
    match b.status {
        BookingStatus::Pending => {
            b.can_expire = true;
            b.payment_deadline = None;
        }
        BookingStatus::PendingPayment if b.slip_ref.is_none() => {
            b.can_expire = true;
            b.expires_at = None;
        }
        _ => {
            b.can_expire = false;
            b.expires_at = None;
            b.payment_deadline = None;
        }
    }
}

/// The single overdue predicate — shared by the sweeper, the conflict
/// check and every read path, so sweep latency never changes an answer.
pub fn is_overdue(b: &Booking, now: Ms) -> bool {
    if !b.can_expire {
        return false;
    }
    match (b.expires_at, b.payment_deadline) {
        (Some(t), None) | (None, Some(t)) => t <= now,
        _ => false,
    }
}

/// The status a reader should see at instant `now`: an overdue hold reads
/// as expired even before the sweeper has reclaimed it.
pub fn effective_status(b: &Booking, now: Ms) -> BookingStatus {
    if is_overdue(b, now) {
        BookingStatus::Expired
    } else {
        b.status
    }
}

/// The calendar slot a booking occupies, if any.
pub fn slot_kind_for(b: &Booking) -> Option<SlotKind> {
    match b.status {
        BookingStatus::Pending => Some(SlotKind::Hold {
            expires_at: b.expires_at.unwrap_or(0),
        }),
        BookingStatus::PendingPayment => Some(SlotKind::PaymentHold {
            deadline: b.payment_deadline.unwrap_or(0),
        }),
        BookingStatus::Cancelled | BookingStatus::Expired => None,
        _ => Some(SlotKind::Reserved),
    }
}

/// Structural invariants every transition must preserve. Returns the name
/// of the first violated rule.
pub fn check_invariants(b: &Booking) -> Result<(), &'static str> {
    if b.range.check_out <= b.range.check_in {
        return Err("check_out must be after check_in");
    }
    if b.total_price < 0 {
        return Err("total_price must be non-negative");
    }
    match (b.can_expire, b.expires_at, b.payment_deadline) {
        (true, Some(_), None) | (true, None, Some(_)) => {}
        (true, _, _) => return Err("can_expire requires exactly one live deadline"),
        (false, None, None) => {}
        (false, _, _) => return Err("deadlines must be cleared once expiry is off"),
    }
    if b.slip_ref.is_some() {
        if b.can_expire {
            return Err("a slip permanently protects the booking from expiry");
        }
        if matches!(
            b.status,
            BookingStatus::Pending | BookingStatus::PendingPayment | BookingStatus::Expired
        ) {
            return Err("a slip implies in_review or later");
        }
    }
    Ok(())
}
