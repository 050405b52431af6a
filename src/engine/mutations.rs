use std::sync::Arc;

use tokio::sync::{oneshot, RwLock};
use ulid::Ulid;

use crate::config::Retention;
use crate::limits::*;
use crate::model::*;
use crate::notify::Notification;

use super::conflict::{check_no_conflict, now_ms, validate_range};
use super::lifecycle::{self, guard};
use super::pricing::compute_total_price;
use super::{BookingStore, Engine, EngineError, WalCommand};

fn validate_customer(customer: &CustomerInfo) -> Result<(), EngineError> {
    if customer.first_name.is_empty() || customer.last_name.is_empty() {
        return Err(EngineError::LimitExceeded("customer name required"));
    }
    if customer.first_name.len() > MAX_NAME_LEN || customer.last_name.len() > MAX_NAME_LEN {
        return Err(EngineError::LimitExceeded("customer name too long"));
    }
    if customer.email.len() > MAX_CONTACT_LEN || customer.phone.len() > MAX_CONTACT_LEN {
        return Err(EngineError::LimitExceeded("contact field too long"));
    }
    Ok(())
}

impl Engine {
    /// Accept a reservation request: price the stay, verify the dates are
    /// free and persist a `pending` hold with its first expiry deadline.
    ///
    /// The calendar write lock spans conflict-check + insert, so two
    /// concurrent requests for overlapping dates serialize here and the
    /// loser gets `Unavailable` — the check-then-act race never commits
    /// two overlapping holds.
    pub async fn create_booking(
        &self,
        id: Ulid,
        range: DateRange,
        guests: u32,
        note: Option<String>,
    ) -> Result<Booking, EngineError> {
        if self.store.booking_count() >= MAX_BOOKINGS {
            return Err(EngineError::LimitExceeded("too many bookings"));
        }
        validate_range(range.check_in, range.check_out)?;
        if let Some(ref n) = note
            && n.len() > MAX_NOTE_LEN
        {
            return Err(EngineError::LimitExceeded("note too long"));
        }
        if self.store.contains(&id) {
            return Err(EngineError::AlreadyExists(id));
        }

        let card = self.current_rate_card().await?;
        if guests == 0 || guests > card.max_guests {
            return Err(EngineError::InvalidGuests { guests, max: card.max_guests });
        }
        let total_price = compute_total_price(range.check_in, range.check_out, &card)?;

        let now = now_ms();
        let mut cal = self.store.calendar().write().await;
        check_no_conflict(&cal, &range, now)?;

        let event = Event::BookingCreated {
            id,
            range,
            guests,
            total_price,
            note,
            expires_at: now + self.policy.hold_window_ms,
            at: now,
        };
        self.wal_append(&event).await?;

        let booking = BookingStore::materialize(&event)
            .ok_or(EngineError::WalError("materialize on non-create event".into()))?;
        BookingStore::refresh_slot(&mut cal, &booking);
        drop(cal);
        self.store.insert(id, Arc::new(RwLock::new(booking.clone())));

        self.notify.send(Notification::summarize(&booking));
        metrics::counter!(crate::observability::BOOKINGS_CREATED_TOTAL).increment(1);
        Ok(booking)
    }

    /// Record the guest's identity. Allowed while the booking is still in
    /// the pre-payment flow (`pending` / `pending_payment`).
    pub async fn set_customer_info(
        &self,
        id: Ulid,
        expected_version: u64,
        customer: CustomerInfo,
    ) -> Result<Booking, EngineError> {
        validate_customer(&customer)?;
        let mut b = self.booking_write(id, expected_version).await?;
        if !matches!(b.status, BookingStatus::Pending | BookingStatus::PendingPayment) {
            return Err(EngineError::InvalidTransition {
                from: b.status,
                requested: BookingStatus::PendingPayment,
            });
        }
        let event = Event::CustomerInfoSet { id, customer, at: now_ms() };
        self.persist_and_apply(&mut b, &event).await?;
        Ok(b.clone())
    }

    /// Select (or change) the payment method. First selection moves the
    /// hold to `pending_payment` and starts the payment window; changing
    /// the method later does NOT refresh the deadline.
    pub async fn select_payment_method(
        &self,
        id: Ulid,
        expected_version: u64,
        method: PaymentMethod,
    ) -> Result<Booking, EngineError> {
        let mut b = self.booking_write(id, expected_version).await?;
        let now = now_ms();
        let deadline = match b.status {
            BookingStatus::Pending => {
                if b.customer.is_none() {
                    return Err(EngineError::CustomerInfoRequired);
                }
                guard(b.status, BookingStatus::PendingPayment)?;
                now + self.policy.payment_window_ms
            }
            // Method change while already awaiting payment keeps the deadline.
            BookingStatus::PendingPayment => match b.payment_deadline {
                Some(d) => d,
                None => now + self.policy.payment_window_ms,
            },
            _ => {
                return Err(EngineError::InvalidTransition {
                    from: b.status,
                    requested: BookingStatus::PendingPayment,
                })
            }
        };
        let event = Event::PaymentMethodSelected { id, method, deadline, at: now };
        self.persist_and_apply(&mut b, &event).await?;
        Ok(b.clone())
    }

    /// Record an uploaded payment slip. Accepted only while awaiting
    /// payment; the slip permanently protects the booking from expiry and
    /// moves it to `in_review`.
    pub async fn attach_slip(
        &self,
        id: Ulid,
        expected_version: u64,
        slip_ref: String,
    ) -> Result<Booking, EngineError> {
        if slip_ref.is_empty() || slip_ref.len() > MAX_SLIP_REF_LEN {
            return Err(EngineError::LimitExceeded("invalid slip reference"));
        }
        let mut b = self.booking_write(id, expected_version).await?;
        if b.status != BookingStatus::PendingPayment {
            return Err(EngineError::InvalidTransition {
                from: b.status,
                requested: BookingStatus::InReview,
            });
        }
        let event = Event::SlipAttached { id, slip_ref, at: now_ms() };
        self.persist_and_apply(&mut b, &event).await?;
        Ok(b.clone())
    }

    pub async fn confirm_booking(
        &self,
        id: Ulid,
        expected_version: u64,
    ) -> Result<Booking, EngineError> {
        self.transition(id, expected_version, BookingStatus::Confirmed).await
    }

    pub async fn cancel_booking(
        &self,
        id: Ulid,
        expected_version: u64,
    ) -> Result<Booking, EngineError> {
        self.transition(id, expected_version, BookingStatus::Cancelled).await
    }

    pub async fn check_in(&self, id: Ulid, expected_version: u64) -> Result<Booking, EngineError> {
        self.transition(id, expected_version, BookingStatus::CheckedIn).await
    }

    pub async fn check_out(&self, id: Ulid, expected_version: u64) -> Result<Booking, EngineError> {
        self.transition(id, expected_version, BookingStatus::CheckedOut).await
    }

    async fn transition(
        &self,
        id: Ulid,
        expected_version: u64,
        to: BookingStatus,
    ) -> Result<Booking, EngineError> {
        let mut b = self.booking_write(id, expected_version).await?;
        guard(b.status, to)?;
        let event = Event::StatusChanged { id, status: to, at: now_ms() };
        self.persist_and_apply(&mut b, &event).await?;
        Ok(b.clone())
    }

    /// Retention-policy removal. Only terminal bookings can be deleted;
    /// cancel first to free the dates.
    pub async fn delete_booking(&self, id: Ulid) -> Result<(), EngineError> {
        let shared = self.store.get(&id).ok_or(EngineError::NotFound(id))?;
        let b = shared.write_owned().await;
        if !b.status.is_terminal() {
            return Err(EngineError::InvalidTransition {
                from: b.status,
                requested: BookingStatus::Cancelled,
            });
        }
        let event = Event::BookingDeleted { id };
        self.wal_append(&event).await?;
        self.store.calendar().write().await.remove(id);
        drop(b);
        self.store.remove(&id);
        Ok(())
    }

    /// Replace the property rate card. Singleton, last write wins.
    pub async fn set_rate_card(&self, card: RateCard) -> Result<(), EngineError> {
        if card.weekday.regular < 0
            || card.weekend.regular < 0
            || card.weekday.discounted.is_some_and(|d| d < 0)
            || card.weekend.discounted.is_some_and(|d| d < 0)
        {
            return Err(EngineError::LimitExceeded("negative rate"));
        }
        if card.max_guests == 0 {
            return Err(EngineError::LimitExceeded("max_guests must be at least 1"));
        }
        let event = Event::RateCardSet { card, at: now_ms() };
        self.wal_append(&event).await?;
        *self.rate_card.write().await = Some(card);
        Ok(())
    }

    // ── Sweep support ────────────────────────────────────────

    /// Ids of bookings whose hold or payment deadline has passed.
    pub fn collect_overdue(&self, now: Ms) -> Vec<Ulid> {
        let mut overdue = Vec::new();
        for id in self.store.ids() {
            if let Some(shared) = self.store.get(&id)
                && let Ok(b) = shared.try_read()
                && lifecycle::is_overdue(&b, now)
            {
                overdue.push(id);
            }
        }
        overdue
    }

    /// Reclaim one overdue hold. Re-checks the overdue predicate under the
    /// write lock, so a racing slip upload or a second sweep pass is a
    /// no-op — returns `Ok(false)` when there was nothing left to reclaim.
    pub async fn expire_booking(&self, id: Ulid, now: Ms) -> Result<bool, EngineError> {
        let shared = self.store.get(&id).ok_or(EngineError::NotFound(id))?;
        let mut b = shared.write_owned().await;
        if !lifecycle::is_overdue(&b, now) {
            return Ok(false);
        }
        match self.policy.retention {
            Retention::Keep => {
                guard(b.status, BookingStatus::Expired)?;
                let event = Event::StatusChanged { id, status: BookingStatus::Expired, at: now };
                self.persist_and_apply(&mut b, &event).await?;
            }
            Retention::Delete => {
                let event = Event::BookingDeleted { id };
                self.wal_append(&event).await?;
                self.store.calendar().write().await.remove(id);
                drop(b);
                self.store.remove(&id);
            }
        }
        metrics::counter!(crate::observability::SWEEP_RECLAIMED_TOTAL).increment(1);
        Ok(true)
    }

    // ── WAL compaction ───────────────────────────────────────

    /// Compact the WAL by rewriting it with only the events needed to
    /// recreate the current state.
    pub async fn compact_wal(&self) -> Result<(), EngineError> {
        let mut events = Vec::new();
        if let Some(card) = *self.rate_card.read().await {
            events.push(Event::RateCardSet { card, at: now_ms() });
        }

        for id in self.store.ids() {
            let Some(shared) = self.store.get(&id) else { continue };
            let b = shared.read().await;
            events.push(Event::BookingCreated {
                id: b.id,
                range: b.range,
                guests: b.guests,
                total_price: b.total_price,
                note: b.note.clone(),
                expires_at: b.expires_at.unwrap_or(b.created_at),
                at: b.created_at,
            });
            if let Some(ref customer) = b.customer {
                events.push(Event::CustomerInfoSet {
                    id: b.id,
                    customer: customer.clone(),
                    at: b.updated_at,
                });
            }
            if let Some(method) = b.payment_method {
                events.push(Event::PaymentMethodSelected {
                    id: b.id,
                    method,
                    deadline: b.payment_deadline.unwrap_or(b.updated_at),
                    at: b.updated_at,
                });
            }
            if let Some(ref slip_ref) = b.slip_ref {
                events.push(Event::SlipAttached {
                    id: b.id,
                    slip_ref: slip_ref.clone(),
                    at: b.updated_at,
                });
            }
            // Pending / pending_payment / in_review are implied by the
            // events above; anything else needs an explicit status record.
            if !matches!(
                b.status,
                BookingStatus::Pending | BookingStatus::PendingPayment | BookingStatus::InReview
            ) {
                events.push(Event::StatusChanged {
                    id: b.id,
                    status: b.status,
                    at: b.updated_at,
                });
            }
        }

        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Compact { events, response: tx })
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::WalError(e.to_string()))
    }

    pub async fn wal_appends_since_compact(&self) -> u64 {
        let (tx, rx) = oneshot::channel();
        if self
            .wal_tx
            .send(WalCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}
