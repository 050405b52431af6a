mod availability;
mod conflict;
mod error;
pub mod lifecycle;
mod mutations;
mod pricing;
mod queries;
mod store;

pub use availability::{day_calendar, range_is_free};
pub use error::EngineError;
pub use lifecycle::{can_transition, effective_status, is_overdue};
pub use pricing::{compute_total_price, nightly_rate};
pub use store::{BookingStore, SharedBooking};

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, OwnedRwLockWriteGuard, RwLock};
use ulid::Ulid;

use crate::config::LifecyclePolicy;
use crate::model::*;
use crate::notify::{Notification, NotifyHub};
use crate::wal::Wal;

// ── Group-commit WAL channel ─────────────────────────────

pub(super) enum WalCommand {
    Append {
        event: Event,
        response: oneshot::Sender<io::Result<()>>,
    },
    Compact {
        events: Vec<Event>,
        response: oneshot::Sender<io::Result<()>>,
    },
    AppendsSinceCompact {
        response: oneshot::Sender<u64>,
    },
}

/// Background task that owns the WAL and batches appends for group commit.
/// 1. Block until the first Append arrives.
/// 2. Buffer it (no fsync).
/// 3. Drain all immediately available Appends (the batch window).
/// 4. Single flush_sync for the whole batch.
/// 5. Respond Ok to all senders.
async fn wal_writer_loop(mut wal: Wal, mut rx: mpsc::Receiver<WalCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            WalCommand::Append { event, response } => {
                let mut batch = vec![(event, response)];

                // Drain all immediately available appends
                loop {
                    match rx.try_recv() {
                        Ok(WalCommand::Append { event, response }) => {
                            batch.push((event, response));
                        }
                        Ok(other) => {
                            // Flush current batch first, then handle the non-append command
                            flush_and_respond(&mut wal, &mut batch);
                            handle_non_append(&mut wal, other);
                            break;
                        }
                        Err(_) => break, // channel empty — flush batch
                    }
                }

                if !batch.is_empty() {
                    flush_and_respond(&mut wal, &mut batch);
                }
            }
            other => handle_non_append(&mut wal, other),
        }
    }
}

fn flush_and_respond(wal: &mut Wal, batch: &mut Vec<(Event, oneshot::Sender<io::Result<()>>)>) {
    metrics::histogram!(crate::observability::WAL_FLUSH_BATCH_SIZE).record(batch.len() as f64);
    let flush_start = std::time::Instant::now();
    let result = flush_batch(wal, batch);
    metrics::histogram!(crate::observability::WAL_FLUSH_DURATION_SECONDS)
        .record(flush_start.elapsed().as_secs_f64());
    for (_, tx) in batch.drain(..) {
        let r = match &result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = tx.send(r);
    }
}

fn flush_batch(wal: &mut Wal, batch: &[(Event, oneshot::Sender<io::Result<()>>)]) -> io::Result<()> {
    let mut append_err: Option<io::Error> = None;
    for (event, _) in batch.iter() {
        if let Err(e) = wal.append_buffered(event) {
            append_err = Some(e);
            break;
        }
    }
    // Always flush — even on append error — so partially buffered bytes
    // don't leak into the next batch (callers were told this batch failed).
    let flush_err = wal.flush_sync().err();
    if let Some(e) = append_err {
        return Err(e);
    }
    if let Some(e) = flush_err {
        return Err(e);
    }
    Ok(())
}

fn handle_non_append(wal: &mut Wal, cmd: WalCommand) {
    match cmd {
        WalCommand::Compact { events, response } => {
            let result = Wal::write_compact_file(wal.path(), &events)
                .and_then(|()| wal.swap_compact_file());
            let _ = response.send(result);
        }
        WalCommand::AppendsSinceCompact { response } => {
            let _ = response.send(wal.appends_since_compact());
        }
        WalCommand::Append { .. } => unreachable!(),
    }
}

/// The booking engine: store + WAL + notification hub + lifecycle policy.
/// Every external operation — creation, transitions, queries, sweeping —
/// enters through here.
pub struct Engine {
    pub(super) store: BookingStore,
    rate_card: RwLock<Option<RateCard>>,
    pub(super) wal_tx: mpsc::Sender<WalCommand>,
    pub notify: Arc<NotifyHub>,
    pub(super) policy: LifecyclePolicy,
}

impl Engine {
    pub fn new(
        wal_path: PathBuf,
        notify: Arc<NotifyHub>,
        policy: LifecyclePolicy,
    ) -> io::Result<Self> {
        let events = Wal::replay(&wal_path)?;
        let wal = Wal::open(&wal_path)?;
        let (wal_tx, wal_rx) = mpsc::channel(4096);
        tokio::spawn(wal_writer_loop(wal, wal_rx));

        let engine = Self {
            store: BookingStore::new(),
            rate_card: RwLock::new(None),
            wal_tx,
            notify,
            policy,
        };

        // Replay — we're the sole owner of these Arcs, so try_read/try_write
        // always succeed instantly (no contention). Never use blocking_write
        // here because this may run inside an async context.
        for event in &events {
            engine.replay_apply(event);
        }

        Ok(engine)
    }

    fn replay_apply(&self, event: &Event) {
        match event {
            Event::RateCardSet { card, .. } => {
                *self
                    .rate_card
                    .try_write()
                    .expect("replay: uncontended write") = Some(*card);
            }
            Event::BookingCreated { .. } => {
                if let Some(b) = BookingStore::materialize(event) {
                    let mut cal = self
                        .store
                        .calendar()
                        .try_write()
                        .expect("replay: uncontended write");
                    BookingStore::refresh_slot(&mut cal, &b);
                    drop(cal);
                    self.store.insert(b.id, Arc::new(RwLock::new(b)));
                }
            }
            Event::BookingDeleted { id } => {
                self.store
                    .calendar()
                    .try_write()
                    .expect("replay: uncontended write")
                    .remove(*id);
                self.store.remove(id);
            }
            other => {
                if let Some(id) = event_booking_id(other)
                    && let Some(shared) = self.store.get(&id)
                {
                    let mut guard = shared.try_write().expect("replay: uncontended write");
                    self.store.apply_event(&mut guard, other);
                    let mut cal = self
                        .store
                        .calendar()
                        .try_write()
                        .expect("replay: uncontended write");
                    BookingStore::refresh_slot(&mut cal, &guard);
                }
            }
        }
    }

    /// Write event to WAL via the background group-commit writer.
    pub(super) async fn wal_append(&self, event: &Event) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Append {
                event: event.clone(),
                response: tx,
            })
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::WalError(e.to_string()))
    }

    /// WAL-append + apply + slot refresh + notify in one call — the shared
    /// tail of every transition.
    pub(super) async fn persist_and_apply(
        &self,
        guard: &mut Booking,
        event: &Event,
    ) -> Result<(), EngineError> {
        self.wal_append(event).await?;
        self.store.apply_event(guard, event);
        let mut cal = self.store.calendar().write().await;
        BookingStore::refresh_slot(&mut cal, guard);
        drop(cal);
        self.notify.send(Notification::summarize(guard));
        metrics::counter!(
            crate::observability::TRANSITIONS_TOTAL,
            "status" => guard.status.as_str()
        )
        .increment(1);
        Ok(())
    }

    /// Fetch a booking for mutation and enforce the caller's optimistic
    /// version. Losing a race yields `ConcurrentModification`; the caller
    /// re-fetches and retries.
    pub(super) async fn booking_write(
        &self,
        id: Ulid,
        expected_version: u64,
    ) -> Result<OwnedRwLockWriteGuard<Booking>, EngineError> {
        let shared = self.store.get(&id).ok_or(EngineError::NotFound(id))?;
        let guard = shared.write_owned().await;
        if guard.version != expected_version {
            return Err(EngineError::ConcurrentModification {
                id,
                expected: expected_version,
                actual: guard.version,
            });
        }
        Ok(guard)
    }

    /// The current rate card, or `RateCardMissing` before first configuration.
    pub async fn current_rate_card(&self) -> Result<RateCard, EngineError> {
        (*self.rate_card.read().await).ok_or(EngineError::RateCardMissing)
    }
}
