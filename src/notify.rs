use dashmap::DashMap;
use tokio::sync::broadcast;
use ulid::Ulid;

use crate::model::{Baht, Booking, BookingStatus, DateRange};

const CHANNEL_CAPACITY: usize = 256;

/// The booking summary handed to notification collaborators. The engine
/// never waits on delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub booking_id: Ulid,
    pub status: BookingStatus,
    pub range: DateRange,
    pub total_price: Baht,
}

impl Notification {
    pub fn summarize(b: &Booking) -> Self {
        Self {
            booking_id: b.id,
            status: b.status,
            range: b.range,
            total_price: b.total_price,
        }
    }
}

/// Fire-and-forget broadcast hub. Email/LINE senders subscribe to the
/// firehose or to a single booking; a send with no listeners is a no-op
/// and a lagging listener only loses its own backlog.
pub struct NotifyHub {
    firehose: broadcast::Sender<Notification>,
    channels: DashMap<Ulid, broadcast::Sender<Notification>>,
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyHub {
    pub fn new() -> Self {
        Self {
            firehose: broadcast::channel(CHANNEL_CAPACITY).0,
            channels: DashMap::new(),
        }
    }

    /// Every notification from every booking.
    pub fn subscribe_all(&self) -> broadcast::Receiver<Notification> {
        self.firehose.subscribe()
    }

    /// Notifications for one booking. Creates the channel if needed.
    pub fn subscribe(&self, booking_id: Ulid) -> broadcast::Receiver<Notification> {
        let sender = self
            .channels
            .entry(booking_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        sender.subscribe()
    }

    /// Send a notification. Never blocks, never fails the caller.
    pub fn send(&self, notification: Notification) {
        if let Some(sender) = self.channels.get(&notification.booking_id) {
            let _ = sender.send(notification.clone());
        }
        let _ = self.firehose.send(notification);
    }

    /// Drop a booking's channel (e.g. after retention deletion).
    pub fn remove(&self, booking_id: &Ulid) {
        self.channels.remove(booking_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn notification(booking_id: Ulid, status: BookingStatus) -> Notification {
        Notification {
            booking_id,
            status,
            range: DateRange::new(
                NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
                NaiveDate::from_ymd_opt(2025, 7, 3).unwrap(),
            ),
            total_price: 2000,
        }
    }

    #[tokio::test]
    async fn per_booking_subscribe_and_receive() {
        let hub = NotifyHub::new();
        let id = Ulid::new();
        let mut rx = hub.subscribe(id);

        let n = notification(id, BookingStatus::Pending);
        hub.send(n.clone());

        assert_eq!(rx.recv().await.unwrap(), n);
    }

    #[tokio::test]
    async fn firehose_sees_every_booking() {
        let hub = NotifyHub::new();
        let mut rx = hub.subscribe_all();

        let a = notification(Ulid::new(), BookingStatus::Pending);
        let b = notification(Ulid::new(), BookingStatus::Confirmed);
        hub.send(a.clone());
        hub.send(b.clone());

        assert_eq!(rx.recv().await.unwrap(), a);
        assert_eq!(rx.recv().await.unwrap(), b);
    }

    #[tokio::test]
    async fn send_without_subscribers_is_noop() {
        let hub = NotifyHub::new();
        // No subscriber — must not panic or block.
        hub.send(notification(Ulid::new(), BookingStatus::Cancelled));
    }
}
