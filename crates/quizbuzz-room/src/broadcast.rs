//! Per-room event topics.

use quizbuzz_protocol::{RoomId, ServerEvent};
use tokio::sync::broadcast;

/// Fan-out of one room's events to every subscriber.
///
/// Publishing never blocks the room. A subscriber that falls more than
/// the channel capacity behind skips ahead and sees
/// [`broadcast::error::RecvError::Lagged`]; it should resync from a
/// snapshot. The topic closes once the room and every handle to it are
/// gone.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    room_id: RoomId,
    tx: broadcast::Sender<ServerEvent>,
}

impl Broadcaster {
    pub fn new(room_id: RoomId, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { room_id, tx }
    }

    /// Returns how many subscribers the event reached.
    pub fn publish(&self, event: ServerEvent) -> usize {
        let name = event.name();
        // No subscribers is fine: the room keeps going without an audience.
        let reached = self.tx.send(event).unwrap_or(0);
        tracing::trace!(room_id = %self.room_id, event = name, reached, "published");
        reached
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_see_events_in_order() {
        let topic = Broadcaster::new(RoomId(1), 8);
        let mut a = topic.subscribe();
        let mut b = topic.subscribe();

        assert_eq!(topic.publish(ServerEvent::BuzzerSound), 2);
        topic.publish(ServerEvent::CorrectAnswer);

        for rx in [&mut a, &mut b] {
            assert_eq!(rx.recv().await.unwrap(), ServerEvent::BuzzerSound);
            assert_eq!(rx.recv().await.unwrap(), ServerEvent::CorrectAnswer);
        }
    }

    #[test]
    fn test_publish_without_subscribers_is_harmless() {
        let topic = Broadcaster::new(RoomId(1), 8);
        assert_eq!(topic.subscriber_count(), 0);
        assert_eq!(topic.publish(ServerEvent::IncorrectAnswer), 0);
    }

    #[tokio::test]
    async fn test_slow_subscriber_lags() {
        let topic = Broadcaster::new(RoomId(1), 2);
        let mut rx = topic.subscribe();
        for _ in 0..5 {
            topic.publish(ServerEvent::BuzzerSound);
        }
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(3))
        ));
    }
}
