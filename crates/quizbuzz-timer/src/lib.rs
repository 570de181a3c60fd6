//! Delayed delivery of events into an actor's own command queue.
//!
//! A room actor never sleeps inside its loop. When it needs something to
//! happen later (an answer window expiring, the pause before the next
//! question) it asks a [`TimerService`] to post an event back into its
//! queue after a delay. The event then goes through the same serialized
//! path as any player command.
//!
//! Timers are never cancelled. Instead every event carries the
//! [`RoundVersion`] that was current when it was scheduled, and the actor
//! discards deliveries whose version no longer matches.
//!
//! The service only holds a *weak* sender, so a pending timer does not
//! keep a room's channel open: once every strong sender is gone the
//! delivery is dropped and counted as such.
//!
//! ```ignore
//! let (tx, rx) = mpsc::channel(64);
//! let timers = TimerService::new(&tx);
//! timers.schedule(Duration::from_secs(3), RoomCommand::Advance { version });
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::trace;

// ---------------------------------------------------------------------------
// RoundVersion
// ---------------------------------------------------------------------------

/// Counter bumped on every question transition of a room.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RoundVersion(u64);

impl RoundVersion {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// The version that follows this one.
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RoundVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Counters
// ---------------------------------------------------------------------------

/// Point-in-time view of a service's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimerCounts {
    pub scheduled: u64,
    pub delivered: u64,
    /// Deliveries that found the target queue gone.
    pub dropped: u64,
}

impl TimerCounts {
    /// Timers that have neither delivered nor dropped yet.
    pub fn pending(&self) -> u64 {
        self.scheduled - self.delivered - self.dropped
    }
}

#[derive(Debug, Default)]
struct Counters {
    scheduled: AtomicU64,
    delivered: AtomicU64,
    dropped: AtomicU64,
}

// ---------------------------------------------------------------------------
// TimerService
// ---------------------------------------------------------------------------

/// Posts events into an mpsc queue after a delay.
pub struct TimerService<E> {
    target: mpsc::WeakSender<E>,
    counters: Arc<Counters>,
}

impl<E> Clone for TimerService<E> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
            counters: Arc::clone(&self.counters),
        }
    }
}

impl<E: Send + 'static> TimerService<E> {
    /// Creates a service that delivers into the queue behind `target`
    /// without holding it open.
    pub fn new(target: &mpsc::Sender<E>) -> Self {
        Self {
            target: target.downgrade(),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Delivers `event` after `delay`. The returned handle is only useful
    /// to tests that want to await the delivery attempt.
    pub fn schedule(&self, delay: Duration, event: E) -> JoinHandle<()> {
        self.counters.scheduled.fetch_add(1, Ordering::Relaxed);
        let target = self.target.clone();
        let counters = Arc::clone(&self.counters);

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let Some(sender) = target.upgrade() else {
                trace!(?delay, "timer target gone, dropping delivery");
                counters.dropped.fetch_add(1, Ordering::Relaxed);
                return;
            };

            if sender.send(event).await.is_ok() {
                counters.delivered.fetch_add(1, Ordering::Relaxed);
            } else {
                trace!(?delay, "timer target closed, dropping delivery");
                counters.dropped.fetch_add(1, Ordering::Relaxed);
            }
        })
    }

    pub fn counts(&self) -> TimerCounts {
        TimerCounts {
            scheduled: self.counters.scheduled.load(Ordering::Relaxed),
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_version_next_increments() {
        let v = RoundVersion::default();
        assert_eq!(v.get(), 0);
        assert_eq!(v.next().get(), 1);
        assert_eq!(v.next().next(), RoundVersion::new(2));
        assert!(v < v.next());
    }

    #[test]
    fn test_round_version_display() {
        assert_eq!(RoundVersion::new(4).to_string(), "v4");
    }

    #[test]
    fn test_pending_counts() {
        let counts = TimerCounts {
            scheduled: 5,
            delivered: 2,
            dropped: 1,
        };
        assert_eq!(counts.pending(), 2);
    }
}
