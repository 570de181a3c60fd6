//! Integration tests for the timer service.
//!
//! Every test runs with paused time: the runtime auto-advances the clock
//! to the next pending timer whenever all tasks are idle, so multi-second
//! delays resolve instantly and deterministically.

use std::time::Duration;

use quizbuzz_timer::{RoundVersion, TimerService};
use tokio::sync::mpsc;
use tokio::time::Instant;

#[derive(Debug, PartialEq)]
enum Tick {
    Expire(RoundVersion),
    Advance(RoundVersion),
}

#[tokio::test(start_paused = true)]
async fn test_delivers_after_delay() {
    let (tx, mut rx) = mpsc::channel(8);
    let timers = TimerService::new(&tx);
    let start = Instant::now();

    timers.schedule(Duration::from_secs(5), Tick::Expire(RoundVersion::new(1)));

    let early = tokio::time::timeout(Duration::from_secs(4), rx.recv()).await;
    assert!(early.is_err(), "must not deliver before the delay");

    let event = rx.recv().await;
    assert_eq!(event, Some(Tick::Expire(RoundVersion::new(1))));
    assert!(start.elapsed() >= Duration::from_secs(5));
    assert_eq!(timers.counts().delivered, 1);
}

#[tokio::test(start_paused = true)]
async fn test_shorter_delay_arrives_first() {
    let (tx, mut rx) = mpsc::channel(8);
    let timers = TimerService::new(&tx);

    timers.schedule(Duration::from_secs(3), Tick::Advance(RoundVersion::new(0)));
    timers.schedule(Duration::from_secs(1), Tick::Expire(RoundVersion::new(0)));

    assert_eq!(rx.recv().await, Some(Tick::Expire(RoundVersion::new(0))));
    assert_eq!(rx.recv().await, Some(Tick::Advance(RoundVersion::new(0))));
}

#[tokio::test(start_paused = true)]
async fn test_pending_timer_does_not_keep_queue_open() {
    let (tx, mut rx) = mpsc::channel::<Tick>(8);
    let timers = TimerService::new(&tx);
    let pending = timers.schedule(Duration::from_secs(30), Tick::Advance(RoundVersion::new(2)));

    drop(tx);
    assert_eq!(rx.recv().await, None, "queue closes once strong senders are gone");

    pending.await.unwrap();
    let counts = timers.counts();
    assert_eq!(counts.scheduled, 1);
    assert_eq!(counts.delivered, 0);
    assert_eq!(counts.dropped, 1);
    assert_eq!(counts.pending(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_clones_share_counters() {
    let (tx, mut rx) = mpsc::channel(8);
    let timers = TimerService::new(&tx);
    let other = timers.clone();

    other.schedule(Duration::from_millis(10), Tick::Expire(RoundVersion::new(3)));
    assert!(rx.recv().await.is_some());

    assert_eq!(timers.counts().scheduled, 1);
    assert_eq!(timers.counts().delivered, 1);
}
