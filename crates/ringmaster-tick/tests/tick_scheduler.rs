//! Integration tests for the session clock.
//!
//! Uses `start_paused = true` so tokio auto-advances time and every
//! `sleep_until` resolves instantly and deterministically.

use std::time::Duration;

use ringmaster_tick::{TickConfig, TickScheduler};

// =========================================================================
// TickConfig
// =========================================================================

#[test]
fn test_default_config_is_one_hz_paused() {
    let cfg = TickConfig::default();
    assert_eq!(cfg.tick_rate_hz, 1);
    assert!(cfg.start_paused);
    assert_eq!(cfg.tick_duration(), Some(Duration::from_secs(1)));
}

#[test]
fn test_zero_rate_has_no_duration() {
    assert_eq!(TickConfig::with_rate(0).tick_duration(), None);
}

#[test]
fn test_validated_clamps_rate() {
    let cfg = TickConfig::with_rate(500).validated();
    assert_eq!(cfg.tick_rate_hz, TickConfig::MAX_TICK_RATE_HZ);
}

#[test]
fn test_with_rate_scheduler_runs_unpaused() {
    let s = TickScheduler::with_rate(20);
    assert!(!s.is_paused());
    assert!(!s.is_idle());
    assert_eq!(s.tick_duration(), Some(Duration::from_millis(50)));
}

// =========================================================================
// Firing
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_wait_for_tick_counts_monotonically() {
    let mut s = TickScheduler::with_rate(1);

    for expected in 1..=4 {
        let info = s.wait_for_tick().await;
        assert_eq!(info.tick, expected);
        assert_eq!(info.dt, Duration::from_secs(1));
        assert_eq!(info.ticks_skipped, 0);
    }
    assert_eq!(s.tick_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_tick_waits_a_full_period() {
    let mut s = TickScheduler::with_rate(1);
    let start = tokio::time::Instant::now();

    s.wait_for_tick().await;

    assert!(start.elapsed() >= Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn test_zero_rate_never_fires() {
    let mut s = TickScheduler::with_rate(0);
    assert!(s.is_idle());

    let result = tokio::time::timeout(Duration::from_secs(60), s.wait_for_tick()).await;
    assert!(result.is_err(), "rate 0 should pend forever");
}

// =========================================================================
// Pause / resume / restart
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_default_scheduler_starts_paused() {
    let mut s = TickScheduler::new(TickConfig::default());
    assert!(s.is_paused());

    let result = tokio::time::timeout(Duration::from_secs(10), s.wait_for_tick()).await;
    assert!(result.is_err(), "paused scheduler should pend");
}

#[tokio::test(start_paused = true)]
async fn test_resume_continues_count() {
    let mut s = TickScheduler::with_rate(1);
    s.wait_for_tick().await;
    s.pause();
    s.resume();

    let info = s.wait_for_tick().await;
    assert_eq!(info.tick, 2);
}

#[tokio::test(start_paused = true)]
async fn test_restart_resets_count_and_unpauses() {
    let mut s = TickScheduler::new(TickConfig::default());
    s.restart();
    s.wait_for_tick().await;
    s.wait_for_tick().await;

    s.restart();
    assert_eq!(s.tick_count(), 0);
    let info = s.wait_for_tick().await;
    assert_eq!(info.tick, 1);
}

#[tokio::test]
async fn test_pause_resume_idempotent() {
    let mut s = TickScheduler::with_rate(1);
    s.pause();
    s.pause();
    assert!(s.is_paused());
    s.resume();
    s.resume();
    assert!(!s.is_paused());
}
