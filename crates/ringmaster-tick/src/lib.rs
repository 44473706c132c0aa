//! Pausable fixed-rate clock for Ringmaster.
//!
//! Each session actor owns one [`TickScheduler`]. It stays paused while the
//! session waits in its lobby, is restarted when a countdown begins (so the
//! first second is a full second), and keeps ticking while the game is live
//! to drive time limits and periodic awards.
//!
//! # Integration
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         cmd = cmd_rx.recv() => { /* handle commands */ }
//!         tick = clock.wait_for_tick() => {
//!             // Re-check session state before acting: it may have
//!             // changed since this tick was scheduled.
//!         }
//!     }
//! }
//! ```
//!
//! A rate of 0 means the clock never fires, whatever its pause state.

use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for a [`TickScheduler`].
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Ticks per second. 0 = never fires.
    pub tick_rate_hz: u32,
    /// Whether the clock is created paused.
    pub start_paused: bool,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 1,
            start_paused: true,
        }
    }
}

impl TickConfig {
    /// Fastest supported rate; one world tick at 20 Hz.
    pub const MAX_TICK_RATE_HZ: u32 = 20;

    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self {
            tick_rate_hz,
            ..Default::default()
        }
    }

    /// Caps the rate at [`Self::MAX_TICK_RATE_HZ`].
    pub fn validated(mut self) -> Self {
        if self.tick_rate_hz > Self::MAX_TICK_RATE_HZ {
            warn!(
                rate = self.tick_rate_hz,
                max = Self::MAX_TICK_RATE_HZ,
                "tick_rate_hz exceeds maximum, clamping"
            );
            self.tick_rate_hz = Self::MAX_TICK_RATE_HZ;
        }
        self
    }

    /// Duration of one tick, or `None` when the rate is 0.
    pub fn tick_duration(&self) -> Option<Duration> {
        if self.tick_rate_hz == 0 {
            None
        } else {
            Some(Duration::from_secs_f64(1.0 / self.tick_rate_hz as f64))
        }
    }
}

// ---------------------------------------------------------------------------
// Tick info
// ---------------------------------------------------------------------------

/// Returned by [`TickScheduler::wait_for_tick`].
#[derive(Debug, Clone)]
pub struct TickInfo {
    /// Ticks since the last (re)start, starting at 1.
    pub tick: u64,
    /// Fixed duration of one tick.
    pub dt: Duration,
    /// Whole ticks missed because the owner was busy; they are not replayed.
    pub ticks_skipped: u64,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Fixed-rate, pausable tick source for one session actor.
pub struct TickScheduler {
    tick_duration: Option<Duration>,
    tick_count: u64,
    next_tick: Option<Instant>,
    paused: bool,
}

impl TickScheduler {
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();
        let tick_duration = config.tick_duration();
        let next_tick = tick_duration.map(|d| Instant::now() + d);

        debug!(
            rate_hz = config.tick_rate_hz,
            paused = config.start_paused,
            "tick scheduler created"
        );

        Self {
            tick_duration,
            tick_count: 0,
            next_tick,
            paused: config.start_paused,
        }
    }

    /// A running scheduler at `tick_rate_hz`.
    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self::new(TickConfig {
            tick_rate_hz,
            start_paused: false,
        })
    }

    /// Resolves when the next tick is due.
    ///
    /// Pends forever while paused or at rate 0, which leaves the other
    /// branches of a `tokio::select!` free to run. Late wake-ups skip ahead
    /// rather than bursting: the next tick is scheduled from now.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        let (next, dur) = match (self.next_tick, self.tick_duration) {
            (Some(next), Some(dur)) if !self.paused => (next, dur),
            _ => std::future::pending().await,
        };

        time::sleep_until(next).await;

        let now = Instant::now();
        let late_by = now.saturating_duration_since(next);
        let ticks_skipped = (late_by.as_nanos() / dur.as_nanos()) as u64;
        if ticks_skipped > 0 {
            warn!(
                tick = self.tick_count + 1,
                skipped = ticks_skipped,
                late_ms = late_by.as_secs_f64() * 1000.0,
                "tick overrun, skipping ahead"
            );
        }

        self.tick_count += 1;
        self.next_tick = Some(now + dur);
        trace!(tick = self.tick_count, "tick fired");

        TickInfo {
            tick: self.tick_count,
            dt: dur,
            ticks_skipped,
        }
    }

    /// Stops ticking. Idempotent.
    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            debug!(tick = self.tick_count, "tick scheduler paused");
        }
    }

    /// Continues ticking one full period from now. Idempotent.
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            self.reschedule();
            debug!(tick = self.tick_count, "tick scheduler resumed");
        }
    }

    /// Unpauses, zeroes the tick count, and schedules the first tick one
    /// full period from now.
    pub fn restart(&mut self) {
        self.paused = false;
        self.tick_count = 0;
        self.reschedule();
        debug!("tick scheduler restarted");
    }

    fn reschedule(&mut self) {
        if let Some(dur) = self.tick_duration {
            self.next_tick = Some(Instant::now() + dur);
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Whether the rate is 0.
    pub fn is_idle(&self) -> bool {
        self.tick_duration.is_none()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn tick_duration(&self) -> Option<Duration> {
        self.tick_duration
    }
}
