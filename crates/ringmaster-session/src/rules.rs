//! The `MinigameRules` trait: what a minigame author writes.
//!
//! The session machinery handles rosters, countdowns, progress, and
//! teardown. A minigame only says how its sessions are shaped and what
//! earns points.

use ringmaster_core::PlayerId;

use crate::{GameSession, SessionConfig, SessionEvent};

/// Points to add to one player's ledger record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreAward {
    pub player: PlayerId,
    /// May be negative (penalties).
    pub points: i64,
    /// Free text for logs.
    pub reason: String,
}

impl ScoreAward {
    pub fn new(player: PlayerId, points: i64, reason: impl Into<String>) -> Self {
        Self {
            player,
            points,
            reason: reason.into(),
        }
    }
}

/// Per-minigame rules. All functions are static: a minigame carries no
/// state of its own beyond what the session tracks.
pub trait MinigameRules: Send + Sync + 'static {
    /// Display name, and the ledger bucket its points go to.
    fn name() -> &'static str;

    /// Shape of every session this minigame runs. Default: solo, 2–8
    /// players, 10 second countdown, ends when everyone is done.
    fn session_config() -> SessionConfig {
        SessionConfig::default()
    }

    /// Points earned by one session event (checkpoint, finish, kill, ...).
    ///
    /// Called for every event in order. `session` is the state after the
    /// operation that produced the event. Default: nothing.
    fn awards(_session: &GameSession, _event: &SessionEvent) -> Vec<ScoreAward> {
        Vec::new()
    }

    /// Points earned just by lasting, consulted once per in-game clock
    /// tick. Default: nothing.
    fn periodic_awards(_session: &GameSession) -> Vec<ScoreAward> {
        Vec::new()
    }
}
