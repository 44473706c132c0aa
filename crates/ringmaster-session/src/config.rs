//! Session configuration and state machine.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Roster shape
// ---------------------------------------------------------------------------

/// One selectable team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamSpec {
    pub name: String,
    pub capacity: usize,
    /// UI tag (wool colour, armour dye, ...). Opaque to the core.
    pub color: String,
}

impl TeamSpec {
    pub fn new(name: impl Into<String>, capacity: usize, color: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capacity,
            color: color.into(),
        }
    }
}

/// Whether participants play alone or in fixed teams.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RosterMode {
    Solo,
    Teams(Vec<TeamSpec>),
}

impl RosterMode {
    /// Total team slots, or `None` in solo mode.
    pub fn team_slots(&self) -> Option<usize> {
        match self {
            Self::Solo => None,
            Self::Teams(specs) => Some(specs.iter().map(|t| t.capacity).sum()),
        }
    }

    /// Caps `capacity` at the team slots when playing in teams.
    pub fn cap(&self, capacity: usize) -> usize {
        self.team_slots().map_or(capacity, |slots| capacity.min(slots))
    }
}

/// When a live session is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WinCondition {
    /// Ends once nobody is left racing (everyone finished, was
    /// eliminated, or left). First finisher's group wins.
    AllFinished,
    /// Ends once at most one team (or solo player) has anyone left.
    LastGroupStanding,
}

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Per-minigame session settings, supplied by
/// [`MinigameRules::session_config`](crate::MinigameRules::session_config).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Participants required before a countdown may start.
    pub min_players: usize,
    /// Hard cap on participants (further capped by the arena's own limit).
    pub max_players: usize,
    /// In team mode, at least one team must have this many members.
    pub min_team_size: usize,
    pub countdown_secs: u32,
    /// Start the countdown as soon as the minimum is met.
    pub auto_start: bool,
    pub roster: RosterMode,
    pub win_condition: WinCondition,
    /// Live sessions end when this elapses.
    pub time_limit: Option<Duration>,
    /// Session clock rate; drives the countdown and periodic awards.
    pub tick_rate_hz: u32,
}

impl SessionConfig {
    /// Largest roster a session can hold on an arena that takes at most
    /// `arena_max` players. In team mode the teams' combined slots are a
    /// limit too.
    pub fn capacity_on(&self, arena_max: usize) -> usize {
        self.roster.cap(self.max_players.min(arena_max))
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            min_players: 2,
            max_players: 8,
            min_team_size: 1,
            countdown_secs: 10,
            auto_start: true,
            roster: RosterMode::Solo,
            win_condition: WinCondition::AllFinished,
            time_limit: None,
            tick_rate_hz: 1,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// The lifecycle state of a session.
///
/// ```text
///            ┌──────(roster below minimum)──────┐
///            ▼                                  │
///         Lobby ──(minimum met / force)──→ Countdown ──(expiry)──→ InGame
///            │                                  │                    │
///            └──────────(emptied)───────────────┴────(win / end)─────┴──→ Finished
/// ```
///
/// - **Lobby**: joins, leaves, and team changes are free.
/// - **Countdown**: a timer runs; movement is frozen. Falls back to Lobby
///   if the roster drops below its minimum.
/// - **InGame**: checkpoint, finish, and elimination detection are live.
/// - **Finished**: terminal. Nothing else is processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    Lobby,
    Countdown,
    InGame,
    Finished,
}

impl SessionState {
    /// Whether new participants may join.
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::Lobby | Self::Countdown)
    }

    pub fn is_live(&self) -> bool {
        matches!(self, Self::InGame)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished)
    }

    /// Whether participant movement must be suppressed.
    pub fn movement_frozen(&self) -> bool {
        matches!(self, Self::Countdown)
    }

    /// Returns `true` if moving to `target` is a legal transition.
    pub fn can_transition_to(self, target: Self) -> bool {
        use SessionState::*;
        matches!(
            (self, target),
            (Lobby, Countdown)
                | (Lobby, Finished)
                | (Countdown, Lobby)
                | (Countdown, InGame)
                | (Countdown, Finished)
                | (InGame, Finished)
        )
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lobby => write!(f, "Lobby"),
            Self::Countdown => write!(f, "Countdown"),
            Self::InGame => write!(f, "InGame"),
            Self::Finished => write!(f, "Finished"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_state_transitions() {
        use SessionState::*;
        assert!(Lobby.can_transition_to(Countdown));
        assert!(Countdown.can_transition_to(Lobby));
        assert!(Countdown.can_transition_to(InGame));
        assert!(InGame.can_transition_to(Finished));
        assert!(!Lobby.can_transition_to(InGame));
        assert!(!InGame.can_transition_to(Lobby));
        assert!(!InGame.can_transition_to(Countdown));
        for s in [Lobby, Countdown, InGame, Finished] {
            assert!(!Finished.can_transition_to(s));
        }
    }

    #[test]
    fn test_session_state_predicates() {
        assert!(SessionState::Lobby.is_joinable());
        assert!(SessionState::Countdown.is_joinable());
        assert!(!SessionState::InGame.is_joinable());
        assert!(SessionState::Countdown.movement_frozen());
        assert!(!SessionState::InGame.movement_frozen());
        assert!(SessionState::Finished.is_terminal());
    }

    #[test]
    fn test_session_config_default() {
        let config = SessionConfig::default();
        assert_eq!(config.min_players, 2);
        assert_eq!(config.max_players, 8);
        assert_eq!(config.roster, RosterMode::Solo);
        assert!(config.auto_start);
        assert_eq!(config.time_limit, None);
    }

    #[test]
    fn test_capacity_limited_by_team_slots() {
        let teams = SessionConfig {
            roster: RosterMode::Teams(vec![TeamSpec::new("Red", 3, "red"), TeamSpec::new("Blue", 3, "blue")]),
            ..SessionConfig::default()
        };
        assert_eq!(teams.roster.team_slots(), Some(6));
        assert_eq!(teams.capacity_on(16), 6);
        assert_eq!(teams.capacity_on(4), 4);

        let solo = SessionConfig::default();
        assert_eq!(solo.roster.team_slots(), None);
        assert_eq!(solo.capacity_on(16), 8);
        assert_eq!(solo.capacity_on(5), 5);
    }
}
