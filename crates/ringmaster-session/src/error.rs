//! Error types for the session layer.

use ringmaster_arena::ArenaError;
use ringmaster_core::{PlayerId, SessionId};

use crate::SessionState;

/// Conflicts when joining or switching teams. Nothing is mutated when one
/// of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RosterError {
    /// The chosen team is at capacity.
    #[error("team {0} is full")]
    TeamFull(String),

    /// The session has no free participant slot.
    #[error("no free slot in this session")]
    NoCapacity,

    /// No team by that name (or a team was named in a solo session).
    #[error("no team named {0}")]
    UnknownTeam(String),
}

/// Errors that can occur during session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The session does not exist.
    #[error("session {0} not found")]
    NotFound(SessionId),

    /// The session is in a state that doesn't allow this operation.
    #[error("session {session} is {state}; cannot {operation}")]
    InvalidState {
        session: SessionId,
        state: SessionState,
        operation: &'static str,
    },

    #[error(transparent)]
    Roster(#[from] RosterError),

    /// A start was requested without enough participants.
    #[error("not enough players: {have} of {need}")]
    NotEnoughPlayers { have: usize, need: usize },

    /// A participant can be in at most one session at a time.
    #[error("player {0} already in session {1}")]
    AlreadyInSession(PlayerId, SessionId),

    #[error("player {0} is not in any session")]
    NotInSession(PlayerId),

    /// Every usable arena is taken by another session.
    #[error("no free arena")]
    NoArenaAvailable,

    #[error(transparent)]
    Arena(#[from] ArenaError),

    /// The session actor has stopped or its channel is closed.
    #[error("session {0} is unavailable")]
    Unavailable(SessionId),
}
