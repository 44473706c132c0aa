//! Game session lifecycle for Ringmaster.
//!
//! Each session runs as an isolated Tokio task (actor model) that owns its
//! [`GameSession`] state machine exclusively. Everything else talks to it
//! through a [`SessionHandle`].
//!
//! # Key types
//!
//! - [`MinigameRules`]: the trait each minigame implements (config + scoring)
//! - [`GameSession`]: the pure lifecycle state machine
//! - [`Roster`]: solo or team membership with capacity rules
//! - [`SessionManager`]: creates/destroys sessions, matches players to them
//! - [`SessionHandle`]: send commands to a running session actor
//! - [`SessionState`]: `Lobby → Countdown → InGame → Finished`

mod actor;
mod config;
mod error;
mod manager;
mod roster;
mod rules;
mod session;

pub use actor::{LobbyRouter, RouteOutcome, SessionContext, SessionHandle, SessionSnapshot};
pub use config::{RosterMode, SessionConfig, SessionState, TeamSpec, WinCondition};
pub use error::{RosterError, SessionError};
pub use manager::SessionManager;
pub use roster::{JoinOutcome, LeaveOutcome, Roster};
pub use rules::{MinigameRules, ScoreAward};
pub use session::{GameSession, MoveVerdict, SessionEvent};
