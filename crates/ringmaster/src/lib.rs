//! # Ringmaster
//!
//! Tournament orchestration for server-hosted minigames.
//!
//! A tournament is a series of rounds. Each round runs one registered
//! minigame for every eligible player; between rounds everyone waits in a
//! protected lobby, and points from every round accumulate in one
//! [`ScoreLedger`](ringmaster_ledger::ScoreLedger).
//!
//! Minigame authors implement
//! [`MinigameRules`](ringmaster_session::MinigameRules) and wrap it in an
//! [`ArenaMinigame`]; the session layer handles rosters, countdowns,
//! checkpoints, and teardown.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ringmaster::prelude::*;
//!
//! let mut orchestrator = TournamentOrchestrator::builder(world).build();
//! let relay = ArenaMinigame::<Relay>::new(arenas, orchestrator.session_context());
//! orchestrator.register_module(relay).await?;
//! orchestrator.execute(Command::AddLobbySpawn(spawn)).await?;
//! orchestrator.execute(Command::Start { minigame: "relay".into() }).await?;
//! ```

pub mod config;
pub mod logging;

mod command;
mod error;
mod lobby;
mod minigame;
mod module;
mod orchestrator;

pub use command::{Command, CommandOutput};
pub use error::{ConfigError, ModuleError, OrchestratorError, RingmasterError};
pub use lobby::{Lobby, LobbySettings};
pub use minigame::ArenaMinigame;
pub use module::MinigameModule;
pub use orchestrator::{ModuleStatus, TournamentOrchestrator, TournamentOrchestratorBuilder, TournamentStatus};

/// Everything a tournament host or minigame author usually needs.
pub mod prelude {
    pub use crate::config::TournamentConfig;
    pub use crate::{
        ArenaMinigame, Command, CommandOutput, Lobby, LobbySettings, MinigameModule, ModuleError, OrchestratorError,
        RingmasterError, TournamentOrchestrator,
    };
    pub use ringmaster_arena::{Arena, SpatialRegion};
    pub use ringmaster_core::{Location, MemoryWorld, Notice, PlayerId, Point, World, WorldId};
    pub use ringmaster_ledger::{ScoreLedger, SharedLedger};
    pub use ringmaster_session::{
        GameSession, MinigameRules, RosterMode, ScoreAward, SessionConfig, SessionEvent, TeamSpec, WinCondition,
    };
}
