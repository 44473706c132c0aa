//! Operator commands.
//!
//! Each [`Command`] maps to exactly one [`TournamentOrchestrator`]
//! operation. Turning chat or console text into a `Command` is left to
//! whatever hosts the tournament.

use std::fmt;

use ringmaster_arena::SpatialRegion;
use ringmaster_core::Location;

use crate::orchestrator::{TournamentOrchestrator, TournamentStatus};
use crate::OrchestratorError;

/// An operator command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start { minigame: String },
    End,
    Status,
    AddLobbySpawn(Location),
    ClearLobbySpawns,
    SetLobbyRegion(SpatialRegion),
    ExcludeAdmins,
    IncludeAdmins,
}

/// What a successful command did, for reporting back to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutput {
    Started { minigame: String },
    Ended { minigame: String },
    Status(TournamentStatus),
    LobbySpawnAdded { count: usize },
    LobbySpawnsCleared,
    LobbyRegionSet,
    AdminExclusion { excluded: bool },
}

impl fmt::Display for CommandOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started { minigame } => write!(f, "started {minigame}"),
            Self::Ended { minigame } => write!(f, "ended {minigame}"),
            Self::Status(status) => status.fmt(f),
            Self::LobbySpawnAdded { count } => write!(f, "lobby spawn added ({count} total)"),
            Self::LobbySpawnsCleared => f.write_str("lobby spawns cleared"),
            Self::LobbyRegionSet => f.write_str("lobby region set"),
            Self::AdminExclusion { excluded: true } => f.write_str("admins excluded from rounds"),
            Self::AdminExclusion { excluded: false } => f.write_str("admins included in rounds"),
        }
    }
}

impl TournamentOrchestrator {
    /// Runs an operator command and reports its result.
    pub async fn execute(&mut self, command: Command) -> Result<CommandOutput, OrchestratorError> {
        tracing::debug!(?command, "executing command");
        match command {
            Command::Start { minigame } => {
                self.start_minigame(&minigame).await?;
                Ok(CommandOutput::Started { minigame })
            }
            Command::End => {
                let minigame = self.active_minigame().map(str::to_owned);
                self.end_active_minigame().await?;
                Ok(CommandOutput::Ended {
                    minigame: minigame.unwrap_or_default(),
                })
            }
            Command::Status => Ok(CommandOutput::Status(self.status().await)),
            Command::AddLobbySpawn(at) => Ok(CommandOutput::LobbySpawnAdded {
                count: self.add_lobby_spawn(at).await,
            }),
            Command::ClearLobbySpawns => {
                self.clear_lobby_spawns().await;
                Ok(CommandOutput::LobbySpawnsCleared)
            }
            Command::SetLobbyRegion(region) => {
                self.set_lobby_region(region).await;
                Ok(CommandOutput::LobbyRegionSet)
            }
            Command::ExcludeAdmins => {
                self.set_exclude_admins(true).await;
                Ok(CommandOutput::AdminExclusion { excluded: true })
            }
            Command::IncludeAdmins => {
                self.set_exclude_admins(false).await;
                Ok(CommandOutput::AdminExclusion { excluded: false })
            }
        }
    }
}
