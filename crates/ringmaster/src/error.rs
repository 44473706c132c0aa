//! Error types for the orchestrator layer, and the unified error.

use std::path::PathBuf;

use ringmaster_arena::ArenaError;
use ringmaster_ledger::LedgerError;
use ringmaster_session::SessionError;

/// Errors a minigame module reports back to the orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    /// A session operation inside the module failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The module declined to start for its own reasons.
    #[error("{minigame} refused to start: {reason}")]
    Refused { minigame: String, reason: String },
}

/// Errors from loading or saving TOML configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config could not be written: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Errors from tournament-level operations.
///
/// None of these leave state half-changed: the operation that returns one
/// has either not started or been rolled back.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// Another minigame is already running.
    #[error("minigame {0} is already running")]
    AlreadyRunning(String),

    /// No registered module has this name.
    #[error("unknown minigame: {0}")]
    UnknownMinigame(String),

    /// A module with this name is already registered.
    #[error("minigame {0} is already registered")]
    DuplicateMinigame(String),

    /// `end` was asked for while nothing is running.
    #[error("no minigame is running")]
    NothingActive,

    /// An operation needed a lobby spawn and none is configured.
    #[error("no lobby spawns configured")]
    NoLobbySpawns,

    /// Nobody online is eligible to play.
    #[error("no eligible players online")]
    NoEligiblePlayers,

    /// The module failed while starting; the start was rolled back.
    #[error("minigame {minigame} failed: {source}")]
    ModuleFailed {
        minigame: String,
        #[source]
        source: ModuleError,
    },
}

/// Top-level error that wraps every crate-specific error.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum RingmasterError {
    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),

    #[error(transparent)]
    Module(#[from] ModuleError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Arena(#[from] ArenaError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringmaster_core::{PlayerId, SessionId};

    #[test]
    fn test_from_orchestrator_error() {
        let err = OrchestratorError::AlreadyRunning("relay".into());
        let ringmaster_err: RingmasterError = err.into();
        assert!(matches!(ringmaster_err, RingmasterError::Orchestrator(_)));
        assert!(ringmaster_err.to_string().contains("relay"));
    }

    #[test]
    fn test_from_session_error() {
        let err = SessionError::NotInSession(PlayerId(3));
        let ringmaster_err: RingmasterError = err.into();
        assert!(matches!(ringmaster_err, RingmasterError::Session(_)));
    }

    #[test]
    fn test_from_arena_error() {
        let err = ArenaError::NoSpawns("canyon".into());
        let ringmaster_err: RingmasterError = err.into();
        assert!(matches!(ringmaster_err, RingmasterError::Arena(_)));
    }

    #[test]
    fn test_module_error_wraps_session_error() {
        let err: ModuleError = SessionError::NotFound(SessionId(4)).into();
        assert!(matches!(err, ModuleError::Session(SessionError::NotFound(_))));
    }

    #[test]
    fn test_module_failed_keeps_source() {
        let err = OrchestratorError::ModuleFailed {
            minigame: "relay".into(),
            source: SessionError::NoArenaAvailable.into(),
        };
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert!(source.is_some());
    }
}
