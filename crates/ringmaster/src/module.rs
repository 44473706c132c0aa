//! The `MinigameModule` trait: what the orchestrator needs from a minigame.

use async_trait::async_trait;
use ringmaster_core::{Location, PlayerId};

use crate::ModuleError;

/// One pluggable minigame, registered with the
/// [`TournamentOrchestrator`](crate::TournamentOrchestrator) by name.
///
/// Most minigames don't implement this by hand: wrapping a
/// [`MinigameRules`](ringmaster_session::MinigameRules) in
/// [`ArenaMinigame`](crate::ArenaMinigame) provides all of it.
#[async_trait]
pub trait MinigameModule: Send + Sync + 'static {
    /// Registry key and display name.
    fn name(&self) -> &str;

    /// Called once, when the module is registered.
    async fn on_enable(&mut self) {}

    /// Called once, when the orchestrator shuts down.
    async fn on_disable(&mut self) {}

    /// Starts a tournament round with exactly these players.
    ///
    /// On error the module must not leave any session running.
    async fn on_tournament_start(&mut self, players: &[PlayerId]) -> Result<(), ModuleError>;

    /// Ends every session this module is running.
    async fn end_all_games(&mut self);

    /// Whether any of this module's sessions is still going.
    fn is_game_running(&self) -> bool;

    /// Players currently taking part in one of this module's sessions.
    fn active_players(&self) -> Vec<PlayerId>;

    /// Routes a movement. Returns `false` if it must be cancelled.
    async fn on_player_move(&mut self, _player: PlayerId, _to: &Location) -> bool {
        true
    }

    /// A player disconnected.
    async fn on_player_quit(&mut self, _player: PlayerId) {}
}
