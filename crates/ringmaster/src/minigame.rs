//! `ArenaMinigame`: the stock [`MinigameModule`] for arena-based games.

use async_trait::async_trait;
use ringmaster_arena::Arena;
use ringmaster_core::{Location, PlayerId, SessionId};
use ringmaster_session::{MinigameRules, SessionConfig, SessionContext, SessionError, SessionManager};

use crate::{MinigameModule, ModuleError};

/// Runs a [`MinigameRules`] implementation as a tournament module.
///
/// A tournament start splits the players into as few sessions as the
/// arenas allow, sized as evenly as possible, and starts them all at once.
pub struct ArenaMinigame<R: MinigameRules> {
    manager: SessionManager<R>,
}

impl<R: MinigameRules> ArenaMinigame<R> {
    pub fn new(arenas: Vec<Arena>, ctx: SessionContext) -> Self {
        Self {
            manager: SessionManager::new(arenas, ctx),
        }
    }

    /// Overrides `R::session_config()`.
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.manager = self.manager.with_config(config);
        self
    }

    pub fn manager(&self) -> &SessionManager<R> {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut SessionManager<R> {
        &mut self.manager
    }

    /// Largest session any usable arena can hold, or the reason none is
    /// usable.
    fn session_capacity(&self) -> Result<usize, ModuleError> {
        let arenas = self.manager.arenas();
        let capacity = arenas
            .iter()
            .filter(|a| a.validate().is_ok())
            .map(|a| self.manager.session_capacity(a))
            .min();
        match capacity {
            Some(c) if c > 0 => Ok(c),
            _ => match arenas.iter().find_map(|a| a.validate().err()) {
                Some(e) => Err(SessionError::from(e).into()),
                None => Err(ModuleError::Refused {
                    minigame: R::name().to_string(),
                    reason: "no arenas configured".to_string(),
                }),
            },
        }
    }

    /// Creates, fills, and starts one session per group.
    async fn start_groups(&mut self, groups: Vec<Vec<PlayerId>>, started: &mut Vec<SessionId>) -> Result<(), ModuleError> {
        for group in groups {
            let session_id = self.manager.create_session()?;
            started.push(session_id);
            for player in group {
                self.manager.join(player, session_id, None).await?;
            }
            self.manager.force_start(session_id).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl<R: MinigameRules> MinigameModule for ArenaMinigame<R> {
    fn name(&self) -> &str {
        R::name()
    }

    async fn on_disable(&mut self) {
        self.manager.end_all().await;
    }

    async fn on_tournament_start(&mut self, players: &[PlayerId]) -> Result<(), ModuleError> {
        if players.is_empty() {
            return Ok(());
        }
        let capacity = self.session_capacity()?;
        let groups = split_evenly(players, capacity);
        tracing::info!(minigame = R::name(), players = players.len(), sessions = groups.len(), "starting round");

        let mut started = Vec::new();
        if let Err(e) = self.start_groups(groups, &mut started).await {
            tracing::warn!(minigame = R::name(), error = %e, "round failed to start; ending its sessions");
            for session_id in started {
                let _ = self.manager.end_session(session_id).await;
            }
            return Err(e);
        }
        Ok(())
    }

    async fn end_all_games(&mut self) {
        self.manager.end_all().await;
    }

    fn is_game_running(&self) -> bool {
        self.manager.is_running()
    }

    fn active_players(&self) -> Vec<PlayerId> {
        self.manager.active_players()
    }

    async fn on_player_move(&mut self, player: PlayerId, to: &Location) -> bool {
        self.manager.player_moved(player, to.clone()).await
    }

    async fn on_player_quit(&mut self, player: PlayerId) {
        if let Err(e) = self.manager.leave(player).await {
            tracing::debug!(minigame = R::name(), player_id = %player, error = %e, "quit ignored");
        }
    }
}

/// Splits `players` into `ceil(len / capacity)` groups whose sizes differ
/// by at most one, keeping the input order.
fn split_evenly(players: &[PlayerId], capacity: usize) -> Vec<Vec<PlayerId>> {
    let count = players.len().div_ceil(capacity.max(1));
    if count == 0 {
        return Vec::new();
    }
    let base = players.len() / count;
    let extra = players.len() % count;

    let mut groups = Vec::with_capacity(count);
    let mut rest = players;
    for i in 0..count {
        let (head, tail) = rest.split_at(base + usize::from(i < extra));
        groups.push(head.to_vec());
        rest = tail;
    }
    groups
}
