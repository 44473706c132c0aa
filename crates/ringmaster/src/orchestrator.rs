//! `TournamentOrchestrator` builder and the tournament-level operations.
//!
//! The orchestrator owns the module registry, the lobby, and the one
//! piece of tournament-wide mutable state: which minigame is active. All
//! operations take `&mut self`, so two start requests can never both see
//! "nothing active".

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use ringmaster_arena::SpatialRegion;
use ringmaster_core::{Location, Notice, PlayerId, World};
use ringmaster_ledger::{JsonFileStore, ScoreLedger, SharedLedger};
use ringmaster_session::{LobbyRouter, RouteOutcome, SessionContext};
use tokio::sync::Mutex;

use crate::config::TournamentConfig;
use crate::lobby::{Lobby, LobbySettings};
use crate::{MinigameModule, OrchestratorError, RingmasterError};

/// Builder for a [`TournamentOrchestrator`].
///
/// # Example
///
/// ```rust,ignore
/// let mut orchestrator = TournamentOrchestrator::builder(world)
///     .ledger(ledger)
///     .lobby(lobby)
///     .build();
/// let relay = ArenaMinigame::<Relay>::new(arenas, orchestrator.session_context());
/// orchestrator.register_module(relay).await?;
/// orchestrator.start_minigame("relay").await?;
/// ```
pub struct TournamentOrchestratorBuilder {
    world: Arc<dyn World>,
    ledger: Option<SharedLedger>,
    lobby: Option<Arc<Lobby>>,
}

impl TournamentOrchestratorBuilder {
    pub fn new(world: Arc<dyn World>) -> Self {
        Self {
            world,
            ledger: None,
            lobby: None,
        }
    }

    /// Sets the score ledger. Default: an unpersisted one.
    pub fn ledger(mut self, ledger: SharedLedger) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Sets the lobby. Default: an unpersisted, empty one.
    pub fn lobby(mut self, lobby: Arc<Lobby>) -> Self {
        self.lobby = Some(lobby);
        self
    }

    pub fn build(self) -> TournamentOrchestrator {
        let ledger = self
            .ledger
            .unwrap_or_else(|| Arc::new(Mutex::new(ScoreLedger::in_memory())));
        let lobby = self
            .lobby
            .unwrap_or_else(|| Arc::new(Lobby::new(Arc::clone(&self.world), LobbySettings::default())));
        TournamentOrchestrator {
            world: self.world,
            ledger,
            lobby,
            modules: BTreeMap::new(),
            active: None,
        }
    }
}

/// One registered module as seen by [`TournamentOrchestrator::status`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleStatus {
    pub name: String,
    pub running: bool,
    pub active_players: usize,
}

/// Snapshot of the tournament for the `status` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TournamentStatus {
    pub active: Option<String>,
    pub modules: Vec<ModuleStatus>,
    pub lobby_spawns: usize,
    pub lobby_region: bool,
    pub exclude_admins: bool,
}

impl fmt::Display for TournamentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.active {
            Some(name) => writeln!(f, "active minigame: {name}")?,
            None => writeln!(f, "active minigame: none")?,
        }
        for module in &self.modules {
            let state = if module.running { "running" } else { "idle" };
            writeln!(f, "  {} ({state}, {} playing)", module.name, module.active_players)?;
        }
        write!(
            f,
            "lobby: {} spawn(s), region {}, admins {}",
            self.lobby_spawns,
            if self.lobby_region { "set" } else { "unset" },
            if self.exclude_admins { "excluded" } else { "included" },
        )
    }
}

/// Runs a tournament: one minigame at a time, everyone else in the lobby.
pub struct TournamentOrchestrator {
    world: Arc<dyn World>,
    ledger: SharedLedger,
    lobby: Arc<Lobby>,
    modules: BTreeMap<String, Box<dyn MinigameModule>>,
    /// Set iff a round is running. The one mutual-exclusion point.
    active: Option<String>,
}

impl TournamentOrchestrator {
    pub fn builder(world: Arc<dyn World>) -> TournamentOrchestratorBuilder {
        TournamentOrchestratorBuilder::new(world)
    }

    /// Builds an orchestrator whose ledger and lobby persist to the files
    /// named in `config`.
    ///
    /// # Errors
    /// Fails if either file exists but can't be read.
    pub fn from_config(world: Arc<dyn World>, config: &TournamentConfig) -> Result<Self, RingmasterError> {
        let ledger = ScoreLedger::open(JsonFileStore::new(&config.storage.scores_file))?;
        let lobby = Lobby::load(Arc::clone(&world), &config.storage.lobby_file)?;
        Ok(Self::builder(world)
            .ledger(Arc::new(Mutex::new(ledger)))
            .lobby(Arc::new(lobby))
            .build())
    }

    /// The collaborators a session actor needs, for constructing modules.
    pub fn session_context(&self) -> SessionContext {
        SessionContext {
            world: Arc::clone(&self.world),
            ledger: Arc::clone(&self.ledger),
            lobby: Arc::clone(&self.lobby) as Arc<dyn LobbyRouter>,
        }
    }

    pub fn ledger(&self) -> SharedLedger {
        Arc::clone(&self.ledger)
    }

    pub fn lobby(&self) -> &Lobby {
        &self.lobby
    }

    pub fn module_names(&self) -> Vec<&str> {
        self.modules.keys().map(String::as_str).collect()
    }

    /// Registers a module and enables it.
    ///
    /// # Errors
    /// [`OrchestratorError::DuplicateMinigame`] if the name is taken.
    pub async fn register_module(&mut self, module: impl MinigameModule) -> Result<(), OrchestratorError> {
        let name = module.name().to_string();
        if self.modules.contains_key(&name) {
            return Err(OrchestratorError::DuplicateMinigame(name));
        }
        let mut module: Box<dyn MinigameModule> = Box::new(module);
        module.on_enable().await;
        self.modules.insert(name.clone(), module);
        tracing::info!(minigame = %name, "minigame registered");
        Ok(())
    }

    /// The active minigame, if its round is still going.
    pub fn active_minigame(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Clears the active marker once the active module's sessions have all
    /// finished on their own.
    fn settle(&mut self) {
        let Some(name) = &self.active else {
            return;
        };
        let running = self.modules.get(name).is_some_and(|m| m.is_game_running());
        if !running {
            tracing::info!(minigame = %name, "round finished");
            self.active = None;
        }
    }

    /// Players currently in a session of the active minigame.
    fn active_players(&self) -> Vec<PlayerId> {
        self.active
            .as_ref()
            .and_then(|name| self.modules.get(name))
            .map(|m| m.active_players())
            .unwrap_or_default()
    }

    // -----------------------------------------------------------------------
    // Rounds
    // -----------------------------------------------------------------------

    /// Starts a round of `name` with every eligible online player.
    ///
    /// # Errors
    /// - [`OrchestratorError::AlreadyRunning`] if a round is going
    /// - [`OrchestratorError::UnknownMinigame`] if no module has this name
    /// - [`OrchestratorError::NoLobbySpawns`] if players couldn't be sent
    ///   home afterwards
    /// - [`OrchestratorError::NoEligiblePlayers`] if nobody can play
    /// - [`OrchestratorError::ModuleFailed`] if the module couldn't start;
    ///   nothing is left active
    pub async fn start_minigame(&mut self, name: &str) -> Result<(), OrchestratorError> {
        self.settle();
        if let Some(active) = &self.active {
            return Err(OrchestratorError::AlreadyRunning(active.clone()));
        }
        if !self.modules.contains_key(name) {
            return Err(OrchestratorError::UnknownMinigame(name.to_string()));
        }
        if self.lobby.spawn_count().await == 0 {
            return Err(OrchestratorError::NoLobbySpawns);
        }

        let players = self.eligible_players().await;
        if players.is_empty() {
            return Err(OrchestratorError::NoEligiblePlayers);
        }

        self.active = Some(name.to_string());
        let notice = Notice::MinigameStarting {
            minigame: name.to_string(),
        };
        for player in &players {
            self.world.notify(*player, &notice);
        }

        let Some(module) = self.modules.get_mut(name) else {
            self.active = None;
            return Err(OrchestratorError::UnknownMinigame(name.to_string()));
        };
        if let Err(source) = module.on_tournament_start(&players).await {
            self.active = None;
            tracing::warn!(minigame = %name, error = %source, "minigame failed to start; rolled back");
            return Err(OrchestratorError::ModuleFailed {
                minigame: name.to_string(),
                source,
            });
        }

        tracing::info!(minigame = %name, players = players.len(), "minigame started");
        Ok(())
    }

    async fn eligible_players(&self) -> Vec<PlayerId> {
        let exclude_admins = self.lobby.excludes_admins().await;
        self.world
            .online_players()
            .into_iter()
            .filter(|p| !(exclude_admins && self.world.is_admin(*p)))
            .collect()
    }

    /// Ends the active round and sends its players back to the lobby.
    ///
    /// # Errors
    /// [`OrchestratorError::NothingActive`] if no round is going, including
    /// one whose sessions have all finished on their own. Nobody is moved in
    /// that case.
    pub async fn end_active_minigame(&mut self) -> Result<(), OrchestratorError> {
        self.settle();
        let name = self.active.take().ok_or(OrchestratorError::NothingActive)?;
        let Some(module) = self.modules.get_mut(&name) else {
            return Err(OrchestratorError::NothingActive);
        };

        let players = module.active_players();
        module.end_all_games().await;

        let notice = Notice::MinigameEnded { minigame: name.clone() };
        for player in &players {
            self.lobby.route_to_lobby(*player).await;
            self.world.notify(*player, &notice);
        }
        tracing::info!(minigame = %name, players = players.len(), "minigame ended");
        Ok(())
    }

    /// Sends one player to a random lobby spawn.
    pub async fn route_to_lobby(&self, player: PlayerId) -> RouteOutcome {
        self.lobby.route_to_lobby(player).await
    }

    pub async fn status(&mut self) -> TournamentStatus {
        self.settle();
        let settings = self.lobby.settings().await;
        TournamentStatus {
            active: self.active.clone(),
            modules: self
                .modules
                .iter()
                .map(|(name, m)| ModuleStatus {
                    name: name.clone(),
                    running: m.is_game_running(),
                    active_players: m.active_players().len(),
                })
                .collect(),
            lobby_spawns: settings.spawns.len(),
            lobby_region: settings.region.is_some(),
            exclude_admins: settings.exclude_admins,
        }
    }

    // -----------------------------------------------------------------------
    // Lobby configuration
    // -----------------------------------------------------------------------

    /// Returns the new spawn count.
    pub async fn add_lobby_spawn(&self, at: Location) -> usize {
        let count = self.lobby.add_spawn(at).await;
        tracing::info!(spawns = count, "lobby spawn added");
        count
    }

    pub async fn clear_lobby_spawns(&self) {
        self.lobby.clear_spawns().await;
        tracing::info!("lobby spawns cleared");
    }

    pub async fn set_lobby_region(&self, region: SpatialRegion) {
        tracing::info!(min = %region.min(), max = %region.max(), world = %region.world(), "lobby region set");
        self.lobby.set_region(region).await;
    }

    /// Only affects who is picked for the next round; admins already
    /// playing stay in their session.
    pub async fn set_exclude_admins(&self, exclude: bool) {
        self.lobby.set_exclude_admins(exclude).await;
        tracing::info!(exclude, "admin exclusion changed; running sessions unaffected");
    }

    // -----------------------------------------------------------------------
    // World events
    // -----------------------------------------------------------------------

    /// A player connected: they start in the lobby.
    pub async fn on_player_join(&self, player: PlayerId) -> RouteOutcome {
        self.lobby.route_to_lobby(player).await
    }

    /// Routes a movement. Returns `false` if it must be cancelled.
    ///
    /// Players in the active round are handled by its module. Everyone
    /// else is in the lobby and may not leave it unless they hold the
    /// lobby override.
    pub async fn on_player_move(&mut self, player: PlayerId, to: &Location) -> bool {
        if self.active_players().contains(&player) {
            if let Some(module) = self.active.as_ref().and_then(|name| self.modules.get_mut(name)) {
                return module.on_player_move(player, to).await;
            }
        }
        if self.world.has_lobby_override(player) {
            return true;
        }
        let allowed = self.lobby.allows_move(player, to).await;
        if !allowed {
            tracing::debug!(player_id = %player, to = %to, "lobby exit blocked");
        }
        allowed
    }

    /// A player disconnected.
    pub async fn on_player_quit(&mut self, player: PlayerId) {
        if let Some(module) = self.active.as_ref().and_then(|name| self.modules.get_mut(name)) {
            module.on_player_quit(player).await;
        }
    }

    /// Whether `player` may place or break the block at `at`.
    pub async fn check_block_edit(&self, player: PlayerId, at: &Location) -> bool {
        if self.active_players().contains(&player) || self.world.has_lobby_override(player) {
            return true;
        }
        self.lobby.allows_block_edit(at).await
    }

    /// Ends any running round and disables every module.
    pub async fn shutdown(&mut self) {
        if self.active.is_some() {
            let _ = self.end_active_minigame().await;
        }
        for (name, module) in &mut self.modules {
            module.on_disable().await;
            tracing::debug!(minigame = %name, "minigame disabled");
        }
        tracing::info!("tournament shut down");
    }
}
