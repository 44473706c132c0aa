//! The lobby: where everyone waits between rounds.
//!
//! Its settings (region, spawn list, admin exclusion) are operator-edited
//! at runtime, saved to TOML on every change, and loaded back at startup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use rand::seq::IndexedRandom;
use ringmaster_arena::SpatialRegion;
use ringmaster_core::{Location, Notice, PlayerId, World};
use ringmaster_session::{LobbyRouter, RouteOutcome};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::ConfigError;
use crate::config::{load_toml_or_default, save_toml};

/// Persisted lobby configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LobbySettings {
    /// Administrators are left out of the player set when a round starts.
    pub exclude_admins: bool,
    /// Players in the lobby can't leave this box or edit blocks inside it.
    /// No region means no protection.
    pub region: Option<SpatialRegion>,
    /// Where players are sent home to, chosen uniformly at random.
    pub spawns: Vec<Location>,
}

/// Lobby state shared by the orchestrator and every session actor.
pub struct Lobby {
    world: Arc<dyn World>,
    settings: RwLock<LobbySettings>,
    /// `None` keeps the settings in memory only.
    path: Option<PathBuf>,
}

impl Lobby {
    /// An unpersisted lobby with the given settings.
    pub fn new(world: Arc<dyn World>, settings: LobbySettings) -> Self {
        Self {
            world,
            settings: RwLock::new(settings),
            path: None,
        }
    }

    /// Loads lobby settings from `path` (defaults if the file doesn't exist
    /// yet) and saves every later change back to it.
    ///
    /// # Errors
    /// [`ConfigError`] if the file exists but can't be read or parsed.
    pub fn load(world: Arc<dyn World>, path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let settings: LobbySettings = load_toml_or_default(&path)?.unwrap_or_default();
        tracing::info!(
            path = %path.display(),
            spawns = settings.spawns.len(),
            region = settings.region.is_some(),
            "lobby loaded"
        );
        Ok(Self {
            world,
            settings: RwLock::new(settings),
            path: Some(path),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub async fn settings(&self) -> LobbySettings {
        self.settings.read().await.clone()
    }

    pub async fn spawn_count(&self) -> usize {
        self.settings.read().await.spawns.len()
    }

    pub async fn excludes_admins(&self) -> bool {
        self.settings.read().await.exclude_admins
    }

    // -----------------------------------------------------------------------
    // Mutations (each one is saved)
    // -----------------------------------------------------------------------

    /// Appends a spawn point. Returns the new spawn count.
    pub async fn add_spawn(&self, at: Location) -> usize {
        let mut settings = self.settings.write().await;
        settings.spawns.push(at);
        self.persist(&settings);
        settings.spawns.len()
    }

    pub async fn clear_spawns(&self) {
        let mut settings = self.settings.write().await;
        settings.spawns.clear();
        self.persist(&settings);
    }

    pub async fn set_region(&self, region: SpatialRegion) {
        let mut settings = self.settings.write().await;
        settings.region = Some(region);
        self.persist(&settings);
    }

    pub async fn set_exclude_admins(&self, exclude: bool) {
        let mut settings = self.settings.write().await;
        settings.exclude_admins = exclude;
        self.persist(&settings);
    }

    /// Writes the settings out. A failed save is logged; the in-memory
    /// change stands.
    fn persist(&self, settings: &LobbySettings) {
        let Some(path) = &self.path else {
            return;
        };
        if let Err(e) = save_toml(path, settings) {
            tracing::error!(path = %path.display(), error = %e, "failed to save lobby settings");
        }
    }

    // -----------------------------------------------------------------------
    // Protection
    // -----------------------------------------------------------------------

    /// Whether a lobby player may move to `to`. Moving from inside the
    /// region to outside it is refused; everything else is allowed.
    pub async fn allows_move(&self, player: PlayerId, to: &Location) -> bool {
        let settings = self.settings.read().await;
        let Some(region) = &settings.region else {
            return true;
        };
        let inside_now = self
            .world
            .position(player)
            .is_some_and(|at| region.contains_location(&at));
        !inside_now || region.contains_location(to)
    }

    /// Whether a lobby player may change the block at `at`.
    pub async fn allows_block_edit(&self, at: &Location) -> bool {
        let settings = self.settings.read().await;
        !settings
            .region
            .as_ref()
            .is_some_and(|region| region.contains_location(at))
    }

    async fn random_spawn(&self) -> Option<Location> {
        let settings = self.settings.read().await;
        settings.spawns.choose(&mut rand::rng()).cloned()
    }
}

#[async_trait]
impl LobbyRouter for Lobby {
    async fn route_to_lobby(&self, player: PlayerId) -> RouteOutcome {
        let Some(spawn) = self.random_spawn().await else {
            tracing::warn!(player_id = %player, "no lobby spawns configured; player left in place");
            return RouteOutcome::NoSpawns;
        };
        match self.world.teleport(player, &spawn) {
            Ok(()) => {
                self.world.notify(player, &Notice::ReturnedToLobby);
                RouteOutcome::Teleported
            }
            Err(e) => {
                tracing::warn!(player_id = %player, error = %e, "failed to route player to lobby");
                RouteOutcome::Failed
            }
        }
    }
}
