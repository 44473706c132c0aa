//! The world collaborator: everything Ringmaster needs from the server that
//! actually hosts the players.
//!
//! Ringmaster never moves an avatar or renders a message itself. It asks a
//! [`World`] to. Every call is expected to be immediate and non-blocking;
//! failures are reported as [`WorldError`] and treated as transient.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::{Location, Notice, PlayerId, PropHandle, WorldError};

/// Primitive world operations consumed by the orchestrator and sessions.
///
/// `Send + Sync + 'static` because one world is shared by every session
/// actor for the lifetime of the process.
pub trait World: Send + Sync + 'static {
    /// Moves a player to `to`.
    ///
    /// # Errors
    /// [`WorldError::Offline`] if the player is gone, or
    /// [`WorldError::Rejected`] if the world refuses.
    fn teleport(&self, player: PlayerId, to: &Location) -> Result<(), WorldError>;

    /// Whether the player is currently connected.
    fn is_online(&self, player: PlayerId) -> bool;

    /// The player's current location, if online.
    fn position(&self, player: PlayerId) -> Option<Location>;

    /// Every connected player, in a stable order.
    fn online_players(&self) -> Vec<PlayerId>;

    /// Whether the player is a tournament administrator.
    fn is_admin(&self, player: PlayerId) -> bool;

    /// Whether the player may leave or edit the lobby freely.
    fn has_lobby_override(&self, _player: PlayerId) -> bool {
        false
    }

    /// The name shown on leaderboards.
    fn display_name(&self, player: PlayerId) -> String {
        player.to_string()
    }

    /// Delivers a notice to one player. Offline players are skipped silently.
    fn notify(&self, player: PlayerId, notice: &Notice);

    /// Despawns a prop that a participant was using.
    fn remove_prop(&self, _prop: PropHandle) {}
}

// ---------------------------------------------------------------------------
// MemoryWorld
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct MemoryPlayer {
    name: String,
    location: Option<Location>,
    online: bool,
    admin: bool,
    lobby_override: bool,
}

#[derive(Debug, Default)]
struct MemoryWorldState {
    players: BTreeMap<PlayerId, MemoryPlayer>,
    teleports: Vec<(PlayerId, Location)>,
    notices: Vec<(PlayerId, Notice)>,
    removed_props: Vec<PropHandle>,
}

/// An in-process [`World`] that records what was asked of it.
///
/// Used by the demo and by tests; a real deployment plugs in the game
/// server's own implementation instead.
#[derive(Debug, Default)]
pub struct MemoryWorld {
    state: Mutex<MemoryWorldState>,
}

impl MemoryWorld {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryWorldState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Connects a player (or reconnects a known one).
    pub fn connect(&self, player: PlayerId, name: impl Into<String>) {
        let name = name.into();
        let mut state = self.state();
        let entry = state.players.entry(player).or_insert_with(|| MemoryPlayer {
            name: name.clone(),
            location: None,
            online: true,
            admin: false,
            lobby_override: false,
        });
        entry.name = name;
        entry.online = true;
    }

    /// Marks a player offline. Their record is kept.
    pub fn disconnect(&self, player: PlayerId) {
        if let Some(p) = self.state().players.get_mut(&player) {
            p.online = false;
        }
    }

    pub fn set_admin(&self, player: PlayerId, admin: bool) {
        if let Some(p) = self.state().players.get_mut(&player) {
            p.admin = admin;
        }
    }

    pub fn set_lobby_override(&self, player: PlayerId, allowed: bool) {
        if let Some(p) = self.state().players.get_mut(&player) {
            p.lobby_override = allowed;
        }
    }

    /// Places a player without recording a teleport (simulated walking).
    pub fn place(&self, player: PlayerId, at: Location) {
        if let Some(p) = self.state().players.get_mut(&player) {
            p.location = Some(at);
        }
    }

    /// Every successful teleport, in order.
    pub fn teleports(&self) -> Vec<(PlayerId, Location)> {
        self.state().teleports.clone()
    }

    /// Successful teleports of one player, in order.
    pub fn teleports_of(&self, player: PlayerId) -> Vec<Location> {
        self.state()
            .teleports
            .iter()
            .filter(|(p, _)| *p == player)
            .map(|(_, loc)| loc.clone())
            .collect()
    }

    /// Notices delivered to one player, in order.
    pub fn notices_for(&self, player: PlayerId) -> Vec<Notice> {
        self.state()
            .notices
            .iter()
            .filter(|(p, _)| *p == player)
            .map(|(_, n)| n.clone())
            .collect()
    }

    pub fn removed_props(&self) -> Vec<PropHandle> {
        self.state().removed_props.clone()
    }
}

impl World for MemoryWorld {
    fn teleport(&self, player: PlayerId, to: &Location) -> Result<(), WorldError> {
        let mut guard = self.state();
        let state = &mut *guard;
        match state.players.get_mut(&player) {
            Some(p) if p.online => {
                p.location = Some(to.clone());
                state.teleports.push((player, to.clone()));
                tracing::trace!(%player, to = %to, "teleported");
                Ok(())
            }
            _ => Err(WorldError::Offline(player)),
        }
    }

    fn is_online(&self, player: PlayerId) -> bool {
        self.state().players.get(&player).is_some_and(|p| p.online)
    }

    fn position(&self, player: PlayerId) -> Option<Location> {
        self.state()
            .players
            .get(&player)
            .filter(|p| p.online)
            .and_then(|p| p.location.clone())
    }

    fn online_players(&self) -> Vec<PlayerId> {
        self.state()
            .players
            .iter()
            .filter(|(_, p)| p.online)
            .map(|(id, _)| *id)
            .collect()
    }

    fn is_admin(&self, player: PlayerId) -> bool {
        self.state().players.get(&player).is_some_and(|p| p.admin)
    }

    fn has_lobby_override(&self, player: PlayerId) -> bool {
        self.state()
            .players
            .get(&player)
            .is_some_and(|p| p.lobby_override)
    }

    fn display_name(&self, player: PlayerId) -> String {
        self.state()
            .players
            .get(&player)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| player.to_string())
    }

    fn notify(&self, player: PlayerId, notice: &Notice) {
        let mut state = self.state();
        if state.players.get(&player).is_some_and(|p| p.online) {
            state.notices.push((player, notice.clone()));
        }
    }

    fn remove_prop(&self, prop: PropHandle) {
        self.state().removed_props.push(prop);
    }
}
