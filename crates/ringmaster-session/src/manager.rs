//! Session manager: creates sessions on free arenas, tracks who is where,
//! and tears sessions down.

use std::collections::{BTreeMap, HashMap};
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use ringmaster_arena::Arena;
use ringmaster_core::{Location, PlayerId, PropHandle, SessionId};

use crate::actor::spawn_session;
use crate::{MinigameRules, SessionConfig, SessionContext, SessionError, SessionHandle, SessionSnapshot};

/// Counter for generating unique session IDs.
static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Default command channel size for session actors.
const DEFAULT_CHANNEL_SIZE: usize = 64;

/// All sessions of one minigame.
///
/// Two invariants hold here: a player is in at most one session, and an
/// arena serves at most one session until that session is torn down.
pub struct SessionManager<R: MinigameRules> {
    arenas: Vec<Arc<Arena>>,
    /// Arena name to the session holding it.
    arena_locks: HashMap<String, SessionId>,
    sessions: BTreeMap<SessionId, SessionHandle>,
    player_sessions: HashMap<PlayerId, SessionId>,
    ctx: SessionContext,
    config: SessionConfig,
    _rules: PhantomData<fn() -> R>,
}

impl<R: MinigameRules> SessionManager<R> {
    /// A manager over `arenas`, using `R::session_config()` for every
    /// session.
    pub fn new(arenas: Vec<Arena>, ctx: SessionContext) -> Self {
        for arena in &arenas {
            if let Err(e) = arena.validate() {
                tracing::warn!(minigame = R::name(), arena = %arena.name, error = %e, "arena unusable until completed");
            }
        }
        Self {
            arenas: arenas.into_iter().map(Arc::new).collect(),
            arena_locks: HashMap::new(),
            sessions: BTreeMap::new(),
            player_sessions: HashMap::new(),
            ctx,
            config: R::session_config(),
            _rules: PhantomData,
        }
    }

    /// Replaces the session config for sessions created from now on.
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn arenas(&self) -> &[Arc<Arena>] {
        &self.arenas
    }

    pub fn arena_in_use(&self, name: &str) -> bool {
        self.arena_locks.contains_key(name)
    }

    /// Number of arenas that are complete and not in use.
    pub fn free_arena_count(&self) -> usize {
        self.arenas
            .iter()
            .filter(|a| !self.arena_in_use(&a.name) && a.is_complete())
            .count()
    }

    /// Largest roster a single session can hold on the given arena.
    pub fn session_capacity(&self, arena: &Arena) -> usize {
        self.config.capacity_on(arena.max_players)
    }

    // -----------------------------------------------------------------------
    // Creation and membership
    // -----------------------------------------------------------------------

    /// Starts a session on the first free, complete arena.
    ///
    /// # Errors
    /// - [`SessionError::Arena`] if no arena is complete at all
    /// - [`SessionError::NoArenaAvailable`] if every complete arena is in use
    pub fn create_session(&mut self) -> Result<SessionId, SessionError> {
        self.reap();
        let arena = self.free_arena()?;

        let session_id = SessionId(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed));
        let handle = spawn_session::<R>(
            session_id,
            Arc::clone(&arena),
            self.config.clone(),
            self.ctx.clone(),
            DEFAULT_CHANNEL_SIZE,
        );
        self.arena_locks.insert(arena.name.clone(), session_id);
        self.sessions.insert(session_id, handle);

        tracing::info!(%session_id, minigame = R::name(), arena = %arena.name, "session created");
        Ok(session_id)
    }

    fn free_arena(&self) -> Result<Arc<Arena>, SessionError> {
        let mut first_invalid = None;
        let mut any_valid = false;
        for arena in &self.arenas {
            match arena.validate() {
                Ok(()) => {
                    any_valid = true;
                    if !self.arena_in_use(&arena.name) {
                        return Ok(Arc::clone(arena));
                    }
                }
                Err(e) => {
                    first_invalid.get_or_insert(e);
                }
            }
        }
        match first_invalid {
            Some(e) if !any_valid => Err(e.into()),
            _ => Err(SessionError::NoArenaAvailable),
        }
    }

    /// Adds a player to a session, or changes their team within it.
    ///
    /// # Errors
    /// - [`SessionError::AlreadyInSession`] if they are in another session
    /// - [`SessionError::NotFound`] for an unknown session
    /// - anything the session itself refuses
    pub async fn join(&mut self, player: PlayerId, session_id: SessionId, team: Option<&str>) -> Result<(), SessionError> {
        self.reap();
        if let Some(current) = self.session_of(player) {
            if current != session_id {
                return Err(SessionError::AlreadyInSession(player, current));
            }
        }

        let handle = self
            .sessions
            .get(&session_id)
            .ok_or(SessionError::NotFound(session_id))?;
        handle.join(player, team).await?;
        self.player_sessions.insert(player, session_id);
        Ok(())
    }

    /// Joins the player's current session, else the first session with
    /// room, else a new one.
    pub async fn join_or_create(&mut self, player: PlayerId, team: Option<&str>) -> Result<SessionId, SessionError> {
        self.reap();
        if let Some(current) = self.session_of(player) {
            self.join(player, current, team).await?;
            return Ok(current);
        }

        let open: Vec<SessionId> = self
            .sessions
            .values()
            .filter(|h| h.snapshot().has_room())
            .map(SessionHandle::id)
            .collect();
        for session_id in open {
            // Full or started since the snapshot: keep looking.
            if self.join(player, session_id, team).await.is_ok() {
                return Ok(session_id);
            }
        }

        let session_id = self.create_session()?;
        if let Err(e) = self.join(player, session_id, team).await {
            let _ = self.end_session(session_id).await;
            return Err(e);
        }
        Ok(session_id)
    }

    /// Removes a player from their session (leave or disconnect).
    ///
    /// # Errors
    /// [`SessionError::NotInSession`] if they aren't in one.
    pub async fn leave(&mut self, player: PlayerId) -> Result<(), SessionError> {
        let session_id = self
            .player_sessions
            .remove(&player)
            .ok_or(SessionError::NotInSession(player))?;

        if let Some(handle) = self.sessions.get(&session_id) {
            if let Err(e) = handle.leave(player).await {
                tracing::debug!(%session_id, player_id = %player, error = %e, "session already gone");
            }
        }
        self.reap();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Routing
    // -----------------------------------------------------------------------

    /// Routes a movement to the player's session. Returns `false` if it
    /// must be cancelled; players outside any session move freely.
    pub async fn player_moved(&self, player: PlayerId, to: Location) -> bool {
        let Some(handle) = self.handle_of(player) else {
            return true;
        };
        handle.player_moved(player, to).await.unwrap_or(true)
    }

    pub async fn eliminate(&self, player: PlayerId) -> Result<(), SessionError> {
        self.handle_of(player)
            .ok_or(SessionError::NotInSession(player))?
            .eliminate(player)
            .await
    }

    pub async fn attach_prop(&self, player: PlayerId, prop: PropHandle) -> Result<(), SessionError> {
        self.handle_of(player)
            .ok_or(SessionError::NotInSession(player))?
            .attach_prop(player, prop)
            .await
    }

    pub async fn force_start(&self, session_id: SessionId) -> Result<(), SessionError> {
        self.handle(session_id)?.force_start().await
    }

    pub async fn standings(&self, session_id: SessionId) -> Result<Vec<PlayerId>, SessionError> {
        self.handle(session_id)?.standings().await
    }

    // -----------------------------------------------------------------------
    // Teardown
    // -----------------------------------------------------------------------

    /// Ends a session, waits for its teardown, and frees its arena.
    pub async fn end_session(&mut self, session_id: SessionId) -> Result<(), SessionError> {
        let handle = self
            .sessions
            .remove(&session_id)
            .ok_or(SessionError::NotFound(session_id))?;

        // An actor that already stopped has nothing left to tear down.
        let _ = handle.end().await;
        self.release(session_id);

        tracing::info!(%session_id, "session destroyed");
        Ok(())
    }

    /// Ends every session.
    pub async fn end_all(&mut self) {
        let ids: Vec<SessionId> = self.sessions.keys().copied().collect();
        for session_id in ids {
            let _ = self.end_session(session_id).await;
        }
    }

    /// Drops sessions whose actor has stopped and frees their arenas.
    /// Returns how many were dropped.
    pub fn reap(&mut self) -> usize {
        let closed: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|(_, h)| h.is_closed())
            .map(|(id, _)| *id)
            .collect();
        for session_id in &closed {
            self.sessions.remove(session_id);
            self.release(*session_id);
            tracing::debug!(%session_id, "session reaped");
        }
        closed.len()
    }

    fn release(&mut self, session_id: SessionId) {
        self.player_sessions.retain(|_, s| *s != session_id);
        self.arena_locks.retain(|_, s| *s != session_id);
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// The session the player is currently in. Players who left, or whose
    /// session is over, are in none.
    pub fn session_of(&self, player: PlayerId) -> Option<SessionId> {
        let session_id = *self.player_sessions.get(&player)?;
        let snapshot = self.sessions.get(&session_id)?.snapshot();
        (!snapshot.state.is_terminal() && snapshot.members.contains(&player)).then_some(session_id)
    }

    /// Players still playing (or waiting to) in any session.
    pub fn active_players(&self) -> Vec<PlayerId> {
        self.sessions
            .values()
            .flat_map(|h| h.snapshot().active_players)
            .collect()
    }

    /// Whether any session has not finished yet.
    pub fn is_running(&self) -> bool {
        self.sessions
            .values()
            .any(|h| !h.snapshot().state.is_terminal())
    }

    pub fn snapshot(&self, session_id: SessionId) -> Option<SessionSnapshot> {
        self.sessions.get(&session_id).map(SessionHandle::snapshot)
    }

    pub fn snapshots(&self) -> Vec<SessionSnapshot> {
        self.sessions.values().map(SessionHandle::snapshot).collect()
    }

    pub fn session_ids(&self) -> Vec<SessionId> {
        self.sessions.keys().copied().collect()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    fn handle(&self, session_id: SessionId) -> Result<&SessionHandle, SessionError> {
        self.sessions
            .get(&session_id)
            .ok_or(SessionError::NotFound(session_id))
    }

    fn handle_of(&self, player: PlayerId) -> Option<&SessionHandle> {
        self.session_of(player).and_then(|id| self.sessions.get(&id))
    }
}
