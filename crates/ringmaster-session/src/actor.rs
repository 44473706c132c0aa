//! Session actor: an isolated Tokio task that owns one [`GameSession`].
//!
//! The actor is the only thing that ever mutates its session. Commands
//! arrive over a bounded mpsc channel, the session clock drives countdowns
//! and in-game timers, and after every step the actor publishes a
//! [`SessionSnapshot`] on a watch channel so readers never have to wait on
//! it.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ringmaster_arena::Arena;
use ringmaster_core::{Location, Notice, PlayerId, PropHandle, SessionId, World};
use ringmaster_ledger::SharedLedger;
use ringmaster_tick::{TickConfig, TickInfo, TickScheduler};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;

use crate::{GameSession, MinigameRules, ScoreAward, SessionConfig, SessionError, SessionEvent, SessionState};

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// What happened when a player was sent to the lobby.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    Teleported,
    /// No lobby spawn is configured; the player stays where they are.
    NoSpawns,
    /// The world refused or the player is offline.
    Failed,
}

/// Sends players back to the tournament lobby.
#[async_trait]
pub trait LobbyRouter: Send + Sync + 'static {
    async fn route_to_lobby(&self, player: PlayerId) -> RouteOutcome;
}

/// Everything a session actor talks to besides its own state.
#[derive(Clone)]
pub struct SessionContext {
    pub world: Arc<dyn World>,
    pub ledger: SharedLedger,
    pub lobby: Arc<dyn LobbyRouter>,
}

// ---------------------------------------------------------------------------
// Commands and snapshots
// ---------------------------------------------------------------------------

/// Commands sent to a session actor through its channel.
pub(crate) enum SessionCommand {
    Join {
        player: PlayerId,
        team: Option<String>,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    Leave {
        player: PlayerId,
        reply: oneshot::Sender<()>,
    },
    /// Replies whether the movement may go ahead.
    Move {
        player: PlayerId,
        to: Location,
        reply: oneshot::Sender<bool>,
    },
    Eliminate {
        player: PlayerId,
    },
    AttachProp {
        player: PlayerId,
        prop: PropHandle,
    },
    ForceStart {
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    Standings {
        reply: oneshot::Sender<Vec<PlayerId>>,
    },
    /// Administrative end. Replies once teardown is done.
    End {
        reply: oneshot::Sender<()>,
    },
}

/// Session metadata as of the actor's last step.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub id: SessionId,
    pub state: SessionState,
    pub arena: String,
    /// Everyone on the roster, including finished and eliminated players.
    pub members: Vec<PlayerId>,
    /// Members still playing or waiting to.
    pub active_players: Vec<PlayerId>,
    pub capacity: usize,
    pub countdown_remaining: Option<u32>,
}

impl SessionSnapshot {
    fn of(session: &GameSession) -> Self {
        Self {
            id: session.id(),
            state: session.state(),
            arena: session.arena().name.clone(),
            members: session.roster().members().to_vec(),
            active_players: session.active_players(),
            capacity: session.roster().capacity(),
            countdown_remaining: session.countdown_remaining(),
        }
    }

    /// Joinable and not full.
    pub fn has_room(&self) -> bool {
        self.state.is_joinable() && self.members.len() < self.capacity
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Handle to a running session actor.
///
/// Cheap to clone. Commands fail with [`SessionError::Unavailable`] once
/// the actor has stopped.
#[derive(Clone)]
pub struct SessionHandle {
    id: SessionId,
    sender: mpsc::Sender<SessionCommand>,
    snapshot: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Latest published snapshot. Never blocks.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Whether the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    pub async fn join(&self, player: PlayerId, team: Option<&str>) -> Result<(), SessionError> {
        let team = team.map(str::to_string);
        self.request(|reply| SessionCommand::Join { player, team, reply })
            .await?
    }

    pub async fn leave(&self, player: PlayerId) -> Result<(), SessionError> {
        self.request(|reply| SessionCommand::Leave { player, reply }).await
    }

    /// Returns `false` if the movement must be cancelled.
    pub async fn player_moved(&self, player: PlayerId, to: Location) -> Result<bool, SessionError> {
        self.request(|reply| SessionCommand::Move { player, to, reply }).await
    }

    pub async fn eliminate(&self, player: PlayerId) -> Result<(), SessionError> {
        self.send(SessionCommand::Eliminate { player }).await
    }

    pub async fn attach_prop(&self, player: PlayerId, prop: PropHandle) -> Result<(), SessionError> {
        self.send(SessionCommand::AttachProp { player, prop }).await
    }

    pub async fn force_start(&self) -> Result<(), SessionError> {
        self.request(|reply| SessionCommand::ForceStart { reply }).await?
    }

    pub async fn standings(&self) -> Result<Vec<PlayerId>, SessionError> {
        self.request(|reply| SessionCommand::Standings { reply }).await
    }

    /// Ends the session and waits for its teardown.
    pub async fn end(&self) -> Result<(), SessionError> {
        self.request(|reply| SessionCommand::End { reply }).await
    }

    async fn send(&self, cmd: SessionCommand) -> Result<(), SessionError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| SessionError::Unavailable(self.id))
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(make(reply_tx)).await?;
        reply_rx
            .await
            .map_err(|_| SessionError::Unavailable(self.id))
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

/// One wake-up of the actor loop.
enum Step {
    Command(Option<SessionCommand>),
    Tick(TickInfo),
}

struct SessionActor<R: MinigameRules> {
    session: GameSession,
    ctx: SessionContext,
    clock: TickScheduler,
    /// Ticks per countdown second.
    ticks_per_second: u64,
    /// Session state the clock was last configured for.
    clock_state: SessionState,
    live_since: Option<Instant>,
    receiver: mpsc::Receiver<SessionCommand>,
    snapshot: watch::Sender<SessionSnapshot>,
    _rules: PhantomData<fn() -> R>,
}

impl<R: MinigameRules> SessionActor<R> {
    /// Runs until the session finishes or every handle is dropped.
    async fn run(mut self) {
        let session_id = self.session.id();
        tracing::info!(
            %session_id,
            minigame = R::name(),
            arena = %self.session.arena().name,
            "session actor started"
        );

        loop {
            let step = tokio::select! {
                cmd = self.receiver.recv() => Step::Command(cmd),
                tick = self.clock.wait_for_tick() => Step::Tick(tick),
            };

            match step {
                Step::Command(Some(cmd)) => self.handle(cmd).await,
                Step::Command(None) => {
                    tracing::info!(%session_id, "all handles dropped, ending session");
                    let events = self.session.end();
                    self.dispatch(events).await;
                }
                Step::Tick(tick) => self.on_tick(tick).await,
            }

            self.publish();
            if self.session.state().is_terminal() {
                break;
            }
        }

        tracing::info!(%session_id, "session actor stopped");
    }

    async fn handle(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::Join { player, team, reply } => {
                let result = match self.session.join(player, team.as_deref()) {
                    Ok(events) => {
                        self.dispatch(events).await;
                        Ok(())
                    }
                    Err(e) => {
                        tracing::debug!(session_id = %self.session.id(), player_id = %player, error = %e, "join refused");
                        Err(e)
                    }
                };
                self.publish();
                let _ = reply.send(result);
            }
            SessionCommand::Leave { player, reply } => {
                let events = self.session.leave(player);
                self.dispatch(events).await;
                self.publish();
                let _ = reply.send(());
            }
            SessionCommand::Move { player, to, reply } => {
                let verdict = self.session.handle_move(player, &to, self.live_elapsed());
                if !verdict.allowed {
                    tracing::debug!(
                        session_id = %self.session.id(),
                        player_id = %player,
                        to = %to,
                        "movement suppressed"
                    );
                }
                self.dispatch(verdict.events).await;
                self.publish();
                let _ = reply.send(verdict.allowed);
            }
            SessionCommand::Eliminate { player } => {
                let events = self.session.eliminate(player);
                self.dispatch(events).await;
            }
            SessionCommand::AttachProp { player, prop } => {
                if let Some(previous) = self.session.attach_prop(player, prop) {
                    self.ctx.world.remove_prop(previous);
                }
            }
            SessionCommand::ForceStart { reply } => {
                let result = match self.session.force_start() {
                    Ok(events) => {
                        self.dispatch(events).await;
                        Ok(())
                    }
                    Err(e) => Err(e),
                };
                self.publish();
                let _ = reply.send(result);
            }
            SessionCommand::Standings { reply } => {
                let _ = reply.send(self.session.standings());
            }
            SessionCommand::End { reply } => {
                tracing::info!(session_id = %self.session.id(), "session ended by operator");
                let events = self.session.end();
                self.dispatch(events).await;
                self.publish();
                let _ = reply.send(());
            }
        }
    }

    /// Clock tick. The session state is checked afresh every time: a tick
    /// scheduled during a countdown that was since cancelled does nothing.
    async fn on_tick(&mut self, tick: TickInfo) {
        match self.session.state() {
            SessionState::Countdown => {
                if tick.tick % self.ticks_per_second == 0 {
                    let events = self.session.countdown_tick();
                    self.dispatch(events).await;
                }
            }
            SessionState::InGame => {
                let awards = R::periodic_awards(&self.session);
                self.apply_awards(awards).await;
                let events = self.session.tick(self.live_elapsed());
                self.dispatch(events).await;
            }
            state => {
                tracing::trace!(session_id = %self.session.id(), %state, "stale tick ignored");
            }
        }
    }

    /// Keeps the clock in step with the session: restarted on entering a
    /// countdown or going live, paused otherwise.
    /// Syncs the clock and publishes a fresh snapshot. Runs before every
    /// reply, so a caller that awaited a command reads the state it caused.
    fn publish(&mut self) {
        self.sync_clock();
        self.snapshot.send_replace(SessionSnapshot::of(&self.session));
    }

    fn sync_clock(&mut self) {
        let state = self.session.state();
        if state == self.clock_state {
            return;
        }
        match state {
            SessionState::Countdown => self.clock.restart(),
            SessionState::InGame => {
                self.live_since = Some(Instant::now());
                self.clock.restart();
            }
            SessionState::Lobby | SessionState::Finished => self.clock.pause(),
        }
        self.clock_state = state;
    }

    fn live_elapsed(&self) -> Duration {
        self.live_since.map(|t| t.elapsed()).unwrap_or_default()
    }

    // -----------------------------------------------------------------------
    // Event dispatch
    // -----------------------------------------------------------------------

    async fn dispatch(&mut self, events: Vec<SessionEvent>) {
        for event in &events {
            let awards = R::awards(&self.session, event);
            self.apply_awards(awards).await;
            self.apply(event).await;
        }
    }

    async fn apply(&mut self, event: &SessionEvent) {
        let session_id = self.session.id();
        let world = Arc::clone(&self.ctx.world);

        match event {
            SessionEvent::Joined { player, team } => {
                tracing::info!(
                    %session_id,
                    player_id = %player,
                    team = team.as_deref().unwrap_or("-"),
                    players = self.session.roster().len(),
                    "player joined"
                );
                if let Some(team) = team {
                    world.notify(*player, &Notice::TeamJoined { team: team.clone() });
                }
            }
            SessionEvent::TeamSwitched { player, from, to } => {
                tracing::info!(%session_id, player_id = %player, from = %from, to = %to, "player switched team");
                world.notify(*player, &Notice::TeamJoined { team: to.clone() });
            }
            SessionEvent::AlreadyOnTeam { player, team } => {
                if let Some(team) = team {
                    world.notify(*player, &Notice::AlreadyOnTeam { team: team.clone() });
                }
            }
            SessionEvent::Left { player } => {
                tracing::info!(
                    %session_id,
                    player_id = %player,
                    players = self.session.roster().len(),
                    "player left"
                );
            }
            SessionEvent::StateChanged { from, to } => {
                tracing::info!(%session_id, %from, %to, "session state changed");
                if *to == SessionState::InGame {
                    self.notify_members(&Notice::GameStarted);
                }
            }
            SessionEvent::CountdownTick { remaining } => {
                self.notify_members(&Notice::CountdownTick {
                    remaining: *remaining,
                });
            }
            SessionEvent::CountdownCancelled => {
                tracing::info!(%session_id, "countdown cancelled, roster below minimum");
                self.notify_members(&Notice::CountdownCancelled);
            }
            SessionEvent::Teleport { player, to } => {
                if let Err(e) = world.teleport(*player, to) {
                    tracing::warn!(%session_id, player_id = %player, error = %e, "teleport to spawn failed");
                }
            }
            SessionEvent::CheckpointReached { player, index, total } => {
                tracing::debug!(%session_id, player_id = %player, index, total, "checkpoint reached");
                world.notify(
                    *player,
                    &Notice::CheckpointReached {
                        index: *index,
                        total: *total,
                    },
                );
            }
            SessionEvent::Finished { player, rank, elapsed } => {
                tracing::info!(
                    %session_id,
                    player_id = %player,
                    rank,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "player finished"
                );
                world.notify(*player, &Notice::Finished { rank: *rank });
            }
            SessionEvent::Eliminated { player } => {
                tracing::info!(%session_id, player_id = %player, "player eliminated");
                world.notify(*player, &Notice::Eliminated);
            }
            SessionEvent::PropReleased { player, prop } => {
                tracing::debug!(%session_id, player_id = %player, prop = prop.0, "prop removed");
                world.remove_prop(*prop);
            }
            SessionEvent::ReturnToLobby { player } => {
                let outcome = self.ctx.lobby.route_to_lobby(*player).await;
                tracing::debug!(%session_id, player_id = %player, ?outcome, "returned to lobby");
            }
            SessionEvent::SessionOver { winners, standings } => {
                tracing::info!(
                    %session_id,
                    minigame = R::name(),
                    winners = winners.len(),
                    placed = standings.len(),
                    "session over"
                );
                self.record_results(winners).await;
                let notice = Notice::SessionOver {
                    winners: winners.clone(),
                };
                for player in self.session.lineup() {
                    world.notify(player, &notice);
                }
            }
        }
    }

    fn notify_members(&self, notice: &Notice) {
        for &player in self.session.roster().members() {
            self.ctx.world.notify(player, notice);
        }
    }

    async fn apply_awards(&self, awards: Vec<ScoreAward>) {
        if awards.is_empty() {
            return;
        }
        let mut ledger = self.ctx.ledger.lock().await;
        for award in awards {
            ledger.add_score(award.player, R::name(), award.points, &award.reason);
        }
    }

    /// Played for everyone in the lineup, won for the winners.
    async fn record_results(&self, winners: &[PlayerId]) {
        let lineup: Vec<PlayerId> = self.session.lineup().collect();
        if lineup.is_empty() {
            return;
        }
        let mut ledger = self.ctx.ledger.lock().await;
        for &player in &lineup {
            ledger.record_game_played(player);
            ledger.set_display_name(player, &self.ctx.world.display_name(player));
        }
        for &player in winners {
            ledger.record_game_won(player);
        }
    }
}

/// Spawns a session actor for minigame `R` on `arena` and returns a handle
/// to it.
///
/// `channel_size` bounds the command queue; senders wait when it is full.
pub(crate) fn spawn_session<R: MinigameRules>(
    id: SessionId,
    arena: Arc<Arena>,
    config: SessionConfig,
    ctx: SessionContext,
    channel_size: usize,
) -> SessionHandle {
    let clock_config = TickConfig::with_rate(config.tick_rate_hz.max(1)).validated();
    let ticks_per_second = u64::from(clock_config.tick_rate_hz);
    let session = GameSession::new(id, arena, config);

    let (tx, rx) = mpsc::channel(channel_size);
    let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot::of(&session));

    let actor = SessionActor::<R> {
        session,
        ctx,
        clock: TickScheduler::new(clock_config),
        ticks_per_second,
        clock_state: SessionState::Lobby,
        live_since: None,
        receiver: rx,
        snapshot: snapshot_tx,
        _rules: PhantomData,
    };

    tokio::spawn(actor.run());

    SessionHandle {
        id,
        sender: tx,
        snapshot: snapshot_rx,
    }
}
