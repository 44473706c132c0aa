//! The session lifecycle state machine.
//!
//! [`GameSession`] is pure: every operation mutates local state and returns
//! the [`SessionEvent`]s it produced. The actor turns those into teleports,
//! notices, and ledger writes. That keeps every ordering and idempotence
//! rule testable without a runtime.

use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use ringmaster_arena::{Arena, ProgressStep, ProgressTracker};
use ringmaster_core::{Location, PlayerId, PropHandle, SessionId};

use crate::{JoinOutcome, Roster, SessionConfig, SessionError, SessionState, WinCondition};

/// Something that happened inside a session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Joined { player: PlayerId, team: Option<String> },
    TeamSwitched { player: PlayerId, from: String, to: String },
    /// A join or team request that changed nothing.
    AlreadyOnTeam { player: PlayerId, team: Option<String> },
    Left { player: PlayerId },
    StateChanged { from: SessionState, to: SessionState },
    CountdownTick { remaining: u32 },
    CountdownCancelled,
    Teleport { player: PlayerId, to: Location },
    CheckpointReached { player: PlayerId, index: usize, total: usize },
    Finished { player: PlayerId, rank: u32, elapsed: Duration },
    Eliminated { player: PlayerId },
    /// A prop attached to the player must be removed from the world.
    PropReleased { player: PlayerId, prop: PropHandle },
    /// The player is done here and should be sent back to the lobby.
    ReturnToLobby { player: PlayerId },
    SessionOver { winners: Vec<PlayerId>, standings: Vec<PlayerId> },
}

/// Whether a movement may go ahead, plus whatever it caused.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveVerdict {
    pub allowed: bool,
    pub events: Vec<SessionEvent>,
}

impl MoveVerdict {
    fn allow(events: Vec<SessionEvent>) -> Self {
        Self {
            allowed: true,
            events,
        }
    }

    fn suppress() -> Self {
        Self {
            allowed: false,
            events: Vec::new(),
        }
    }
}

/// Identity used by win conditions: a team, or a solo player.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Group {
    Team(String),
    Solo(PlayerId),
}

/// One running instance of a minigame on one arena.
pub struct GameSession {
    id: SessionId,
    state: SessionState,
    arena: Arc<Arena>,
    config: SessionConfig,
    roster: Roster,
    /// Everyone present when the game went live, with their team then.
    lineup: Vec<(PlayerId, Option<String>)>,
    progress: HashMap<PlayerId, ProgressTracker>,
    finish_order: Vec<PlayerId>,
    eliminated: Vec<PlayerId>,
    /// Finished or eliminated: still on the roster, no longer playing.
    done: HashSet<PlayerId>,
    countdown_remaining: u32,
    winners: Vec<PlayerId>,
}

impl GameSession {
    /// A new session in `Lobby`.
    ///
    /// Capacity is the smaller of the config's and the arena's maximum (and
    /// of the team slots in team mode); the start threshold is the larger of
    /// the two minimums.
    pub fn new(id: SessionId, arena: Arc<Arena>, config: SessionConfig) -> Self {
        let capacity = config.capacity_on(arena.max_players);
        let min_players = config.min_players.max(arena.min_players);
        let roster = Roster::new(&config.roster, capacity, min_players, config.min_team_size);
        Self {
            id,
            state: SessionState::Lobby,
            arena,
            config,
            roster,
            lineup: Vec::new(),
            progress: HashMap::new(),
            finish_order: Vec::new(),
            eliminated: Vec::new(),
            done: HashSet::new(),
            countdown_remaining: 0,
            winners: Vec::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Membership
    // -----------------------------------------------------------------------

    /// Adds `player` (optionally to `team`), or switches their team.
    ///
    /// With auto-start on, reaching the minimum in `Lobby` starts the
    /// countdown. A switch during `Countdown` that breaks the minimum
    /// cancels it.
    ///
    /// # Errors
    /// - [`SessionError::InvalidState`] unless `Lobby` or `Countdown`
    /// - [`SessionError::Roster`] for team or capacity conflicts; nothing
    ///   changes in that case
    pub fn join(&mut self, player: PlayerId, team: Option<&str>) -> Result<Vec<SessionEvent>, SessionError> {
        if !self.state.is_joinable() {
            return Err(self.invalid_state("join"));
        }

        let mut events = vec![match self.roster.join(player, team)? {
            JoinOutcome::Joined { team } => SessionEvent::Joined { player, team },
            JoinOutcome::Switched { from, to } => SessionEvent::TeamSwitched { player, from, to },
            JoinOutcome::AlreadyMember { team } => SessionEvent::AlreadyOnTeam { player, team },
        }];

        match self.state {
            SessionState::Lobby if self.config.auto_start && self.roster.has_minimum() => {
                self.start_countdown(&mut events);
            }
            SessionState::Countdown if !self.roster.has_minimum() => {
                self.cancel_countdown(&mut events);
            }
            _ => {}
        }
        Ok(events)
    }

    /// Removes `player` (leave or disconnect). Idempotent: an unknown
    /// player produces no events.
    ///
    /// - `Countdown`: drops back to `Lobby` if the minimum is lost.
    /// - `InGame`: releases the player's prop, keeps their progress for the
    ///   standings, and re-checks the win condition.
    /// - In any state, an emptied session finishes.
    pub fn leave(&mut self, player: PlayerId) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        if self.state.is_terminal() {
            return events;
        }

        let was_playing = self.state.is_live() && self.is_active(player);
        if self.roster.leave(player).is_none() {
            return events;
        }
        events.push(SessionEvent::Left { player });
        if was_playing {
            self.release_prop(player, &mut events);
        }

        if self.roster.is_empty() {
            self.finish_into(&mut events, false);
            return events;
        }

        match self.state {
            SessionState::Countdown if !self.roster.has_minimum() => {
                self.cancel_countdown(&mut events);
            }
            SessionState::InGame => self.check_win(&mut events),
            _ => {}
        }
        events
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Starts the countdown now. A session already counting down is left
    /// alone.
    ///
    /// # Errors
    /// - [`SessionError::InvalidState`] once the game is live or over
    /// - [`SessionError::NotEnoughPlayers`] below the minimum
    pub fn force_start(&mut self) -> Result<Vec<SessionEvent>, SessionError> {
        match self.state {
            SessionState::Lobby => {}
            SessionState::Countdown => return Ok(Vec::new()),
            SessionState::InGame | SessionState::Finished => {
                return Err(self.invalid_state("start"));
            }
        }
        if !self.roster.has_minimum() {
            return Err(SessionError::NotEnoughPlayers {
                have: self.roster.len(),
                need: self.roster.min_players(),
            });
        }
        let mut events = Vec::new();
        self.start_countdown(&mut events);
        Ok(events)
    }

    /// One second of countdown. Stale ticks (the session is no longer
    /// counting down) do nothing. At zero the game goes live.
    pub fn countdown_tick(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        if self.state != SessionState::Countdown {
            return events;
        }
        self.countdown_remaining = self.countdown_remaining.saturating_sub(1);
        if self.countdown_remaining == 0 {
            self.begin(&mut events);
        } else {
            events.push(SessionEvent::CountdownTick {
                remaining: self.countdown_remaining,
            });
        }
        events
    }

    /// In-game clock. Finishes the session once the time limit, if any,
    /// has passed.
    pub fn tick(&mut self, elapsed: Duration) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        if !self.state.is_live() {
            return events;
        }
        if let Some(limit) = self.config.time_limit {
            if elapsed >= limit {
                self.finish_into(&mut events, true);
            }
        }
        events
    }

    /// Administrative end. Finishes from any state and releases props, but
    /// leaves returning players to the caller.
    pub fn end(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        self.finish_into(&mut events, false);
        events
    }

    // -----------------------------------------------------------------------
    // In-game input
    // -----------------------------------------------------------------------

    /// Judges one movement by `player` to `to`.
    ///
    /// Members are frozen during `Countdown`. While live, leaving the
    /// protection region is refused, entering a hazard eliminates, and
    /// otherwise checkpoint progress is applied. Everyone else moves freely.
    pub fn handle_move(&mut self, player: PlayerId, to: &Location, elapsed: Duration) -> MoveVerdict {
        match self.state {
            SessionState::Countdown if self.roster.contains(player) => MoveVerdict::suppress(),
            SessionState::InGame if self.is_active(player) => self.live_move(player, to, elapsed),
            _ => MoveVerdict::allow(Vec::new()),
        }
    }

    fn live_move(&mut self, player: PlayerId, to: &Location, elapsed: Duration) -> MoveVerdict {
        if !self.arena.within_bounds(to) {
            return MoveVerdict::suppress();
        }
        if self.arena.in_hazard(to) {
            return MoveVerdict::allow(self.eliminate(player));
        }

        let Some(tracker) = self.progress.get_mut(&player) else {
            return MoveVerdict::allow(Vec::new());
        };
        let mut events = Vec::new();
        match self.arena.check_progress(tracker, to) {
            ProgressStep::Checkpoint { index, total } => {
                events.push(SessionEvent::CheckpointReached { player, index, total });
                self.check_win(&mut events);
            }
            ProgressStep::ReachedFinish => self.record_finish(player, elapsed, &mut events),
            ProgressStep::Nothing | ProgressStep::AlreadyFinished => {}
        }
        MoveVerdict::allow(events)
    }

    /// Knocks `player` out of a live game. No-op for anyone not playing.
    pub fn eliminate(&mut self, player: PlayerId) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        if !self.state.is_live() || !self.is_active(player) {
            return events;
        }
        self.eliminated.push(player);
        self.done.insert(player);
        events.push(SessionEvent::Eliminated { player });
        self.release_prop(player, &mut events);
        events.push(SessionEvent::ReturnToLobby { player });
        self.check_win(&mut events);
        events
    }

    /// Attaches a prop (vehicle) to a playing participant. Returns the prop
    /// it replaces, which the caller should remove. `None` with no effect
    /// for non-players.
    pub fn attach_prop(&mut self, player: PlayerId, prop: PropHandle) -> Option<PropHandle> {
        if !self.is_active(player) {
            return None;
        }
        self.progress.get_mut(&player)?.attach_prop(prop)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn countdown_remaining(&self) -> Option<u32> {
        (self.state == SessionState::Countdown).then_some(self.countdown_remaining)
    }

    pub fn tracker(&self, player: PlayerId) -> Option<&ProgressTracker> {
        self.progress.get(&player)
    }

    pub fn finish_order(&self) -> &[PlayerId] {
        &self.finish_order
    }

    /// Everyone who was present when the game went live.
    pub fn lineup(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.lineup.iter().map(|(p, _)| *p)
    }

    pub fn winners(&self) -> &[PlayerId] {
        &self.winners
    }

    /// Members still playing (or waiting to), in join order. Empty once
    /// finished.
    pub fn active_players(&self) -> Vec<PlayerId> {
        if self.state.is_terminal() {
            return Vec::new();
        }
        self.roster
            .members()
            .iter()
            .copied()
            .filter(|p| !self.done.contains(p))
            .collect()
    }

    pub fn is_active(&self, player: PlayerId) -> bool {
        !self.state.is_terminal() && self.roster.contains(player) && !self.done.contains(&player)
    }

    /// Finishers by rank, then the rest of the lineup by checkpoint progress
    /// (ties in lineup order), then the eliminated, last one out first.
    pub fn standings(&self) -> Vec<PlayerId> {
        let mut racing: Vec<PlayerId> = self.lineup().filter(|p| !self.done.contains(p)).collect();
        racing.sort_by_key(|p| Reverse(self.progress.get(p).map_or(0, ProgressTracker::next_checkpoint)));

        let mut standings = self.finish_order.clone();
        standings.extend(racing);
        standings.extend(self.eliminated.iter().rev());
        standings
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn transition(&mut self, to: SessionState, events: &mut Vec<SessionEvent>) {
        let from = self.state;
        if !from.can_transition_to(to) {
            return;
        }
        self.state = to;
        events.push(SessionEvent::StateChanged { from, to });
    }

    fn start_countdown(&mut self, events: &mut Vec<SessionEvent>) {
        self.transition(SessionState::Countdown, events);
        self.countdown_remaining = self.config.countdown_secs;
        if self.countdown_remaining == 0 {
            self.begin(events);
        } else {
            events.push(SessionEvent::CountdownTick {
                remaining: self.countdown_remaining,
            });
        }
    }

    fn cancel_countdown(&mut self, events: &mut Vec<SessionEvent>) {
        self.transition(SessionState::Lobby, events);
        self.countdown_remaining = 0;
        events.push(SessionEvent::CountdownCancelled);
    }

    /// Countdown expiry: go live and send everyone to their spawn. Teams
    /// share the spawn at their declaration index.
    fn begin(&mut self, events: &mut Vec<SessionEvent>) {
        self.transition(SessionState::InGame, events);

        let members = self.roster.members().to_vec();
        self.lineup = members
            .iter()
            .map(|&p| (p, self.roster.team_of(p).map(str::to_string)))
            .collect();
        self.progress = members.iter().map(|&p| (p, ProgressTracker::new())).collect();

        let placements = if self.roster.is_team_mode() {
            members
                .iter()
                .filter_map(|&p| {
                    let slot = self.roster.team_index(p)?;
                    self.arena.spawn_for(slot).map(|loc| (p, loc))
                })
                .collect()
        } else {
            self.arena.distribute(&members)
        };
        events.extend(
            placements
                .into_iter()
                .map(|(player, to)| SessionEvent::Teleport { player, to }),
        );
        // A lineup of one group has already won.
        self.check_win(events);
    }

    /// Rank is `finishers so far + 1`, assigned once.
    fn record_finish(&mut self, player: PlayerId, elapsed: Duration, events: &mut Vec<SessionEvent>) {
        let rank = self.finish_order.len() as u32 + 1;
        let Some(tracker) = self.progress.get_mut(&player) else {
            return;
        };
        if tracker.is_finished() {
            return;
        }
        tracker.mark_finished(rank, elapsed);
        self.finish_order.push(player);
        self.done.insert(player);

        events.push(SessionEvent::Finished { player, rank, elapsed });
        self.release_prop(player, events);
        events.push(SessionEvent::ReturnToLobby { player });
        self.check_win(events);
    }

    fn release_prop(&mut self, player: PlayerId, events: &mut Vec<SessionEvent>) {
        if let Some(prop) = self.progress.get_mut(&player).and_then(ProgressTracker::take_prop) {
            events.push(SessionEvent::PropReleased { player, prop });
        }
    }

    fn check_win(&mut self, events: &mut Vec<SessionEvent>) {
        if !self.state.is_live() {
            return;
        }
        let over = match self.config.win_condition {
            WinCondition::AllFinished => self.active_players().is_empty(),
            WinCondition::LastGroupStanding => self.surviving_groups().len() <= 1,
        };
        if over {
            self.finish_into(events, true);
        }
    }

    /// Moves to `Finished`, computing winners and standings first. With
    /// `route_home`, everyone still playing is sent back to the lobby.
    fn finish_into(&mut self, events: &mut Vec<SessionEvent>, route_home: bool) {
        if self.state.is_terminal() {
            return;
        }
        let was_live = self.state.is_live();
        let survivors = self.active_players();
        let standings = self.standings();
        self.winners = if was_live { self.decide_winners() } else { Vec::new() };

        self.transition(SessionState::Finished, events);
        events.push(SessionEvent::SessionOver {
            winners: self.winners.clone(),
            standings,
        });

        if was_live {
            for player in survivors {
                self.release_prop(player, events);
                if route_home {
                    events.push(SessionEvent::ReturnToLobby { player });
                }
            }
        }
    }

    fn decide_winners(&self) -> Vec<PlayerId> {
        match self.config.win_condition {
            WinCondition::AllFinished => self
                .finish_order
                .first()
                .map(|&first| self.group_members(first))
                .unwrap_or_default(),
            WinCondition::LastGroupStanding => {
                let survivors = self.active_players();
                match (self.surviving_groups().len(), survivors.first()) {
                    (1, Some(&p)) => self.group_members(p),
                    // Nobody left, or a time-out with several groups: no winner.
                    _ => Vec::new(),
                }
            }
        }
    }

    fn group_of(&self, player: PlayerId) -> Group {
        let team = self
            .lineup
            .iter()
            .find(|(p, _)| *p == player)
            .and_then(|(_, team)| team.clone());
        match team {
            Some(team) => Group::Team(team),
            None => Group::Solo(player),
        }
    }

    /// The player's whole lineup group, including teammates who already
    /// finished, were eliminated, or left.
    fn group_members(&self, player: PlayerId) -> Vec<PlayerId> {
        let group = self.group_of(player);
        match group {
            Group::Solo(p) => vec![p],
            Group::Team(_) => self.lineup().filter(|&p| self.group_of(p) == group).collect(),
        }
    }

    fn surviving_groups(&self) -> HashSet<Group> {
        self.active_players().into_iter().map(|p| self.group_of(p)).collect()
    }

    fn invalid_state(&self, operation: &'static str) -> SessionError {
        SessionError::InvalidState {
            session: self.id,
            state: self.state,
            operation,
        }
    }
}

#[cfg(test)]
mod tests {
    use ringmaster_arena::SpatialRegion;
    use ringmaster_core::{Point, WorldId};

    use super::*;
    use crate::{RosterError, RosterMode, TeamSpec};

    fn pid(id: u64) -> PlayerId {
        PlayerId(id)
    }

    fn region(x: f64, y: f64, z: f64) -> SpatialRegion {
        SpatialRegion::new(WorldId::new("w"), Point::new(x, y, z), Point::new(x + 2.0, y + 2.0, z + 2.0))
    }

    fn at(x: f64, y: f64, z: f64) -> Location {
        Location::new("w", x, y, z)
    }

    /// Two checkpoints along +z, finish at z=30, a hazard pit below y=0.
    fn arena() -> Arc<Arena> {
        Arc::new(
            Arena::new("track", WorldId::new("w"))
                .with_spawn(Point::new(0.0, 0.0, 0.0))
                .with_spawn(Point::new(5.0, 0.0, 0.0))
                .with_checkpoint(region(0.0, 0.0, 10.0))
                .with_checkpoint(region(0.0, 0.0, 20.0))
                .with_finish(region(0.0, 0.0, 30.0))
                .with_protection(SpatialRegion::new(
                    WorldId::new("w"),
                    Point::new(-50.0, -20.0, -50.0),
                    Point::new(50.0, 50.0, 50.0),
                ))
                .with_hazard(SpatialRegion::new(
                    WorldId::new("w"),
                    Point::new(-50.0, -20.0, -50.0),
                    Point::new(50.0, -5.0, 50.0),
                )),
        )
    }

    fn config() -> SessionConfig {
        SessionConfig {
            countdown_secs: 3,
            ..SessionConfig::default()
        }
    }

    fn teams_config() -> SessionConfig {
        SessionConfig {
            roster: RosterMode::Teams(vec![TeamSpec::new("A", 2, "red"), TeamSpec::new("B", 2, "blue")]),
            win_condition: WinCondition::LastGroupStanding,
            ..config()
        }
    }

    fn session(config: SessionConfig) -> GameSession {
        GameSession::new(SessionId(1), arena(), config)
    }

    /// A solo session with `n` players, already live.
    fn live(n: u64) -> GameSession {
        let mut s = session(config());
        for i in 1..=n {
            s.join(pid(i), None).unwrap();
        }
        while s.state() == SessionState::Countdown {
            s.countdown_tick();
        }
        assert_eq!(s.state(), SessionState::InGame);
        s
    }

    /// Walks `player` through both checkpoints and the finish.
    fn run_course(s: &mut GameSession, player: PlayerId, secs: u64) -> Vec<SessionEvent> {
        let elapsed = Duration::from_secs(secs);
        let mut events = Vec::new();
        for z in [11.0, 21.0, 31.0] {
            events.extend(s.handle_move(player, &at(1.0, 1.0, z), elapsed).events);
        }
        events
    }

    // =========================================================================
    // Lobby and countdown
    // =========================================================================

    #[test]
    fn test_join_reaching_minimum_starts_countdown() {
        let mut s = session(config());
        let events = s.join(pid(1), None).unwrap();
        assert_eq!(events, vec![SessionEvent::Joined { player: pid(1), team: None }]);

        let events = s.join(pid(2), None).unwrap();

        assert_eq!(s.state(), SessionState::Countdown);
        assert!(events.contains(&SessionEvent::StateChanged {
            from: SessionState::Lobby,
            to: SessionState::Countdown
        }));
        assert!(events.contains(&SessionEvent::CountdownTick { remaining: 3 }));
        assert_eq!(s.countdown_remaining(), Some(3));
    }

    #[test]
    fn test_join_without_auto_start_stays_in_lobby() {
        let mut s = session(SessionConfig {
            auto_start: false,
            ..config()
        });
        s.join(pid(1), None).unwrap();
        s.join(pid(2), None).unwrap();
        assert_eq!(s.state(), SessionState::Lobby);

        s.force_start().unwrap();
        assert_eq!(s.state(), SessionState::Countdown);
    }

    #[test]
    fn test_force_start_below_minimum_fails() {
        let mut s = session(SessionConfig {
            auto_start: false,
            ..config()
        });
        s.join(pid(1), None).unwrap();

        let err = s.force_start().unwrap_err();

        assert!(matches!(err, SessionError::NotEnoughPlayers { have: 1, need: 2 }));
        assert_eq!(s.state(), SessionState::Lobby);
    }

    #[test]
    fn test_countdown_expiry_teleports_to_spawns() {
        let mut s = session(config());
        s.join(pid(1), None).unwrap();
        s.join(pid(2), None).unwrap();
        s.join(pid(3), None).unwrap();

        assert_eq!(s.countdown_tick(), vec![SessionEvent::CountdownTick { remaining: 2 }]);
        s.countdown_tick();
        let events = s.countdown_tick();

        assert_eq!(s.state(), SessionState::InGame);
        let teleports: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::Teleport { player, to } => Some((*player, to.point)),
                _ => None,
            })
            .collect();
        assert_eq!(
            teleports,
            vec![
                (pid(1), Point::new(0.0, 0.0, 0.0)),
                (pid(2), Point::new(5.0, 0.0, 0.0)),
                (pid(3), Point::new(0.0, 0.0, 0.0)),
            ]
        );
    }

    #[test]
    fn test_countdown_leave_below_minimum_reverts_to_lobby() {
        let mut s = session(config());
        s.join(pid(1), None).unwrap();
        s.join(pid(2), None).unwrap();

        let events = s.leave(pid(2));

        assert_eq!(s.state(), SessionState::Lobby);
        assert!(events.contains(&SessionEvent::CountdownCancelled));
        // A tick scheduled before the cancel is now stale.
        assert!(s.countdown_tick().is_empty());
        assert_eq!(s.state(), SessionState::Lobby);
    }

    #[test]
    fn test_countdown_movement_is_frozen_for_members_only() {
        let mut s = session(config());
        s.join(pid(1), None).unwrap();
        s.join(pid(2), None).unwrap();

        let verdict = s.handle_move(pid(1), &at(1.0, 1.0, 11.0), Duration::ZERO);
        assert!(!verdict.allowed);

        let outsider = s.handle_move(pid(9), &at(1.0, 1.0, 11.0), Duration::ZERO);
        assert!(outsider.allowed);
    }

    #[test]
    fn test_join_in_game_is_rejected() {
        let mut s = live(2);
        let err = s.join(pid(3), None).unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidState {
                state: SessionState::InGame,
                ..
            }
        ));
    }

    // =========================================================================
    // Teams
    // =========================================================================

    #[test]
    fn test_team_switch_during_countdown_keeps_counting() {
        let mut s = session(teams_config());
        s.join(pid(1), Some("A")).unwrap();
        s.join(pid(2), Some("A")).unwrap();
        assert_eq!(s.state(), SessionState::Countdown);

        let events = s.join(pid(1), Some("B")).unwrap();

        assert_eq!(
            events,
            vec![SessionEvent::TeamSwitched {
                player: pid(1),
                from: "A".into(),
                to: "B".into()
            }]
        );
        assert_eq!(s.roster().team_of(pid(1)), Some("B"));
        assert_eq!(s.roster().team_of(pid(2)), Some("A"));
        assert_eq!(s.state(), SessionState::Countdown);
    }

    #[test]
    fn test_team_full_leaves_roster_untouched() {
        let mut s = session(teams_config());
        s.join(pid(1), Some("A")).unwrap();
        s.join(pid(2), Some("A")).unwrap();

        let err = s.join(pid(3), Some("A")).unwrap_err();

        assert!(matches!(err, SessionError::Roster(RosterError::TeamFull(ref t)) if t == "A"));
        assert!(!s.roster().contains(pid(3)));
    }

    #[test]
    fn test_same_team_pair_counts_down_then_reverts_on_disconnect() {
        let mut s = session(teams_config());
        s.join(pid(1), Some("A")).unwrap();
        s.join(pid(2), Some("A")).unwrap();
        assert_eq!(s.state(), SessionState::Countdown);

        let events = s.leave(pid(2));

        assert_eq!(s.state(), SessionState::Lobby);
        assert!(events.contains(&SessionEvent::CountdownCancelled));
        assert_eq!(s.roster().team_members("A"), &[pid(1)]);
    }

    #[test]
    fn test_same_team_pair_wins_as_soon_as_it_goes_live() {
        let mut s = session(teams_config());
        s.join(pid(1), Some("A")).unwrap();
        s.join(pid(2), Some("A")).unwrap();
        s.countdown_tick();
        s.countdown_tick();

        let events = s.countdown_tick();

        assert_eq!(s.state(), SessionState::Finished);
        assert_eq!(s.winners(), &[pid(1), pid(2)]);
        assert!(events.contains(&SessionEvent::StateChanged {
            from: SessionState::Countdown,
            to: SessionState::InGame
        }));
        assert!(events.contains(&SessionEvent::ReturnToLobby { player: pid(1) }));
        assert!(events.contains(&SessionEvent::ReturnToLobby { player: pid(2) }));
    }

    #[test]
    fn test_teams_spawn_at_team_index() {
        let mut s = session(teams_config());
        s.join(pid(1), Some("B")).unwrap();
        s.join(pid(2), Some("A")).unwrap();
        s.countdown_tick();
        s.countdown_tick();
        let events = s.countdown_tick();

        assert!(events.contains(&SessionEvent::Teleport {
            player: pid(1),
            to: Location::new("w", 5.0, 0.0, 0.0)
        }));
        assert!(events.contains(&SessionEvent::Teleport {
            player: pid(2),
            to: Location::new("w", 0.0, 0.0, 0.0)
        }));
    }

    #[test]
    fn test_last_team_standing_wins_with_eliminated_teammates() {
        let mut s = session(teams_config());
        s.join(pid(1), Some("A")).unwrap();
        s.join(pid(2), Some("A")).unwrap();
        s.join(pid(3), Some("B")).unwrap();
        s.join(pid(4), Some("B")).unwrap();
        for _ in 0..3 {
            s.countdown_tick();
        }

        s.eliminate(pid(1));
        s.eliminate(pid(3));
        assert_eq!(s.state(), SessionState::InGame);
        let events = s.eliminate(pid(4));

        assert_eq!(s.state(), SessionState::Finished);
        assert_eq!(s.winners(), &[pid(1), pid(2)]);
        assert!(events.contains(&SessionEvent::ReturnToLobby { player: pid(2) }));
    }

    // =========================================================================
    // Progress and ranking
    // =========================================================================

    #[test]
    fn test_finish_ranks_follow_finish_order() {
        let mut s = live(3);

        run_course(&mut s, pid(2), 10);
        run_course(&mut s, pid(3), 12);
        let events = run_course(&mut s, pid(1), 15);

        assert_eq!(s.finish_order(), &[pid(2), pid(3), pid(1)]);
        let ranks: Vec<_> = s
            .finish_order()
            .iter()
            .map(|p| s.tracker(*p).unwrap().final_position().unwrap())
            .collect();
        assert_eq!(ranks, vec![1, 2, 3]);
        assert!(events.contains(&SessionEvent::SessionOver {
            winners: vec![pid(2)],
            standings: vec![pid(2), pid(3), pid(1)],
        }));
    }

    #[test]
    fn test_finish_region_twice_keeps_first_rank() {
        let mut s = live(3);
        run_course(&mut s, pid(1), 10);

        let again = s.handle_move(pid(1), &at(1.0, 1.0, 31.0), Duration::from_secs(20));

        assert!(again.events.is_empty());
        assert_eq!(s.tracker(pid(1)).unwrap().final_position(), Some(1));
        assert_eq!(s.finish_order(), &[pid(1)]);
    }

    #[test]
    fn test_finish_without_checkpoints_is_ignored() {
        let mut s = live(2);
        let verdict = s.handle_move(pid(1), &at(1.0, 1.0, 31.0), Duration::from_secs(1));
        assert!(verdict.allowed);
        assert!(verdict.events.is_empty());
        assert!(!s.tracker(pid(1)).unwrap().is_finished());
    }

    #[test]
    fn test_skipped_checkpoint_does_not_count() {
        let mut s = live(2);
        let verdict = s.handle_move(pid(1), &at(1.0, 1.0, 21.0), Duration::ZERO);
        assert!(verdict.events.is_empty());
        assert_eq!(s.tracker(pid(1)).unwrap().next_checkpoint(), 0);

        let verdict = s.handle_move(pid(1), &at(1.0, 1.0, 11.0), Duration::ZERO);
        assert_eq!(
            verdict.events,
            vec![SessionEvent::CheckpointReached {
                player: pid(1),
                index: 0,
                total: 2
            }]
        );
    }

    #[test]
    fn test_leaving_protection_region_is_suppressed() {
        let mut s = live(2);
        let verdict = s.handle_move(pid(1), &at(80.0, 1.0, 0.0), Duration::ZERO);
        assert!(!verdict.allowed);
    }

    #[test]
    fn test_hazard_eliminates_and_returns_player() {
        let mut s = live(3);

        let verdict = s.handle_move(pid(2), &at(0.0, -10.0, 0.0), Duration::ZERO);

        assert!(verdict.allowed);
        assert_eq!(
            verdict.events,
            vec![
                SessionEvent::Eliminated { player: pid(2) },
                SessionEvent::ReturnToLobby { player: pid(2) },
            ]
        );
        assert!(!s.is_active(pid(2)));
        // Eliminated players no longer trigger anything.
        assert!(s.eliminate(pid(2)).is_empty());
    }

    #[test]
    fn test_standings_order_finishers_progress_then_eliminated() {
        let mut s = live(5);
        s.attach_prop(pid(5), PropHandle(7));
        run_course(&mut s, pid(3), 5);
        s.handle_move(pid(4), &at(1.0, 1.0, 11.0), Duration::ZERO);
        s.eliminate(pid(1));
        s.eliminate(pid(2));

        let events = s.end();

        let standings = vec![pid(3), pid(4), pid(5), pid(2), pid(1)];
        assert!(events.contains(&SessionEvent::SessionOver {
            winners: vec![pid(3)],
            standings
        }));
        assert!(events.contains(&SessionEvent::PropReleased {
            player: pid(5),
            prop: PropHandle(7)
        }));
        // Administrative end leaves routing to the caller.
        assert!(!events.iter().any(|e| matches!(e, SessionEvent::ReturnToLobby { .. })));
    }

    // =========================================================================
    // Disconnects and ending
    // =========================================================================

    #[test]
    fn test_leave_in_game_releases_prop_and_keeps_finish() {
        let mut s = live(3);
        run_course(&mut s, pid(1), 5);
        s.attach_prop(pid(2), PropHandle(1));

        let events = s.leave(pid(2));

        assert_eq!(
            events,
            vec![
                SessionEvent::Left { player: pid(2) },
                SessionEvent::PropReleased {
                    player: pid(2),
                    prop: PropHandle(1)
                },
            ]
        );
        assert_eq!(s.tracker(pid(1)).unwrap().final_position(), Some(1));
        assert_eq!(s.state(), SessionState::InGame);
    }

    #[test]
    fn test_leave_is_idempotent() {
        let mut s = live(3);
        assert!(!s.leave(pid(2)).is_empty());
        assert!(s.leave(pid(2)).is_empty());
    }

    #[test]
    fn test_last_racer_leaving_finishes_session() {
        let mut s = live(2);
        run_course(&mut s, pid(1), 5);

        s.leave(pid(2));

        assert_eq!(s.state(), SessionState::Finished);
        assert_eq!(s.winners(), &[pid(1)]);
    }

    #[test]
    fn test_emptied_lobby_finishes() {
        let mut s = session(config());
        s.join(pid(1), None).unwrap();
        let events = s.leave(pid(1));
        assert_eq!(s.state(), SessionState::Finished);
        assert!(events.contains(&SessionEvent::StateChanged {
            from: SessionState::Lobby,
            to: SessionState::Finished
        }));
    }

    #[test]
    fn test_finished_session_ignores_everything() {
        let mut s = live(2);
        s.end();
        assert!(s.end().is_empty());
        assert!(s.leave(pid(1)).is_empty());
        assert!(s.countdown_tick().is_empty());
        assert!(s.active_players().is_empty());
        assert!(s.handle_move(pid(1), &at(1.0, 1.0, 11.0), Duration::ZERO).events.is_empty());
    }

    #[test]
    fn test_time_limit_finishes_with_progress_standings() {
        let mut s = session(SessionConfig {
            time_limit: Some(Duration::from_secs(60)),
            ..config()
        });
        s.join(pid(1), None).unwrap();
        s.join(pid(2), None).unwrap();
        for _ in 0..3 {
            s.countdown_tick();
        }
        s.handle_move(pid(2), &at(1.0, 1.0, 11.0), Duration::ZERO);

        assert!(s.tick(Duration::from_secs(59)).is_empty());
        let events = s.tick(Duration::from_secs(60));

        assert_eq!(s.state(), SessionState::Finished);
        assert!(events.contains(&SessionEvent::SessionOver {
            winners: vec![],
            standings: vec![pid(2), pid(1)]
        }));
        assert!(events.contains(&SessionEvent::ReturnToLobby { player: pid(1) }));
    }

    #[test]
    fn test_attach_prop_replaces_previous() {
        let mut s = live(2);
        assert_eq!(s.attach_prop(pid(1), PropHandle(1)), None);
        assert_eq!(s.attach_prop(pid(1), PropHandle(2)), Some(PropHandle(1)));
        assert_eq!(s.attach_prop(pid(9), PropHandle(3)), None);
    }
}
