//! Session membership: solo participants or fixed teams.

use ringmaster_core::PlayerId;

use crate::{RosterError, RosterMode, TeamSpec};

/// Result of a successful [`Roster::join`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// Newly added. `team` is set in team mode.
    Joined { team: Option<String> },
    /// Moved from one team to another in a single step.
    Switched { from: String, to: String },
    /// Already where they asked to be. Nothing changed.
    AlreadyMember { team: Option<String> },
}

/// Result of a [`Roster::leave`] that removed someone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveOutcome {
    pub team: Option<String>,
    /// The player's team has nobody left.
    pub team_emptied: bool,
}

#[derive(Debug, Clone)]
struct Team {
    spec: TeamSpec,
    members: Vec<PlayerId>,
}

/// Who is in a session, and on which team.
///
/// Members are kept in join order. A team switch either fully happens or
/// leaves everything as it was; a player is never on two teams, or on
/// none, in between.
#[derive(Debug, Clone)]
pub struct Roster {
    capacity: usize,
    min_players: usize,
    min_team_size: usize,
    /// Empty in solo mode.
    teams: Vec<Team>,
    members: Vec<PlayerId>,
}

impl Roster {
    pub fn new(mode: &RosterMode, capacity: usize, min_players: usize, min_team_size: usize) -> Self {
        let teams = match mode {
            RosterMode::Solo => Vec::new(),
            RosterMode::Teams(specs) => specs
                .iter()
                .map(|spec| Team {
                    spec: spec.clone(),
                    members: Vec::new(),
                })
                .collect(),
        };
        Self {
            capacity: mode.cap(capacity),
            min_players,
            min_team_size,
            teams,
            members: Vec::new(),
        }
    }

    pub fn is_team_mode(&self) -> bool {
        !self.teams.is_empty()
    }

    /// Adds `player`, or moves them to `team`.
    ///
    /// In team mode with no team named, the player goes to the smallest
    /// team with room (earliest declared on ties), or stays put if already
    /// on one.
    ///
    /// # Errors
    /// - [`RosterError::UnknownTeam`] for a name that doesn't exist (any
    ///   name at all in solo mode)
    /// - [`RosterError::TeamFull`] if the chosen team is at capacity
    /// - [`RosterError::NoCapacity`] if the session itself is full
    pub fn join(&mut self, player: PlayerId, team: Option<&str>) -> Result<JoinOutcome, RosterError> {
        if !self.is_team_mode() {
            if let Some(name) = team {
                return Err(RosterError::UnknownTeam(name.to_string()));
            }
            if self.contains(player) {
                return Ok(JoinOutcome::AlreadyMember { team: None });
            }
            if self.members.len() >= self.capacity {
                return Err(RosterError::NoCapacity);
            }
            self.members.push(player);
            return Ok(JoinOutcome::Joined { team: None });
        }

        let current = self.team_index(player);
        let target = match team {
            Some(name) => self
                .teams
                .iter()
                .position(|t| t.spec.name == name)
                .ok_or_else(|| RosterError::UnknownTeam(name.to_string()))?,
            None => match current {
                Some(i) => i,
                None => self.smallest_open_team().ok_or(RosterError::NoCapacity)?,
            },
        };

        if current == Some(target) {
            return Ok(JoinOutcome::AlreadyMember {
                team: Some(self.teams[target].spec.name.clone()),
            });
        }

        // Every check happens before anything moves.
        let to = &self.teams[target];
        if to.members.len() >= to.spec.capacity {
            return Err(RosterError::TeamFull(to.spec.name.clone()));
        }
        if current.is_none() && self.members.len() >= self.capacity {
            return Err(RosterError::NoCapacity);
        }

        let to_name = self.teams[target].spec.name.clone();
        match current {
            Some(from) => {
                self.teams[from].members.retain(|&p| p != player);
                self.teams[target].members.push(player);
                Ok(JoinOutcome::Switched {
                    from: self.teams[from].spec.name.clone(),
                    to: to_name,
                })
            }
            None => {
                self.teams[target].members.push(player);
                self.members.push(player);
                Ok(JoinOutcome::Joined { team: Some(to_name) })
            }
        }
    }

    /// Removes `player`. Returns `None` if they weren't a member.
    pub fn leave(&mut self, player: PlayerId) -> Option<LeaveOutcome> {
        let pos = self.members.iter().position(|&p| p == player)?;
        self.members.remove(pos);

        let Some(i) = self.team_index(player) else {
            return Some(LeaveOutcome {
                team: None,
                team_emptied: false,
            });
        };
        let team = &mut self.teams[i];
        team.members.retain(|&p| p != player);
        Some(LeaveOutcome {
            team: Some(team.spec.name.clone()),
            team_emptied: team.members.is_empty(),
        })
    }

    /// Whether enough participants are present to start.
    pub fn has_minimum(&self) -> bool {
        if self.members.len() < self.min_players {
            return false;
        }
        !self.is_team_mode()
            || self
                .teams
                .iter()
                .any(|t| t.members.len() >= self.min_team_size)
    }

    pub fn contains(&self, player: PlayerId) -> bool {
        self.members.contains(&player)
    }

    /// Members in join order.
    pub fn members(&self) -> &[PlayerId] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn min_players(&self) -> usize {
        self.min_players
    }

    /// Position of the player's team in declaration order.
    pub fn team_index(&self, player: PlayerId) -> Option<usize> {
        self.teams.iter().position(|t| t.members.contains(&player))
    }

    pub fn team_of(&self, player: PlayerId) -> Option<&str> {
        self.team_index(player).map(|i| self.teams[i].spec.name.as_str())
    }

    pub fn team(&self, name: &str) -> Option<&TeamSpec> {
        self.teams.iter().find(|t| t.spec.name == name).map(|t| &t.spec)
    }

    /// Members of a team in join order. Empty for unknown names.
    pub fn team_members(&self, name: &str) -> &[PlayerId] {
        self.teams
            .iter()
            .find(|t| t.spec.name == name)
            .map(|t| t.members.as_slice())
            .unwrap_or_default()
    }

    /// Teams with at least one member, with their members.
    pub fn active_teams(&self) -> impl Iterator<Item = (&TeamSpec, &[PlayerId])> {
        self.teams
            .iter()
            .filter(|t| !t.members.is_empty())
            .map(|t| (&t.spec, t.members.as_slice()))
    }

    fn smallest_open_team(&self) -> Option<usize> {
        self.teams
            .iter()
            .enumerate()
            .filter(|(_, t)| t.members.len() < t.spec.capacity)
            .min_by_key(|(_, t)| t.members.len())
            .map(|(i, _)| i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(id: u64) -> PlayerId {
        PlayerId(id)
    }

    fn two_teams(capacity: usize) -> Roster {
        Roster::new(
            &RosterMode::Teams(vec![
                TeamSpec::new("A", capacity, "red"),
                TeamSpec::new("B", capacity, "blue"),
            ]),
            8,
            2,
            1,
        )
    }

    // =========================================================================
    // Solo
    // =========================================================================

    #[test]
    fn test_solo_join_and_leave() {
        let mut roster = Roster::new(&RosterMode::Solo, 2, 2, 1);
        assert_eq!(roster.join(pid(1), None), Ok(JoinOutcome::Joined { team: None }));
        assert!(!roster.has_minimum());
        roster.join(pid(2), None).unwrap();
        assert!(roster.has_minimum());

        assert_eq!(roster.join(pid(3), None), Err(RosterError::NoCapacity));

        let out = roster.leave(pid(1)).unwrap();
        assert_eq!(out.team, None);
        assert_eq!(roster.members(), &[pid(2)]);
    }

    #[test]
    fn test_solo_rejoin_is_already_member() {
        let mut roster = Roster::new(&RosterMode::Solo, 4, 2, 1);
        roster.join(pid(1), None).unwrap();
        assert_eq!(
            roster.join(pid(1), None),
            Ok(JoinOutcome::AlreadyMember { team: None })
        );
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn test_solo_rejects_team_name() {
        let mut roster = Roster::new(&RosterMode::Solo, 4, 2, 1);
        assert_eq!(
            roster.join(pid(1), Some("A")),
            Err(RosterError::UnknownTeam("A".into()))
        );
        assert!(roster.is_empty());
    }

    #[test]
    fn test_leave_unknown_player_is_none() {
        let mut roster = Roster::new(&RosterMode::Solo, 4, 2, 1);
        assert_eq!(roster.leave(pid(9)), None);
    }

    // =========================================================================
    // Teams
    // =========================================================================

    #[test]
    fn test_team_join_same_team_twice_is_noop() {
        let mut roster = two_teams(4);
        roster.join(pid(1), Some("A")).unwrap();

        let again = roster.join(pid(1), Some("A")).unwrap();

        assert_eq!(again, JoinOutcome::AlreadyMember { team: Some("A".into()) });
        assert_eq!(roster.team_members("A"), &[pid(1)]);
    }

    #[test]
    fn test_team_switch_moves_player() {
        let mut roster = two_teams(4);
        roster.join(pid(1), Some("A")).unwrap();

        let out = roster.join(pid(1), Some("B")).unwrap();

        assert_eq!(
            out,
            JoinOutcome::Switched {
                from: "A".into(),
                to: "B".into()
            }
        );
        assert!(roster.team_members("A").is_empty());
        assert_eq!(roster.team_members("B"), &[pid(1)]);
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn test_team_switch_into_full_team_changes_nothing() {
        let mut roster = two_teams(1);
        roster.join(pid(1), Some("A")).unwrap();
        roster.join(pid(2), Some("B")).unwrap();

        let err = roster.join(pid(1), Some("B")).unwrap_err();

        assert_eq!(err, RosterError::TeamFull("B".into()));
        assert_eq!(roster.team_of(pid(1)), Some("A"));
        assert_eq!(roster.team_members("B"), &[pid(2)]);
    }

    #[test]
    fn test_team_auto_assign_balances() {
        let mut roster = two_teams(4);
        roster.join(pid(1), None).unwrap();
        roster.join(pid(2), None).unwrap();
        roster.join(pid(3), None).unwrap();

        assert_eq!(roster.team_members("A"), &[pid(1), pid(3)]);
        assert_eq!(roster.team_members("B"), &[pid(2)]);
    }

    #[test]
    fn test_team_auto_assign_keeps_current_team() {
        let mut roster = two_teams(4);
        roster.join(pid(1), Some("B")).unwrap();
        assert_eq!(
            roster.join(pid(1), None),
            Ok(JoinOutcome::AlreadyMember { team: Some("B".into()) })
        );
    }

    #[test]
    fn test_team_unknown_name() {
        let mut roster = two_teams(4);
        assert_eq!(
            roster.join(pid(1), Some("Z")),
            Err(RosterError::UnknownTeam("Z".into()))
        );
    }

    #[test]
    fn test_team_leave_reports_emptied_team() {
        let mut roster = two_teams(4);
        roster.join(pid(1), Some("A")).unwrap();
        roster.join(pid(2), Some("A")).unwrap();

        assert!(!roster.leave(pid(1)).unwrap().team_emptied);
        let out = roster.leave(pid(2)).unwrap();
        assert_eq!(out.team.as_deref(), Some("A"));
        assert!(out.team_emptied);
        assert_eq!(roster.active_teams().count(), 0);
    }

    #[test]
    fn test_team_min_team_size_gate() {
        let mut roster = Roster::new(
            &RosterMode::Teams(vec![
                TeamSpec::new("A", 4, "red"),
                TeamSpec::new("B", 4, "blue"),
            ]),
            8,
            2,
            2,
        );
        roster.join(pid(1), Some("A")).unwrap();
        roster.join(pid(2), Some("B")).unwrap();
        assert!(!roster.has_minimum());

        roster.join(pid(3), Some("A")).unwrap();
        assert!(roster.has_minimum());
    }

    #[test]
    fn test_team_capacity_is_team_slots() {
        let mut roster = two_teams(3);
        assert_eq!(roster.capacity(), 6);

        for i in 1..=6 {
            roster.join(pid(i), None).unwrap();
        }

        assert_eq!(roster.join(pid(7), None), Err(RosterError::NoCapacity));
        assert_eq!(roster.team_members("A").len(), 3);
        assert_eq!(roster.team_members("B").len(), 3);
    }
}
