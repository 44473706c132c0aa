//! Per-participant score record.

use std::collections::BTreeMap;

use ringmaster_core::PlayerId;
use serde::{Deserialize, Serialize};

/// One participant's standing across the whole event.
///
/// Fields are read-only from outside the crate; all changes go through
/// [`ScoreLedger`](crate::ScoreLedger).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerScore {
    player: PlayerId,
    display_name: String,
    total_points: i64,
    #[serde(default)]
    minigame_points: BTreeMap<String, i64>,
    #[serde(default)]
    games_played: u32,
    #[serde(default)]
    games_won: u32,
}

impl PlayerScore {
    pub(crate) fn new(player: PlayerId) -> Self {
        Self {
            player,
            display_name: player.to_string(),
            total_points: 0,
            minigame_points: BTreeMap::new(),
            games_played: 0,
            games_won: 0,
        }
    }

    pub(crate) fn apply(&mut self, minigame: &str, delta: i64) {
        self.total_points += delta;
        *self.minigame_points.entry(minigame.to_string()).or_insert(0) += delta;
    }

    pub(crate) fn bump_played(&mut self) {
        self.games_played += 1;
    }

    pub(crate) fn bump_won(&mut self) {
        self.games_won += 1;
    }

    pub(crate) fn rename(&mut self, name: String) {
        self.display_name = name;
    }

    pub fn player(&self) -> PlayerId {
        self.player
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn total_points(&self) -> i64 {
        self.total_points
    }

    /// Points earned in one minigame, or `None` if never scored there.
    pub fn minigame_points(&self, minigame: &str) -> Option<i64> {
        self.minigame_points.get(minigame).copied()
    }

    pub fn minigames(&self) -> impl Iterator<Item = (&str, i64)> {
        self.minigame_points.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn games_played(&self) -> u32 {
        self.games_played
    }

    pub fn games_won(&self) -> u32 {
        self.games_won
    }
}
