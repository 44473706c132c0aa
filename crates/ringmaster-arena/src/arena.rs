//! Arena definitions and the progress-check flow.

use ringmaster_core::{Location, PlayerId, Point, WorldId};
use serde::{Deserialize, Serialize};

use crate::{ArenaError, ProgressStep, ProgressTracker, SpatialRegion};

/// A named, reusable spatial layout for one minigame session.
///
/// Read-only while a session uses it. Checkpoint order is traversal order:
/// a participant only ever gets credit for the *next* checkpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Arena {
    pub name: String,
    pub world: WorldId,
    /// One per participant or per team; reused round-robin when short.
    pub spawns: Vec<Point>,
    pub checkpoints: Vec<SpatialRegion>,
    pub finish: Option<SpatialRegion>,
    /// Participants inside must stay inside while the game is live.
    pub protection: Option<SpatialRegion>,
    /// Entering any of these while live eliminates the participant.
    #[serde(default)]
    pub hazards: Vec<SpatialRegion>,
    pub min_players: usize,
    pub max_players: usize,
}

impl Arena {
    /// An empty arena with 2–8 player limits. Fill it in with the `with_*`
    /// builders.
    pub fn new(name: impl Into<String>, world: WorldId) -> Self {
        Self {
            name: name.into(),
            world,
            spawns: Vec::new(),
            checkpoints: Vec::new(),
            finish: None,
            protection: None,
            hazards: Vec::new(),
            min_players: 2,
            max_players: 8,
        }
    }

    pub fn with_spawn(mut self, spawn: Point) -> Self {
        self.spawns.push(spawn);
        self
    }

    pub fn with_checkpoint(mut self, region: SpatialRegion) -> Self {
        self.checkpoints.push(region);
        self
    }

    pub fn with_finish(mut self, region: SpatialRegion) -> Self {
        self.finish = Some(region);
        self
    }

    pub fn with_protection(mut self, region: SpatialRegion) -> Self {
        self.protection = Some(region);
        self
    }

    pub fn with_hazard(mut self, region: SpatialRegion) -> Self {
        self.hazards.push(region);
        self
    }

    pub fn with_player_limits(mut self, min: usize, max: usize) -> Self {
        self.min_players = min;
        self.max_players = max;
        self
    }

    /// Spawns present and finish set. Checkpoints may be empty.
    pub fn is_complete(&self) -> bool {
        !self.spawns.is_empty() && self.finish.is_some()
    }

    /// Like [`is_complete`](Self::is_complete) but says what's missing.
    pub fn validate(&self) -> Result<(), ArenaError> {
        if self.spawns.is_empty() {
            return Err(ArenaError::NoSpawns(self.name.clone()));
        }
        if self.finish.is_none() {
            return Err(ArenaError::NoFinish(self.name.clone()));
        }
        if self.max_players == 0 || self.min_players > self.max_players {
            return Err(ArenaError::InvalidLimits {
                name: self.name.clone(),
                min: self.min_players,
                max: self.max_players,
            });
        }
        Ok(())
    }

    /// The spawn used by slot `slot`, wrapping round-robin.
    pub fn spawn_for(&self, slot: usize) -> Option<Location> {
        if self.spawns.is_empty() {
            return None;
        }
        let point = self.spawns[slot % self.spawns.len()];
        Some(Location::at(self.world.clone(), point))
    }

    /// Assigns spawns to players in order, round-robin. Each spawn ends up
    /// used `floor(n/s)` or `ceil(n/s)` times.
    pub fn distribute(&self, players: &[PlayerId]) -> Vec<(PlayerId, Location)> {
        players
            .iter()
            .enumerate()
            .filter_map(|(slot, p)| self.spawn_for(slot).map(|loc| (*p, loc)))
            .collect()
    }

    /// Whether `at` is inside the protection region (always true without one).
    pub fn within_bounds(&self, at: &Location) -> bool {
        self.protection
            .as_ref()
            .is_none_or(|region| region.contains_location(at))
    }

    pub fn in_hazard(&self, at: &Location) -> bool {
        self.hazards.iter().any(|h| h.contains_location(at))
    }

    /// Applies one movement to a participant's progress.
    ///
    /// Only the next expected checkpoint is tested, so crossing checkpoint 2
    /// before checkpoint 1 counts for nothing. The finish region only
    /// matters once every checkpoint is done. Finishing itself is recorded
    /// by the caller, which owns rank assignment.
    pub fn check_progress(&self, tracker: &mut ProgressTracker, at: &Location) -> ProgressStep {
        if tracker.is_finished() {
            return ProgressStep::AlreadyFinished;
        }

        let total = self.checkpoints.len();
        if !tracker.has_completed_all(total) {
            let index = tracker.next_checkpoint();
            if self.checkpoints[index].contains_location(at) && tracker.advance(total) {
                return ProgressStep::Checkpoint { index, total };
            }
            return ProgressStep::Nothing;
        }

        match &self.finish {
            Some(finish) if finish.contains_location(at) => ProgressStep::ReachedFinish,
            _ => ProgressStep::Nothing,
        }
    }
}
