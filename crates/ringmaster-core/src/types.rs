//! Identifiers, coordinates, and player-facing notices.
//!
//! Everything here is plain data: cheap to clone, serializable, and free of
//! behaviour beyond formatting and arithmetic helpers.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a participant.
///
/// Newtype over `u64` so a `SessionId` can never be passed where a player is
/// expected. Serialized as the bare number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// A unique identifier for one running game session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}", self.0)
    }
}

/// Handle to a mobile prop owned by the world (a boat, a minecart, ...).
///
/// The core never inspects it; it only hands it back to the world when the
/// participant holding it is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropHandle(pub u64);

/// Name of a world/dimension that coordinates refer to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorldId(pub String);

impl WorldId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Coordinates
// ---------------------------------------------------------------------------

/// A point in block space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Per-axis minimum of two points.
    pub fn min(self, other: Self) -> Self {
        Self::new(self.x.min(other.x), self.y.min(other.y), self.z.min(other.z))
    }

    /// Per-axis maximum of two points.
    pub fn max(self, other: Self) -> Self {
        Self::new(self.x.max(other.x), self.y.max(other.y), self.z.max(other.z))
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1}, {:.1})", self.x, self.y, self.z)
    }
}

/// A point qualified by the world it lives in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub world: WorldId,
    pub point: Point,
}

impl Location {
    pub fn new(world: impl Into<String>, x: f64, y: f64, z: f64) -> Self {
        Self {
            world: WorldId::new(world),
            point: Point::new(x, y, z),
        }
    }

    pub fn at(world: WorldId, point: Point) -> Self {
        Self { world, point }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.point, self.world)
    }
}

// ---------------------------------------------------------------------------
// Notice
// ---------------------------------------------------------------------------

/// Something a participant should be told about.
///
/// The core decides *what* happened; how it is rendered (chat line, title,
/// scoreboard) belongs to the [`World`](crate::World) implementation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notice {
    /// A tournament round is about to begin for this player.
    MinigameStarting { minigame: String },
    /// The round the player was in has been ended by an operator.
    MinigameEnded { minigame: String },
    /// The player was placed on a team.
    TeamJoined { team: String },
    /// The player re-selected the team they are already on.
    AlreadyOnTeam { team: String },
    /// Seconds left before the session starts.
    CountdownTick { remaining: u32 },
    /// The roster fell below the minimum; the countdown was called off.
    CountdownCancelled,
    /// Movement is unlocked; the session is live.
    GameStarted,
    /// The player crossed checkpoint `index` (0-based) of `total`.
    CheckpointReached { index: usize, total: usize },
    /// The player crossed the finish line in position `rank`.
    Finished { rank: u32 },
    /// The player is out.
    Eliminated,
    /// The session ended.
    SessionOver { winners: Vec<PlayerId> },
    /// The player was sent back to the lobby.
    ReturnedToLobby,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_id_display() {
        assert_eq!(PlayerId(42).to_string(), "P-42");
        assert_eq!(SessionId(7).to_string(), "S-7");
    }

    #[test]
    fn test_point_min_max_per_axis() {
        let a = Point::new(1.0, 10.0, -3.0);
        let b = Point::new(4.0, 2.0, 5.0);
        assert_eq!(a.min(b), Point::new(1.0, 2.0, -3.0));
        assert_eq!(a.max(b), Point::new(4.0, 10.0, 5.0));
    }

    #[test]
    fn test_player_id_serializes_transparently() {
        let json = serde_json::to_string(&PlayerId(9)).unwrap();
        assert_eq!(json, "9");
    }

    #[test]
    fn test_location_display() {
        let loc = Location::new("lobby", 0.0, 64.0, 0.5);
        assert_eq!(loc.to_string(), "(0.0, 64.0, 0.5)@lobby");
    }
}
