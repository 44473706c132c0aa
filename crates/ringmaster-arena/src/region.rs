//! Axis-aligned bounding volumes.

use ringmaster_core::{Location, Point, WorldId};
use serde::{Deserialize, Serialize};

/// An axis-aligned box in one world.
///
/// Corners are normalized on construction so `min <= max` holds on every
/// axis, whichever order the selection tool reported them in. Immutable
/// afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Corners")]
pub struct SpatialRegion {
    world: WorldId,
    min: Point,
    max: Point,
}

/// Unvalidated on-disk shape; funnels deserialization through `new`.
#[derive(Deserialize)]
struct Corners {
    world: WorldId,
    min: Point,
    max: Point,
}

impl From<Corners> for SpatialRegion {
    fn from(c: Corners) -> Self {
        Self::new(c.world, c.min, c.max)
    }
}

impl SpatialRegion {
    /// Builds a region from any two opposite corners.
    pub fn new(world: WorldId, a: Point, b: Point) -> Self {
        Self {
            world,
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn world(&self) -> &WorldId {
        &self.world
    }

    pub fn min(&self) -> Point {
        self.min
    }

    pub fn max(&self) -> Point {
        self.max
    }

    /// Closed-interval containment on every axis. Ignores the world.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    /// Containment that also requires the location to be in this world.
    pub fn contains_location(&self, loc: &Location) -> bool {
        loc.world == self.world && self.contains(loc.point)
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
            (self.min.z + self.max.z) / 2.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(a: (f64, f64, f64), b: (f64, f64, f64)) -> SpatialRegion {
        SpatialRegion::new(
            WorldId::new("w"),
            Point::new(a.0, a.1, a.2),
            Point::new(b.0, b.1, b.2),
        )
    }

    #[test]
    fn test_new_normalizes_swapped_corners() {
        let r = region((10.0, 5.0, -2.0), (0.0, 8.0, -9.0));
        assert_eq!(r.min(), Point::new(0.0, 5.0, -9.0));
        assert_eq!(r.max(), Point::new(10.0, 8.0, -2.0));
    }

    #[test]
    fn test_contains_is_closed_on_every_face() {
        let r = region((0.0, 0.0, 0.0), (10.0, 10.0, 10.0));
        assert!(r.contains(Point::new(0.0, 0.0, 0.0)));
        assert!(r.contains(Point::new(10.0, 10.0, 10.0)));
        assert!(r.contains(Point::new(5.0, 10.0, 0.0)));
        assert!(!r.contains(Point::new(10.01, 5.0, 5.0)));
        assert!(!r.contains(Point::new(5.0, -0.01, 5.0)));
    }

    #[test]
    fn test_contains_location_requires_same_world() {
        let r = region((0.0, 0.0, 0.0), (10.0, 10.0, 10.0));
        assert!(r.contains_location(&Location::new("w", 1.0, 1.0, 1.0)));
        assert!(!r.contains_location(&Location::new("nether", 1.0, 1.0, 1.0)));
    }

    #[test]
    fn test_center_is_midpoint() {
        let r = region((0.0, 60.0, -4.0), (10.0, 70.0, 4.0));
        assert_eq!(r.center(), Point::new(5.0, 65.0, 0.0));
    }

    #[test]
    fn test_deserialize_normalizes_corners() {
        let json = r#"{"world":"w","min":{"x":5,"y":5,"z":5},"max":{"x":0,"y":0,"z":0}}"#;
        let r: SpatialRegion = serde_json::from_str(json).unwrap();
        assert_eq!(r.min(), Point::new(0.0, 0.0, 0.0));
        assert_eq!(r.max(), Point::new(5.0, 5.0, 5.0));
    }
}
