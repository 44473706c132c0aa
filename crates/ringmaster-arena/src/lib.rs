//! Spatial progress engine for Ringmaster.
//!
//! # Key types
//!
//! - [`SpatialRegion`]: axis-aligned box with a closed containment test
//! - [`Arena`]: spawns, ordered checkpoints, finish line, bounds, hazards
//! - [`ProgressTracker`]: one participant's ordered-checkpoint progress
//! - [`ProgressStep`]: what a single movement meant for that progress

mod arena;
mod error;
mod progress;
mod region;

pub use arena::Arena;
pub use error::ArenaError;
pub use progress::{FinishRecord, ProgressStep, ProgressTracker};
pub use region::SpatialRegion;
