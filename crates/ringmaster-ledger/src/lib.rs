//! Score ledger for Ringmaster.
//!
//! Points earned in any minigame land here and survive the whole event.
//! The ledger has exactly one mutating entry point for points,
//! [`ScoreLedger::add_score`], and writes through to its [`ScoreStore`] on
//! every change.
//!
//! # Key types
//!
//! - [`ScoreLedger`]: in-memory records plus write-through persistence
//! - [`PlayerScore`]: one participant's totals
//! - [`ScoreStore`]: where records are loaded from and saved to
//! - [`JsonFileStore`], [`MemoryStore`]: the two stores shipped here

mod error;
mod ledger;
mod score;
mod store;

use std::sync::Arc;

pub use error::LedgerError;
pub use ledger::{RankEntry, ScoreLedger};
pub use score::PlayerScore;
pub use store::{JsonFileStore, MemoryStore, ScoreStore};

/// The ledger as shared between the orchestrator and every session actor.
pub type SharedLedger = Arc<tokio::sync::Mutex<ScoreLedger>>;
