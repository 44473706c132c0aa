//! Shared vocabulary for Ringmaster.
//!
//! - **Types** ([`PlayerId`], [`SessionId`], [`Location`], [`Notice`], ...):
//!   the identifiers and coordinates every other layer speaks in.
//! - **World** ([`World`] trait, [`MemoryWorld`]): the narrow contract to
//!   whatever actually hosts the players: teleporting, presence, permissions,
//!   and player-facing notices.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how persisted records are
//!   turned into bytes and back.
//!
//! ```text
//! Orchestrator → Session → Arena → Core (this crate)
//! ```

mod codec;
mod error;
mod types;
mod world;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::{CodecError, WorldError};
pub use types::{Location, Notice, PlayerId, Point, PropHandle, SessionId, WorldId};
pub use world::{MemoryWorld, World};
