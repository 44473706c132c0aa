//! Error types for the core layer.

use crate::PlayerId;

/// Errors from encoding or decoding persisted records.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Serialization failed (turning a Rust value into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed, truncated, or of the wrong shape.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),
}

/// Errors reported by the [`World`](crate::World) collaborator.
///
/// These are transient by nature. Callers log them and carry on with the
/// rest of a batch instead of propagating.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    /// The player is not connected (e.g., they quit a moment ago).
    #[error("player {0} is offline")]
    Offline(PlayerId),

    /// The world refused the operation for some other reason.
    #[error("world rejected operation for {player}: {reason}")]
    Rejected { player: PlayerId, reason: String },
}
