//! Error types for arena configuration.

/// Reasons an arena can't host a session.
///
/// All of these are configuration errors: they are reported to whoever set
/// the arena up and nothing is mutated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArenaError {
    /// No spawn points configured.
    #[error("arena {0} has no spawn points")]
    NoSpawns(String),

    /// No finish region configured.
    #[error("arena {0} has no finish region")]
    NoFinish(String),

    /// Player limits are unusable (zero maximum, or minimum above maximum).
    #[error("arena {name} has invalid player limits {min}..={max}")]
    InvalidLimits { name: String, min: usize, max: usize },
}
