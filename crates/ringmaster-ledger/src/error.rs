//! Error types for the ledger layer.

use std::path::PathBuf;

use ringmaster_core::CodecError;

/// Errors from loading or saving score records.
///
/// A failed save never rolls back the in-memory change; the ledger logs it
/// and keeps going.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Reading or writing the score file failed.
    #[error("score file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The score file's contents couldn't be encoded or decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),
}
