//! Persistence backends for the ledger.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ringmaster_core::{Codec, JsonCodec};

use crate::{LedgerError, PlayerScore};

/// Where score records live between restarts.
///
/// `save` receives the full record set every time; implementations should
/// replace, not append.
pub trait ScoreStore: Send + 'static {
    /// Loads every record. A missing backing file is an empty ledger, not
    /// an error.
    fn load(&self) -> Result<Vec<PlayerScore>, LedgerError>;

    /// Replaces the stored records.
    fn save(&mut self, records: &[PlayerScore]) -> Result<(), LedgerError>;
}

// ---------------------------------------------------------------------------
// JsonFileStore
// ---------------------------------------------------------------------------

/// Stores records as one file, written via a temp file and a rename so a
/// crash mid-write leaves the previous file intact.
#[derive(Debug, Clone)]
pub struct JsonFileStore<C: Codec = JsonCodec> {
    path: PathBuf,
    codec: C,
}

impl JsonFileStore<JsonCodec> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_codec(path, JsonCodec)
    }
}

impl<C: Codec> JsonFileStore<C> {
    pub fn with_codec(path: impl Into<PathBuf>, codec: C) -> Self {
        Self {
            path: path.into(),
            codec,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> LedgerError {
        LedgerError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl<C: Codec> ScoreStore for JsonFileStore<C> {
    fn load(&self) -> Result<Vec<PlayerScore>, LedgerError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_err(e)),
        };
        Ok(self.codec.decode(&bytes)?)
    }

    fn save(&mut self, records: &[PlayerScore]) -> Result<(), LedgerError> {
        let bytes = self.codec.encode(&records)?;
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| self.io_err(e))?;
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, bytes).map_err(|e| self.io_err(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_err(e))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// Keeps the last saved snapshot in memory. Nothing survives a restart.
///
/// Clones share the same snapshot, so a test can hand one clone to a ledger
/// and watch what it writes through the other.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryRecords>>,
}

#[derive(Debug, Default)]
struct MemoryRecords {
    records: Vec<PlayerScore>,
    saves: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store, as if a previous run had saved `records`.
    pub fn with_records(records: Vec<PlayerScore>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryRecords { records, saves: 0 })),
        }
    }

    /// Number of saves so far, across every clone.
    pub fn saves(&self) -> usize {
        self.lock().saves
    }

    fn lock(&self) -> MutexGuard<'_, MemoryRecords> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ScoreStore for MemoryStore {
    fn load(&self) -> Result<Vec<PlayerScore>, LedgerError> {
        Ok(self.lock().records.clone())
    }

    fn save(&mut self, records: &[PlayerScore]) -> Result<(), LedgerError> {
        let mut inner = self.lock();
        inner.records = records.to_vec();
        inner.saves += 1;
        Ok(())
    }
}
