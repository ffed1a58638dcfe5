//! Fjall-backed tag log for battery tag tools.

use std::path::Path;
use std::sync::{Mutex, PoisonError};

use batterytag_core::{LogEntry, LogStore};
use fjall::{Database, Keyspace, KeyspaceCreateOptions};
use thiserror::Error;
use tracing::debug;

pub const ENTRIES_KEYSPACE: &str = "log";
pub const META_KEYSPACE: &str = "meta";

const HEAD_KEY: &[u8] = b"head";
const NEXT_KEY: &[u8] = b"next";

#[derive(Debug, Error)]
pub enum FjallLogError {
    #[error("Fjall error: {0}")]
    Fjall(#[from] fjall::Error),
    #[error("corrupt log entry: {0}")]
    Json(#[from] serde_json::Error),
    #[error("corrupt log counter {0:?}")]
    Counter(&'static str),
}

/// A persistent, append-only tag log backed by Fjall.
///
/// Entries are keyed by a big-endian sequence number so they sort in append
/// order. The `meta` keyspace tracks the first live index (`head`) and the
/// next index to assign (`next`); clearing moves `head` up to `next`.
pub struct FjallLogStore {
    entries: Keyspace,
    meta: Keyspace,
    append_lock: Mutex<()>,
    _database: Database, // Keep keyspaces alive
}

impl FjallLogStore {
    /// Opens the log at the given path, creating it if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FjallLogError> {
        let path = path.as_ref();
        let database = Database::builder(path).open()?;
        let entries = database.keyspace(ENTRIES_KEYSPACE, || KeyspaceCreateOptions::default())?;
        let meta = database.keyspace(META_KEYSPACE, || KeyspaceCreateOptions::default())?;
        debug!(path = %path.display(), "opened tag log");
        Ok(Self {
            entries,
            meta,
            append_lock: Mutex::new(()),
            _database: database,
        })
    }

    /// Number of live entries.
    pub fn len(&self) -> Result<u64, FjallLogError> {
        Ok(self.counter(NEXT_KEY)? - self.counter(HEAD_KEY)?)
    }

    pub fn is_empty(&self) -> Result<bool, FjallLogError> {
        Ok(self.len()? == 0)
    }

    fn counter(&self, key: &'static [u8]) -> Result<u64, FjallLogError> {
        let Some(value) = self.meta.get(key.to_vec())? else {
            return Ok(0);
        };
        let bytes: [u8; 8] = value
            .as_ref()
            .try_into()
            .map_err(|_| FjallLogError::Counter(counter_name(key)))?;
        Ok(u64::from_be_bytes(bytes))
    }

    fn set_counter(&self, key: &'static [u8], value: u64) -> Result<(), FjallLogError> {
        self.meta.insert(key.to_vec(), &value.to_be_bytes()[..])?;
        Ok(())
    }
}

impl LogStore for FjallLogStore {
    type Error = FjallLogError;

    fn append(&self, entry: &LogEntry) -> Result<(), Self::Error> {
        let _guard = self.append_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let index = self.counter(NEXT_KEY)?;
        self.entries
            .insert(index.to_be_bytes().to_vec(), serde_json::to_vec(entry)?)?;
        self.set_counter(NEXT_KEY, index + 1)
    }

    fn load(&self) -> Result<Vec<LogEntry>, Self::Error> {
        let head = self.counter(HEAD_KEY)?;
        let next = self.counter(NEXT_KEY)?;
        let mut loaded: Vec<LogEntry> = Vec::with_capacity((next - head) as usize);
        for index in (head..next).rev() {
            if let Some(value) = self.entries.get(index.to_be_bytes().to_vec())? {
                loaded.push(serde_json::from_slice(&value)?);
            }
        }
        Ok(loaded)
    }

    fn clear(&self) -> Result<(), Self::Error> {
        let _guard = self.append_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let head = self.counter(HEAD_KEY)?;
        let next = self.counter(NEXT_KEY)?;
        for index in head..next {
            self.entries.remove(index.to_be_bytes().to_vec())?;
        }
        debug!(cleared = next - head, "cleared tag log");
        self.set_counter(HEAD_KEY, next)
    }
}

fn counter_name(key: &[u8]) -> &'static str {
    if key == HEAD_KEY { "head" } else { "next" }
}
