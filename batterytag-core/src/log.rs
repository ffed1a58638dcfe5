use std::convert::Infallible;
use std::fmt;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Direction of a logged tag operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Read,
    Write,
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogKind::Read => f.pad("read"),
            LogKind::Write => f.pad("write"),
        }
    }
}

/// Raw text read from or written to a tag, with when it happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub when: DateTime<Utc>,
    pub kind: LogKind,
    pub raw: String,
}

impl LogEntry {
    pub fn now(kind: LogKind, raw: impl Into<String>) -> Self {
        LogEntry {
            when: Utc::now(),
            kind,
            raw: raw.into(),
        }
    }
}

/// An append-only history of raw tag traffic.
///
/// Stores know nothing about the record schema; entries hold the text exactly
/// as it crossed the tag boundary. All methods take `&self` so that stores can
/// lock internally.
pub trait LogStore {
    type Error: std::error::Error + Send + Sync + 'static;

    fn append(&self, entry: &LogEntry) -> Result<(), Self::Error>;

    /// All entries, newest first.
    fn load(&self) -> Result<Vec<LogEntry>, Self::Error>;

    fn clear(&self) -> Result<(), Self::Error>;
}

/// An in-memory log store.
///
/// Useful for testing and as a reference implementation.
#[derive(Debug, Default)]
pub struct MemoryLogStore {
    entries: RwLock<Vec<LogEntry>>,
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LogStore for MemoryLogStore {
    type Error = Infallible;

    fn append(&self, entry: &LogEntry) -> Result<(), Self::Error> {
        self.entries.write().unwrap().push(entry.clone());
        Ok(())
    }

    fn load(&self) -> Result<Vec<LogEntry>, Self::Error> {
        let mut entries = self.entries.read().unwrap().clone();
        entries.reverse();
        Ok(entries)
    }

    fn clear(&self) -> Result<(), Self::Error> {
        self.entries.write().unwrap().clear();
        Ok(())
    }
}

impl<S: LogStore + ?Sized> LogStore for &S {
    type Error = S::Error;

    fn append(&self, entry: &LogEntry) -> Result<(), Self::Error> {
        (**self).append(entry)
    }

    fn load(&self) -> Result<Vec<LogEntry>, Self::Error> {
        (**self).load()
    }

    fn clear(&self) -> Result<(), Self::Error> {
        (**self).clear()
    }
}

impl<S: LogStore + ?Sized> LogStore for std::sync::Arc<S> {
    type Error = S::Error;

    fn append(&self, entry: &LogEntry) -> Result<(), Self::Error> {
        (**self).append(entry)
    }

    fn load(&self) -> Result<Vec<LogEntry>, Self::Error> {
        (**self).load()
    }

    fn clear(&self) -> Result<(), Self::Error> {
        (**self).clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_newest_first() {
        let store = MemoryLogStore::new();
        store.append(&LogEntry::now(LogKind::Read, "first")).unwrap();
        store.append(&LogEntry::now(LogKind::Write, "second")).unwrap();

        let entries = store.load().unwrap();
        let raws: Vec<&str> = entries.iter().map(|e| e.raw.as_str()).collect();
        assert_eq!(raws, vec!["second", "first"]);
        assert_eq!(entries[0].kind, LogKind::Write);
    }

    #[test]
    fn memory_store_clear() {
        let store = MemoryLogStore::new();
        store.append(&LogEntry::now(LogKind::Read, "x")).unwrap();
        store.clear().unwrap();
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn entry_serializes_lowercase_kind() {
        let entry = LogEntry::now(LogKind::Write, "{}");
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["kind"], "write");
        assert_eq!(value["raw"], "{}");
    }

    #[test]
    fn shared_reference_is_a_store() {
        let store = MemoryLogStore::new();
        let by_ref = &store;
        by_ref.append(&LogEntry::now(LogKind::Read, "r")).unwrap();
        assert_eq!(store.load().unwrap().len(), 1);
    }
}
