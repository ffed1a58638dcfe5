use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use crate::capability::{TagAccess, TagCapability};
use crate::codec::{self, CodecError, Encoded};
use crate::log::{LogEntry, LogKind, LogStore};
use crate::model::{BatteryRecord, MAX_USAGE_ENTRIES};
use crate::ndef::{self, NdefError};

/// Error type for tag sessions.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("another tag operation is in progress")]
    Busy,
    #[error("tag is {0}")]
    Unwritable(TagAccess),
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// Failure reported by the tag hardware, with its own message.
    #[error("{0}")]
    Capability(String),
}

/// Runs reads and writes against a tag capability, one at a time.
///
/// A second operation started while one is outstanding fails with
/// [`SessionError::Busy`] instead of overlapping. The busy state is held by a
/// guard inside the operation's future, so it is released on success, on
/// failure, and when the caller drops the future to cancel.
///
/// Raw text crossing the tag boundary is appended to the log store. The
/// append runs synchronously on the calling task after the tag operation
/// completes, so log stores should be quick to write. Log failures are
/// reported through `tracing` and never fail the operation.
pub struct TagSession<C, L> {
    capability: C,
    log: L,
    history_limit: usize,
    busy: Mutex<()>,
}

impl<C, L> TagSession<C, L>
where
    C: TagCapability,
    L: LogStore,
{
    pub fn new(capability: C, log: L) -> Self {
        TagSession {
            capability,
            log,
            history_limit: MAX_USAGE_ENTRIES,
            busy: Mutex::new(()),
        }
    }

    /// Overrides how many usage events are kept on write. At least one is
    /// always kept.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit.max(1);
        self
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    pub fn capability(&self) -> &C {
        &self.capability
    }

    pub fn log_store(&self) -> &L {
        &self.log
    }

    pub fn is_busy(&self) -> bool {
        self.busy.try_lock().is_err()
    }

    /// Reads and decodes the record on the presented tag.
    ///
    /// Returns `Ok(None)` when the session ended without a tag.
    #[instrument(skip(self))]
    pub async fn read(&self) -> Result<Option<BatteryRecord>, SessionError> {
        let _busy = self.busy.try_lock().map_err(|_| SessionError::Busy)?;

        let Some(message) = self.capability.read().await.map_err(capability_error)? else {
            debug!("session ended without a tag");
            return Ok(None);
        };
        // A blank tag carries no records at all.
        let text = match ndef::first_text(&message) {
            Ok(Some(text)) => text,
            Ok(None) | Err(NdefError::Empty) => return Err(CodecError::NoCompatiblePayload.into()),
            Err(e) => return Err(CodecError::from(e).into()),
        };

        self.append_log(LogKind::Read, &text);
        Ok(Some(codec::decode_text(&text)?))
    }

    /// Writes `record` to the presented tag, fitted to its capacity.
    ///
    /// The history is first capped at the session's limit, then trimmed
    /// further if the tag is too small. The returned [`Encoded`] holds the
    /// record exactly as written. Returns `Ok(None)` when the session ended
    /// without a tag.
    #[instrument(skip(self, record), fields(serial = %record.serial))]
    pub async fn write(&self, record: &BatteryRecord) -> Result<Option<Encoded>, SessionError> {
        let _busy = self.busy.try_lock().map_err(|_| SessionError::Busy)?;
        let mut capped = record.clone();

        let Some(status) = self.capability.status().await.map_err(capability_error)? else {
            debug!("session ended without a tag");
            return Ok(None);
        };
        if status.access != TagAccess::ReadWrite {
            return Err(SessionError::Unwritable(status.access));
        }

        let capped_out = capped.cap_history(self.history_limit);
        let mut encoded = codec::encode(&capped, status.capacity)?;
        encoded.dropped += capped_out;

        debug!(estimated_size = encoded.estimated_size, capacity = status.capacity, "writing text record");
        self.capability
            .write(&encoded.ndef_message())
            .await
            .map_err(capability_error)?;

        self.append_log(LogKind::Write, &encoded.text);
        Ok(Some(encoded))
    }

    fn append_log(&self, kind: LogKind, raw: &str) {
        if let Err(e) = self.log.append(&LogEntry::now(kind, raw)) {
            warn!(error = %e, %kind, "failed to append to tag log");
        }
    }
}

fn capability_error<E: std::error::Error>(e: E) -> SessionError {
    SessionError::Capability(e.to_string())
}
