use crate::capability::TagCapability;
use crate::codec::Encoded;
use crate::log::LogStore;
use crate::model::{BatteryRecord, NoteKind};
use crate::serial::Serial;
use crate::session::{SessionError, TagSession};
use crate::timestamp::Timestamp;

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("no tag loaded; scan a battery tag first")]
    NoRecord,
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// The record currently on screen and the actions that change it.
///
/// Every action builds the next record from a copy, writes it through the
/// session, and only then replaces the current record with what was actually
/// written. A failed or abandoned write leaves the current record as it was.
pub struct TagController<C, L> {
    session: TagSession<C, L>,
    current: Option<BatteryRecord>,
}

impl<C, L> TagController<C, L>
where
    C: TagCapability,
    L: LogStore,
{
    pub fn new(session: TagSession<C, L>) -> Self {
        TagController {
            session,
            current: None,
        }
    }

    pub fn session(&self) -> &TagSession<C, L> {
        &self.session
    }

    pub fn current(&self) -> Option<&BatteryRecord> {
        self.current.as_ref()
    }

    /// Shows a record without touching a tag, e.g. one picked from the log.
    pub fn load(&mut self, record: BatteryRecord) {
        self.current = Some(record);
    }

    /// Reads the presented tag. The current record is replaced only when a
    /// record was actually decoded.
    pub async fn scan(&mut self) -> Result<Option<&BatteryRecord>, ControllerError> {
        match self.session.read().await? {
            Some(record) => {
                self.current = Some(record);
                Ok(self.current.as_ref())
            }
            None => Ok(None),
        }
    }

    /// Writes a fresh record to the presented tag.
    pub async fn init_new(
        &mut self,
        serial: &Serial,
        first_use: Timestamp,
    ) -> Result<Option<Encoded>, ControllerError> {
        self.commit(BatteryRecord::new(serial.as_str(), first_use)).await
    }

    /// Records a robot run on the loaded battery.
    pub async fn log_robot_use(&mut self, at: Timestamp) -> Result<Option<Encoded>, ControllerError> {
        let mut next = self.staged()?;
        next.log_robot_use(at, self.session.history_limit());
        self.commit(next).await
    }

    /// Records a charge on the loaded battery.
    pub async fn log_charge(&mut self, at: Timestamp) -> Result<Option<Encoded>, ControllerError> {
        let mut next = self.staged()?;
        next.log_charge(at, self.session.history_limit());
        self.commit(next).await
    }

    pub async fn set_note(&mut self, note: NoteKind) -> Result<Option<Encoded>, ControllerError> {
        let mut next = self.staged()?;
        next.set_note(note);
        self.commit(next).await
    }

    /// Writes an arbitrary record, e.g. one imported from a file.
    pub async fn write_record(&mut self, record: BatteryRecord) -> Result<Option<Encoded>, ControllerError> {
        self.commit(record).await
    }

    fn staged(&self) -> Result<BatteryRecord, ControllerError> {
        self.current.clone().ok_or(ControllerError::NoRecord)
    }

    async fn commit(&mut self, next: BatteryRecord) -> Result<Option<Encoded>, ControllerError> {
        let written = self.session.write(&next).await?;
        if let Some(encoded) = &written {
            self.current = Some(encoded.record.clone());
        }
        Ok(written)
    }
}
