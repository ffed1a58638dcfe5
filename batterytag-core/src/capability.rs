use std::fmt;
use std::future::Future;

/// Whether a presented tag can take a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagAccess {
    ReadWrite,
    ReadOnly,
    NotSupported,
}

impl fmt::Display for TagAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagAccess::ReadWrite => f.write_str("read-write"),
            TagAccess::ReadOnly => f.write_str("read-only"),
            TagAccess::NotSupported => f.write_str("not NDEF formatted or not supported"),
        }
    }
}

/// What a tag reports about itself once connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagStatus {
    pub access: TagAccess,
    /// Bytes available for an NDEF message.
    pub capacity: usize,
}

/// Access to a physical (or simulated) NFC tag.
///
/// Each method covers one hardware session: it waits for a tag to be
/// presented and resolves once. `Ok(None)` means the session ended without a
/// tag, which callers treat as a normal outcome. Implementations need not
/// support overlapping calls; [`TagSession`](crate::TagSession) guarantees
/// there is at most one in flight.
pub trait TagCapability: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Reads the raw NDEF message from the presented tag.
    fn read(&self) -> impl Future<Output = Result<Option<Vec<u8>>, Self::Error>> + Send;

    /// Queries access and capacity of the presented tag.
    fn status(&self) -> impl Future<Output = Result<Option<TagStatus>, Self::Error>> + Send;

    /// Replaces the tag's NDEF message.
    fn write(&self, message: &[u8]) -> impl Future<Output = Result<(), Self::Error>> + Send;
}
