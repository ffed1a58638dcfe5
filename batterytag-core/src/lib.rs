//! Battery tag records for FRC batteries.
//!
//! Each battery carries a small NFC tag holding its serial number, first use,
//! charge cycle count, a note, and a short history of robot and charger use.
//!
//! Core concepts:
//! - **BatteryRecord**: Everything stored on a tag, rewritten as a whole on every change
//! - **Codec**: Compact JSON in an NDEF Text record, trimmed to fit the tag's capacity
//! - **TagCapability**: Async access to a tag, one hardware session per call
//! - **TagSession**: Single-flight reads and writes with a raw-text log
//! - **TagController**: The loaded record and the actions that update it
//!
//! # Example
//!
//! ```
//! use batterytag_core::{codec, BatteryRecord, Timestamp, MAX_USAGE_ENTRIES};
//!
//! let mut record = BatteryRecord::new("254--007", Timestamp::unknown());
//! for _ in 0..20 {
//!     record.log_robot_use(Timestamp::now(), MAX_USAGE_ENTRIES);
//! }
//! record.log_charge(Timestamp::now(), MAX_USAGE_ENTRIES);
//!
//! // An NTAG213 offers 137 bytes, so older events are dropped.
//! let encoded = codec::encode(&record, 137).unwrap();
//! assert!(encoded.estimated_size <= 137);
//! assert_eq!(encoded.record.usage.newest().unwrap().sequence, 21);
//!
//! let decoded = codec::decode_ndef(&encoded.ndef_message()).unwrap();
//! assert_eq!(decoded, encoded.record);
//! ```

mod capability;
pub mod codec;
mod controller;
mod log;
mod model;
pub mod ndef;
pub mod report;
mod serial;
mod session;
mod timestamp;

pub use capability::{TagAccess, TagCapability, TagStatus};
pub use codec::{CodecError, Encoded, Truncation};
pub use controller::{ControllerError, TagController};
pub use log::{LogEntry, LogKind, LogStore, MemoryLogStore};
pub use model::{BatteryRecord, DeviceKind, MAX_USAGE_ENTRIES, NoteKind, UsageEvent, UsageHistory};
pub use serial::{BatteryCode, MAX_MANUAL_LEN, Serial, SerialError};
pub use session::{SessionError, TagSession};
pub use timestamp::{Timestamp, UNAVAILABLE};
