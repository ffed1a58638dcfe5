use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::timestamp::Timestamp;

/// Maximum number of usage events kept on a tag.
pub const MAX_USAGE_ENTRIES: usize = 14;

/// The kind of device a battery was attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum DeviceKind {
    Robot = 1,
    Charger = 2,
}

impl DeviceKind {
    pub fn label(self) -> &'static str {
        match self {
            DeviceKind::Robot => "Robot",
            DeviceKind::Charger => "Charger",
        }
    }
}

impl TryFrom<u8> for DeviceKind {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(DeviceKind::Robot),
            2 => Ok(DeviceKind::Charger),
            other => Err(format!("unknown device kind {other}")),
        }
    }
}

impl From<DeviceKind> for u8 {
    fn from(kind: DeviceKind) -> Self {
        kind as u8
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// Classification note attached to a battery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum NoteKind {
    #[default]
    Normal = 0,
    Practice = 1,
    Scrap = 2,
    Other = 3,
}

impl NoteKind {
    pub const ALL: [NoteKind; 4] = [
        NoteKind::Normal,
        NoteKind::Practice,
        NoteKind::Scrap,
        NoteKind::Other,
    ];

    pub fn label(self) -> &'static str {
        match self {
            NoteKind::Normal => "Normal",
            NoteKind::Practice => "Practice",
            NoteKind::Scrap => "Scrap",
            NoteKind::Other => "Other",
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for NoteKind {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        NoteKind::ALL
            .into_iter()
            .find(|kind| kind.code() == code)
            .ok_or_else(|| format!("unknown note kind {code}"))
    }
}

impl From<NoteKind> for u8 {
    fn from(kind: NoteKind) -> Self {
        kind.code()
    }
}

impl FromStr for NoteKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NoteKind::ALL
            .into_iter()
            .find(|kind| kind.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown note kind: {s}"))
    }
}

impl fmt::Display for NoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// One robot run or charge recorded on the tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageEvent {
    #[serde(rename = "i", alias = "id")]
    pub sequence: u32,
    #[serde(rename = "t", default)]
    pub timestamp: Timestamp,
    #[serde(rename = "d")]
    pub device: DeviceKind,
    /// Kilojoules.
    #[serde(rename = "e", default)]
    pub energy: u32,
    #[serde(rename = "v", default)]
    pub voltage: i64,
}

/// Usage events ordered oldest first by sequence number.
///
/// The order is restored whenever a history is built or deserialized, so the
/// front is always the oldest event regardless of how the tag stored them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct UsageHistory(Vec<UsageEvent>);

impl UsageHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, UsageEvent> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[UsageEvent] {
        &self.0
    }

    pub fn newest(&self) -> Option<&UsageEvent> {
        self.0.last()
    }

    /// Highest sequence number present, or 0 for an empty history.
    pub fn max_sequence(&self) -> u32 {
        self.newest().map(|event| event.sequence).unwrap_or(0)
    }

    /// Newest first, the order used for display.
    pub fn newest_first(&self) -> impl Iterator<Item = &UsageEvent> {
        self.0.iter().rev()
    }

    /// Inserts an event, keeping sequence order.
    pub fn push(&mut self, event: UsageEvent) {
        let at = self.0.partition_point(|e| e.sequence <= event.sequence);
        self.0.insert(at, event);
    }

    /// Drops up to `count` of the oldest events, returning how many went.
    pub fn drop_oldest(&mut self, count: usize) -> usize {
        let count = count.min(self.0.len());
        self.0.drain(..count);
        count
    }

    /// Keeps only the newest `limit` events.
    pub fn retain_newest(&mut self, limit: usize) -> usize {
        self.drop_oldest(self.0.len().saturating_sub(limit))
    }

    pub fn count(&self, device: DeviceKind) -> usize {
        self.0.iter().filter(|e| e.device == device).count()
    }
}

impl From<Vec<UsageEvent>> for UsageHistory {
    fn from(mut events: Vec<UsageEvent>) -> Self {
        events.sort_by_key(|e| e.sequence);
        UsageHistory(events)
    }
}

impl FromIterator<UsageEvent> for UsageHistory {
    fn from_iter<I: IntoIterator<Item = UsageEvent>>(iter: I) -> Self {
        iter.into_iter().collect::<Vec<_>>().into()
    }
}

impl<'de> Deserialize<'de> for UsageHistory {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Vec::<UsageEvent>::deserialize(deserializer).map(Into::into)
    }
}

impl<'a> IntoIterator for &'a UsageHistory {
    type Item = &'a UsageEvent;
    type IntoIter = std::slice::Iter<'a, UsageEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Everything stored on a battery's tag.
///
/// The tag is always rewritten as a whole; there are no partial updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatteryRecord {
    #[serde(rename = "sn")]
    pub serial: String,
    #[serde(rename = "fu", default)]
    pub first_use: Timestamp,
    #[serde(rename = "cc", alias = "cycle", default)]
    pub cycle_count: u32,
    #[serde(rename = "n", default)]
    pub note: NoteKind,
    #[serde(rename = "u", alias = "usage", default)]
    pub usage: UsageHistory,
}

impl BatteryRecord {
    /// A fresh record for a newly initialized tag.
    pub fn new(serial: impl Into<String>, first_use: Timestamp) -> Self {
        BatteryRecord {
            serial: serial.into(),
            first_use,
            cycle_count: 0,
            note: NoteKind::Normal,
            usage: UsageHistory::new(),
        }
    }

    pub fn next_sequence(&self) -> u32 {
        self.usage.max_sequence().saturating_add(1)
    }

    /// Appends a usage event and caps the history at `limit` entries. The
    /// new event is always kept, even with a limit of zero.
    pub fn log_usage(&mut self, device: DeviceKind, at: Timestamp, limit: usize) -> UsageEvent {
        let event = UsageEvent {
            sequence: self.next_sequence(),
            timestamp: at,
            device,
            energy: 0,
            voltage: 0,
        };
        self.usage.push(event.clone());
        self.usage.retain_newest(limit.max(1));
        event
    }

    pub fn log_robot_use(&mut self, at: Timestamp, limit: usize) -> UsageEvent {
        self.log_usage(DeviceKind::Robot, at, limit)
    }

    /// Records a completed charge; the cycle count goes up by exactly one.
    pub fn log_charge(&mut self, at: Timestamp, limit: usize) -> UsageEvent {
        self.cycle_count = self.cycle_count.saturating_add(1);
        self.log_usage(DeviceKind::Charger, at, limit)
    }

    pub fn last_event_is_charge(&self) -> bool {
        self.usage
            .newest()
            .is_some_and(|e| e.device == DeviceKind::Charger)
    }

    pub fn set_note(&mut self, note: NoteKind) {
        self.note = note;
    }

    /// Keeps the newest `limit` events; returns how many were dropped.
    pub fn cap_history(&mut self, limit: usize) -> usize {
        self.usage.retain_newest(limit)
    }

    pub fn robot_events(&self) -> usize {
        self.usage.count(DeviceKind::Robot)
    }

    pub fn charger_events(&self) -> usize {
        self.usage.count(DeviceKind::Charger)
    }
}
