//! Capacity-fitting encoder and tolerant decoder for battery records.
//!
//! Records travel as compact JSON inside a single NDEF Text record. Tags are
//! small, so [`encode`] discards the oldest usage events until the estimated
//! message size fits the capacity the tag reports.

use serde_json::Value;
use tracing::{debug, instrument};

use crate::model::BatteryRecord;
use crate::ndef::{self, NdefError};

/// Status byte plus the two-letter language code.
pub const LANGUAGE_OVERHEAD: usize = 3;
/// Conservative allowance for the record header.
pub const HEADER_OVERHEAD: usize = 8;

/// Error type for codec operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("data too large for this tag (capacity {capacity} bytes, at least {required} needed)")]
    TooLarge { capacity: usize, required: usize },
    #[error("failed to serialize record: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("text does not match the battery record schema: {0}")]
    SchemaMismatch(#[source] serde_json::Error),
    #[error("no compatible text record found")]
    NoCompatiblePayload,
    #[error("malformed NDEF message: {0}")]
    Ndef(#[from] NdefError),
}

/// How many of the oldest events to discard per retry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Truncation {
    /// Exactly one event per retry.
    #[default]
    OneAtATime,
    /// A sixth of the remaining events per retry, at least one.
    OneSixth,
}

impl Truncation {
    fn step(self, remaining: usize) -> usize {
        match self {
            Truncation::OneAtATime => 1,
            Truncation::OneSixth => (remaining / 6).max(1),
        }
    }
}

/// A record that fits its target capacity, with its wire text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    /// The record as written, i.e. after truncation.
    pub record: BatteryRecord,
    /// Compact JSON text.
    pub text: String,
    /// Upper bound on the NDEF message size, see [`estimate_size`].
    pub estimated_size: usize,
    /// Number of usage events discarded from the input record.
    pub dropped: usize,
}

impl Encoded {
    /// The NDEF message to hand to the tag.
    pub fn ndef_message(&self) -> Vec<u8> {
        ndef::text_message(&self.text)
    }
}

/// Estimated NDEF message size for a text payload.
///
/// Deliberately over-counts the framing; the real message is never larger.
pub fn estimate_size(text: &str) -> usize {
    text.len() + LANGUAGE_OVERHEAD + HEADER_OVERHEAD
}

pub fn to_compact_json(record: &BatteryRecord) -> Result<String, CodecError> {
    serde_json::to_string(record).map_err(CodecError::Serialize)
}

pub fn to_pretty_json(record: &BatteryRecord) -> Result<String, CodecError> {
    serde_json::to_string_pretty(record).map_err(CodecError::Serialize)
}

/// Encodes `record` so that its estimated size is at most `capacity`,
/// dropping the oldest usage events one at a time.
pub fn encode(record: &BatteryRecord, capacity: usize) -> Result<Encoded, CodecError> {
    encode_with(record, capacity, Truncation::OneAtATime)
}

/// [`encode`] with an explicit truncation granularity.
///
/// Fails with [`CodecError::TooLarge`] when even the empty-history form
/// exceeds `capacity`.
#[instrument(skip(record), fields(serial = %record.serial))]
pub fn encode_with(
    record: &BatteryRecord,
    capacity: usize,
    truncation: Truncation,
) -> Result<Encoded, CodecError> {
    let mut work = record.clone();
    let mut dropped = 0;

    loop {
        let text = to_compact_json(&work)?;
        let estimated_size = estimate_size(&text);
        if estimated_size <= capacity {
            if dropped > 0 {
                debug!(dropped, estimated_size, "trimmed usage history to fit");
            }
            return Ok(Encoded {
                record: work,
                text,
                estimated_size,
                dropped,
            });
        }
        if work.usage.is_empty() {
            return Err(CodecError::TooLarge {
                capacity,
                required: estimated_size,
            });
        }
        dropped += work.usage.drop_oldest(truncation.step(work.usage.len()));
    }
}

/// Decodes record text read from a tag.
///
/// Older writers stored voltages as floats; if the strict decode fails and
/// such values are present they are rounded to the nearest integer (halves
/// away from zero) and the decode is retried once.
pub fn decode_text(text: &str) -> Result<BatteryRecord, CodecError> {
    let strict = match serde_json::from_str(text) {
        Ok(record) => return Ok(record),
        Err(e) => e,
    };

    match coerce_float_voltages(text) {
        Some(coerced) => {
            debug!("retrying decode with integer voltages");
            serde_json::from_str(&coerced).map_err(CodecError::SchemaMismatch)
        }
        None => Err(CodecError::SchemaMismatch(strict)),
    }
}

/// Decodes a raw NDEF message, using its first text record.
pub fn decode_ndef(message: &[u8]) -> Result<BatteryRecord, CodecError> {
    let text = ndef::first_text(message)?.ok_or(CodecError::NoCompatiblePayload)?;
    decode_text(&text)
}

/// Rewrites fractional `v` values in the usage array as integers.
/// Returns `None` when there was nothing to rewrite.
fn coerce_float_voltages(text: &str) -> Option<String> {
    let mut root: Value = serde_json::from_str(text).ok()?;
    let usage = ["u", "usage"]
        .into_iter()
        .find_map(|key| root.get(key).filter(|v| v.is_array()).map(|_| key))?;

    let mut changed = false;
    for entry in root.get_mut(usage)?.as_array_mut()? {
        let Some(voltage) = entry.get_mut("v") else {
            continue;
        };
        if voltage.is_f64() {
            if let Some(float) = voltage.as_f64() {
                *voltage = Value::from(float.round() as i64);
                changed = true;
            }
        }
    }

    if changed {
        serde_json::to_string(&root).ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DeviceKind, NoteKind, UsageEvent};
    use crate::timestamp::Timestamp;

    fn record_with(entries: u32) -> BatteryRecord {
        let mut record = BatteryRecord::new("ABC123", Timestamp::from_raw("2501011200"));
        record.cycle_count = 2;
        record.usage = (1..=entries)
            .map(|i| UsageEvent {
                sequence: i,
                timestamp: Timestamp::from_raw("2501011200"),
                device: DeviceKind::Robot,
                energy: 0,
                voltage: 0,
            })
            .collect();
        record
    }

    fn sequences(record: &BatteryRecord) -> Vec<u32> {
        record.usage.iter().map(|e| e.sequence).collect()
    }

    #[test]
    fn fits_without_truncation() {
        let record = record_with(2);
        let encoded = encode(&record, 1000).unwrap();
        assert_eq!(encoded.record, record);
        assert_eq!(encoded.dropped, 0);
        assert_eq!(encoded.estimated_size, encoded.text.len() + 11);
        assert!(!encoded.text.contains(' '));
    }

    #[test]
    fn oversized_history_keeps_newest() {
        let record = record_with(15);
        let encoded = encode(&record, 200).unwrap();

        assert!(encoded.estimated_size <= 200);
        assert_eq!(sequences(&encoded.record), vec![13, 14, 15]);
        assert_eq!(encoded.dropped, 12);
    }

    #[test]
    fn example_capacity_100() {
        let record = record_with(15);
        let encoded = encode(&record, 100).unwrap();
        assert!(encoded.estimated_size <= 100);

        let decoded = decode_text(&encoded.text).unwrap();
        let kept = sequences(&decoded);
        let original = sequences(&record);
        assert!(original.ends_with(&kept));
        assert_eq!(decoded.serial, "ABC123");
        assert_eq!(decoded.cycle_count, 2);
    }

    #[test]
    fn too_large_even_when_empty() {
        let record = record_with(3);
        let err = encode(&record, 20).unwrap_err();
        match err {
            CodecError::TooLarge { capacity, required } => {
                assert_eq!(capacity, 20);
                assert_eq!(required, 64);
            }
            other => panic!("expected TooLarge, got {other:?}"),
        }
    }

    #[test]
    fn exact_fit_boundary() {
        let record = record_with(0);
        assert!(encode(&record, 64).is_ok());
        assert!(encode(&record, 63).is_err());
    }

    #[test]
    fn one_sixth_truncation_converges() {
        let record = record_with(60);
        let encoded = encode_with(&record, 300, Truncation::OneSixth).unwrap();
        assert!(encoded.estimated_size <= 300);
        assert!(sequences(&record).ends_with(&sequences(&encoded.record)));
        assert_eq!(encoded.dropped + encoded.record.usage.len(), 60);
    }

    #[test]
    fn one_sixth_step_sizes() {
        assert_eq!(Truncation::OneSixth.step(60), 10);
        assert_eq!(Truncation::OneSixth.step(5), 1);
        assert_eq!(Truncation::OneSixth.step(1), 1);
        assert_eq!(Truncation::OneAtATime.step(60), 1);
    }

    #[test]
    fn ndef_message_within_estimate() {
        let encoded = encode(&record_with(4), 1000).unwrap();
        let message = encoded.ndef_message();
        assert!(message.len() <= encoded.estimated_size);
        assert_eq!(decode_ndef(&message).unwrap(), encoded.record);
    }

    #[test]
    fn float_voltage_rounds_to_nearest() {
        let text = r#"{"sn":"A","fu":"0000000000","cc":1,"n":1,"u":[
            {"i":1,"t":"2501011200","d":1,"e":5,"v":12.6},
            {"i":2,"t":"2501011300","d":2,"e":0,"v":12.5},
            {"i":3,"t":"2501011400","d":1,"e":0,"v":12.4},
            {"i":4,"t":"2501011500","d":1,"e":0,"v":12}
        ]}"#;
        let record = decode_text(text).unwrap();
        let volts: Vec<i64> = record.usage.iter().map(|e| e.voltage).collect();
        assert_eq!(volts, vec![13, 13, 12, 12]);
        assert_eq!(record.note, NoteKind::Practice);
    }

    #[test]
    fn schema_mismatch_after_coercion() {
        let text = r#"{"sn":"A","u":[{"i":1,"d":9,"v":12.6}]}"#;
        assert!(matches!(decode_text(text), Err(CodecError::SchemaMismatch(_))));
    }

    #[test]
    fn non_json_is_schema_mismatch() {
        assert!(matches!(decode_text("hello"), Err(CodecError::SchemaMismatch(_))));
        assert!(matches!(decode_text(r#"{"x":1}"#), Err(CodecError::SchemaMismatch(_))));
    }

    #[test]
    fn ndef_without_text_is_distinct() {
        let uri_only = [0xD1, 0x01, 0x01, b'U', 0x00];
        assert!(matches!(decode_ndef(&uri_only), Err(CodecError::NoCompatiblePayload)));
    }

    #[test]
    fn pretty_json_decodes() {
        let record = record_with(2);
        let pretty = to_pretty_json(&record).unwrap();
        assert!(pretty.contains('\n'));
        assert_eq!(decode_text(&pretty).unwrap(), record);
    }
}
