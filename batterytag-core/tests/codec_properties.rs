//! Property tests for the capacity-fitting codec.
//!
//! For any record and capacity, encoding either fits the capacity with a
//! newest-suffix of the history, or fails because even the empty history
//! does not fit.

use batterytag_core::codec::{self, CodecError, Truncation};
use batterytag_core::{BatteryRecord, DeviceKind, NoteKind, Timestamp, UsageEvent, UsageHistory};
use proptest::prelude::*;

fn arb_device() -> impl Strategy<Value = DeviceKind> {
    prop_oneof![Just(DeviceKind::Robot), Just(DeviceKind::Charger)]
}

fn arb_note() -> impl Strategy<Value = NoteKind> {
    prop::sample::select(NoteKind::ALL.to_vec())
}

fn arb_event() -> impl Strategy<Value = (String, DeviceKind, u32, i64)> {
    ("[0-9]{10}", arb_device(), 0u32..5000, -20i64..20)
}

prop_compose! {
    fn arb_record()(
        serial in "[A-Z0-9-]{1,8}",
        first_use in "[0-9]{10}",
        cycle_count in 0u32..10_000,
        note in arb_note(),
        events in prop::collection::vec(arb_event(), 0..40),
    ) -> BatteryRecord {
        let usage: UsageHistory = events
            .into_iter()
            .enumerate()
            .map(|(index, (timestamp, device, energy, voltage))| UsageEvent {
                sequence: index as u32 + 1,
                timestamp: Timestamp::from_raw(timestamp),
                device,
                energy,
                voltage,
            })
            .collect();
        BatteryRecord {
            serial,
            first_use: Timestamp::from_raw(first_use),
            cycle_count,
            note,
            usage,
        }
    }
}

fn arb_truncation() -> impl Strategy<Value = Truncation> {
    prop_oneof![Just(Truncation::OneAtATime), Just(Truncation::OneSixth)]
}

fn empty_history_size(record: &BatteryRecord) -> usize {
    let mut empty = record.clone();
    empty.usage = UsageHistory::new();
    codec::estimate_size(&codec::to_compact_json(&empty).unwrap())
}

proptest! {
    #[test]
    fn encoded_size_fits_capacity(
        record in arb_record(),
        capacity in 0usize..2000,
        truncation in arb_truncation(),
    ) {
        match codec::encode_with(&record, capacity, truncation) {
            Ok(encoded) => {
                prop_assert!(encoded.estimated_size <= capacity);
                prop_assert_eq!(encoded.estimated_size, codec::estimate_size(&encoded.text));
                prop_assert!(encoded.ndef_message().len() <= encoded.estimated_size);
            }
            Err(CodecError::TooLarge { capacity: reported, required }) => {
                prop_assert_eq!(reported, capacity);
                prop_assert!(required > capacity);
                prop_assert!(empty_history_size(&record) > capacity);
            }
            Err(other) => prop_assert!(false, "unexpected error {other:?}"),
        }
    }

    #[test]
    fn fails_only_when_empty_history_does_not_fit(record in arb_record()) {
        let minimum = empty_history_size(&record);
        prop_assert!(codec::encode(&record, minimum).is_ok());
        let too_small = codec::encode(&record, minimum - 1);
        prop_assert!(matches!(too_small, Err(CodecError::TooLarge { .. })), "expected TooLarge, got {:?}", too_small);
    }

    #[test]
    fn survivors_are_newest_suffix(
        record in arb_record(),
        capacity in 60usize..1500,
        truncation in arb_truncation(),
    ) {
        if let Ok(encoded) = codec::encode_with(&record, capacity, truncation) {
            let original = record.usage.as_slice();
            let kept = encoded.record.usage.as_slice();
            prop_assert_eq!(kept.len() + encoded.dropped, original.len());
            prop_assert_eq!(kept, &original[original.len() - kept.len()..]);
        }
    }

    #[test]
    fn decode_reproduces_fitted_record(record in arb_record(), capacity in 60usize..1500) {
        if let Ok(encoded) = codec::encode(&record, capacity) {
            let decoded = codec::decode_text(&encoded.text).unwrap();
            prop_assert_eq!(&decoded, &encoded.record);

            let mut expected = record.clone();
            expected.usage.drop_oldest(encoded.dropped);
            prop_assert_eq!(decoded, expected);
        }
    }

    #[test]
    fn one_at_a_time_drops_no_more_than_needed(record in arb_record(), capacity in 60usize..1500) {
        if let Ok(encoded) = codec::encode(&record, capacity) {
            if encoded.dropped > 0 {
                let mut one_more = encoded.record.clone();
                let restored = &record.usage.as_slice()[record.usage.len() - encoded.record.usage.len() - 1];
                one_more.usage.push(restored.clone());
                let text = codec::to_compact_json(&one_more).unwrap();
                prop_assert!(codec::estimate_size(&text) > capacity);
            }
        }
    }

    #[test]
    fn float_voltages_round_half_away_from_zero(whole in -30i64..30, frac in prop::sample::select(vec![0.4f64, 0.5, 0.6])) {
        let voltage = whole as f64 + if whole < 0 { -frac } else { frac };
        let text = format!(r#"{{"sn":"A","u":[{{"i":1,"d":1,"v":{voltage}}}]}}"#);
        let decoded = codec::decode_text(&text).unwrap();
        let expected = voltage.round() as i64;
        prop_assert_eq!(decoded.usage.as_slice()[0].voltage, expected);
        prop_assert_eq!(expected.abs(), if frac < 0.5 { whole.abs() } else { whole.abs() + 1 });
    }
}
