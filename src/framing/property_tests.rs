//! Property-Based Tests for Framing
//!
//! Uses proptest to verify the round-trip law for every framed type and the
//! version-tag rejection rules.

use proptest::prelude::*;

use crate::context::OperationId;
use crate::entry::{BitSet, CompressedValueEntry, EntryValue, LockAccessType, Priority};
use crate::events::{AsyncCallbackIdentity, CallbackHandle, CallbackIdentity, EventFilter, EventSnapshot};
use crate::framing::{compare, frame, unframe, Compact, CompactReader, CompactWriter, PROTOCOL_TAG, TAG_LEN};

// == Strategies ==
fn payload_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..2048)
}

fn client_id_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_-]{1,32}"
}

fn priority_strategy() -> impl Strategy<Value = Priority> {
    prop_oneof![
        Just(Priority::Low),
        Just(Priority::BelowNormal),
        Just(Priority::Normal),
        Just(Priority::AboveNormal),
        Just(Priority::High),
        Just(Priority::NotRemovable),
    ]
}

fn filter_strategy() -> impl Strategy<Value = EventFilter> {
    prop_oneof![
        Just(EventFilter::None),
        Just(EventFilter::Metadata),
        Just(EventFilter::DataWithMetadata),
    ]
}

fn roundtrip<T: Compact>(value: &T) -> T {
    let mut writer = CompactWriter::new();
    value.serialize(&mut writer).unwrap();
    let bytes = writer.into_bytes();
    let mut reader = CompactReader::new(&bytes);
    let decoded = T::deserialize(&mut reader).unwrap();
    assert_eq!(reader.remaining(), 0, "frame body not fully consumed");
    decoded
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Round-trip law: serialize then deserialize reproduces field-equal output
    #[test]
    fn prop_compressed_value_roundtrip(payload in payload_strategy(), flags in any::<u8>()) {
        let entry = CompressedValueEntry::new(
            EntryValue::wrap(&payload),
            BitSet::from_byte(flags),
        );
        prop_assert_eq!(roundtrip(&entry), entry);
    }

    #[test]
    fn prop_event_snapshot_roundtrip(
        payload in payload_strategy(),
        flags in any::<u8>(),
        priority in priority_strategy()
    ) {
        let snapshot = EventSnapshot::new(
            priority,
            BitSet::from_byte(flags),
            EntryValue::wrap(&payload),
        );
        let decoded = roundtrip(&snapshot);
        prop_assert_eq!(decoded.priority, snapshot.priority);
        prop_assert_eq!(decoded.flags, snapshot.flags);
        prop_assert_eq!(decoded.value, snapshot.value);
    }

    #[test]
    fn prop_operation_id_roundtrip(source in client_id_strategy(), counter in any::<u64>()) {
        let id = OperationId::new(source, counter);
        prop_assert_eq!(roundtrip(&id), id);
    }

    #[test]
    fn prop_async_identity_roundtrip(
        client in client_id_strategy(),
        handle in any::<u16>(),
        filter in filter_strategy(),
        request_id in any::<u64>()
    ) {
        let id = AsyncCallbackIdentity::new(
            CallbackIdentity::new(client, CallbackHandle::new(handle), filter),
            request_id,
        );
        let decoded = roundtrip(&id);
        // Field-equal, stronger than the relaxed subscription equality
        prop_assert_eq!(decoded.request_id, id.request_id);
        prop_assert_eq!(decoded.base.filter, id.base.filter);
        prop_assert_eq!(decoded, id);
    }

    // Versioned framing end to end
    #[test]
    fn prop_versioned_frame_roundtrip(payload in payload_strategy(), flags in any::<u8>()) {
        let entry = CompressedValueEntry::new(
            EntryValue::wrap(&payload),
            BitSet::from_byte(flags),
        );
        let bytes = frame(&entry).unwrap();
        prop_assert!(compare(&bytes));
        let decoded: CompressedValueEntry = unframe(&bytes).unwrap();
        prop_assert_eq!(decoded, entry);
    }

    // Any single altered tag byte must fail compare
    #[test]
    fn prop_altered_tag_byte_rejected(index in 0..TAG_LEN, flip in 1u8..=255) {
        let mut tag = PROTOCOL_TAG;
        tag[index] ^= flip;
        prop_assert!(!compare(&tag));
    }

    // Unknown lock access codes always decode to Default, never panic
    #[test]
    fn prop_unknown_lock_code_decodes_to_default(code in "[a-zA-Z0-9]{0,4}") {
        let decoded = LockAccessType::from_code(&code);
        let known = LockAccessType::ALL
            .iter()
            .any(|t| *t != LockAccessType::Default && t.as_code() == code);
        if !known {
            prop_assert_eq!(decoded, LockAccessType::Default);
        }
    }

    // Garbage input never panics the decoder
    #[test]
    fn prop_garbage_never_panics_decoder(bytes in payload_strategy()) {
        let _ = unframe::<CompressedValueEntry>(&bytes);
        let mut reader = CompactReader::new(&bytes);
        let _ = CompressedValueEntry::deserialize(&mut reader);
    }
}
