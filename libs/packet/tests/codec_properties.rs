use proptest::prelude::*;

use telemetry_packet::{CodecError, PACKET_LEN, TelemetryRecord, decode};

fn any_record() -> impl Strategy<Value = TelemetryRecord> {
    (
        (any::<u16>(), any::<u16>(), any::<u32>(), any::<u64>()),
        (any::<u16>(), any::<u16>(), any::<i16>(), any::<u8>(), any::<u8>()),
        (any::<u8>(), any::<u8>(), any::<u8>(), any::<u8>(), any::<u16>()),
    )
        .prop_map(
            |(
                (magic, vehicle_id, sequence_id, timestamp),
                (rpm, speed, jerk, temp, battery_level),
                (gear, flags, version, cpu_load, crc16),
            )| TelemetryRecord {
                magic,
                vehicle_id,
                sequence_id,
                timestamp,
                rpm,
                speed,
                jerk,
                temp,
                battery_level,
                gear,
                flags,
                version,
                cpu_load,
                crc16,
            },
        )
}

proptest! {
    #[test]
    fn wrong_length_is_always_rejected(payload in prop::collection::vec(any::<u8>(), 0..128)) {
        prop_assume!(payload.len() != PACKET_LEN);
        prop_assert_eq!(decode(&payload), Err(CodecError::InvalidLength { len: payload.len() }));
    }

    #[test]
    fn exact_length_always_decodes(payload in prop::array::uniform32(any::<u8>())) {
        let first = decode(&payload);
        prop_assert!(first.is_ok());
        // Одинаковые байты дают одинаковую запись.
        prop_assert_eq!(first, decode(&payload));
    }

    #[test]
    fn fields_survive_encode_decode(record in any_record()) {
        let decoded = decode(&record.encode()).unwrap();
        prop_assert_eq!(decoded, record);
    }

    #[test]
    fn reserved_tail_does_not_affect_decode(
        payload in prop::array::uniform32(any::<u8>()),
        tail in any::<[u8; 2]>(),
    ) {
        let mut other = payload;
        other[30..].copy_from_slice(&tail);
        prop_assert_eq!(decode(&payload), decode(&other));
    }
}
