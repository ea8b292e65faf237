use crate::{CodecError, CRC_OFFSET, PACKET_LEN, crc16_ccitt};

// ═══════════════════════════════════════════════════════════════
//  TelemetryRecord
// ═══════════════════════════════════════════════════════════════

/// Декодированный пакет телеметрии.
///
/// Существует только как результат успешного [`decode`] ровно 32 байт
/// (или собирается продюсером для [`TelemetryRecord::encode`]).
/// После создания не изменяется.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TelemetryRecord {
    pub magic: u16,
    pub vehicle_id: u16,
    pub sequence_id: u32,
    /// Часы продюсера; единица измерения форматом не фиксируется.
    pub timestamp: u64,
    pub rpm: u16,
    pub speed: u16,
    /// Знаковый: отрицательный при торможении.
    pub jerk: i16,
    pub temp: u8,
    pub battery_level: u8,
    pub gear: u8,
    /// Битовое поле, см. [`crate::flags`].
    pub flags: u8,
    pub version: u8,
    pub cpu_load: u8,
    /// Декодируется, но не проверяется.
    pub crc16: u16,
}

impl TelemetryRecord {
    /// Хотя бы один флаг выставлен.
    pub fn has_alert(&self) -> bool {
        self.flags != 0
    }

    /// Сериализовать в проводной формат. Байты 30..32 (reserved) нулевые,
    /// `crc16` пишется как есть.
    pub fn encode(&self) -> [u8; PACKET_LEN] {
        let mut buf = [0u8; PACKET_LEN];
        buf[0..2].copy_from_slice(&self.magic.to_be_bytes());
        buf[2..4].copy_from_slice(&self.vehicle_id.to_be_bytes());
        buf[4..8].copy_from_slice(&self.sequence_id.to_be_bytes());
        buf[8..16].copy_from_slice(&self.timestamp.to_be_bytes());
        buf[16..18].copy_from_slice(&self.rpm.to_be_bytes());
        buf[18..20].copy_from_slice(&self.speed.to_be_bytes());
        buf[20..22].copy_from_slice(&self.jerk.to_be_bytes());
        buf[22] = self.temp;
        buf[23] = self.battery_level;
        buf[24] = self.gear;
        buf[25] = self.flags;
        buf[26] = self.version;
        buf[27] = self.cpu_load;
        buf[28..30].copy_from_slice(&self.crc16.to_be_bytes());
        buf
    }

    /// Пересчитать `crc16` по байтам заголовка и payload (`0..28`).
    pub fn with_checksum(mut self) -> Self {
        self.crc16 = 0;
        let buf = self.encode();
        self.crc16 = crc16_ccitt(&buf[..CRC_OFFSET]);
        self
    }
}

// ═══════════════════════════════════════════════════════════════
//  Decode
// ═══════════════════════════════════════════════════════════════

/// Декодировать пакет.
///
/// Длина проверяется до разбора любых полей: всё, что не ровно
/// [`PACKET_LEN`] байт, отклоняется с [`CodecError::InvalidLength`].
/// Частичного успеха нет.
pub fn decode(payload: &[u8]) -> Result<TelemetryRecord, CodecError> {
    let b: &[u8; PACKET_LEN] = payload
        .try_into()
        .map_err(|_| CodecError::InvalidLength { len: payload.len() })?;

    Ok(TelemetryRecord {
        magic: u16::from_be_bytes([b[0], b[1]]),
        vehicle_id: u16::from_be_bytes([b[2], b[3]]),
        sequence_id: u32::from_be_bytes([b[4], b[5], b[6], b[7]]),
        timestamp: u64::from_be_bytes([b[8], b[9], b[10], b[11], b[12], b[13], b[14], b[15]]),
        rpm: u16::from_be_bytes([b[16], b[17]]),
        speed: u16::from_be_bytes([b[18], b[19]]),
        jerk: i16::from_be_bytes([b[20], b[21]]),
        temp: b[22],
        battery_level: b[23],
        gear: b[24],
        flags: b[25],
        version: b[26],
        cpu_load: b[27],
        crc16: u16::from_be_bytes([b[28], b[29]]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PACKET_MAGIC, flags};

    fn sample() -> [u8; PACKET_LEN] {
        [
            0xD3, 0x50, // magic
            0x00, 0x01, // vehicle_id = 1
            0x00, 0x00, 0x00, 0x2A, // sequence_id = 42
            0x00, 0x00, 0x01, 0x8D, 0x2B, 0x3C, 0x4D, 0x5E, // timestamp
            0x1F, 0x40, // rpm = 8000
            0x00, 0x78, // speed = 120
            0xFF, 0x38, // jerk = -200
            0x5A, // temp = 90
            0x4B, // battery = 75
            0x04, // gear
            0x00, // flags
            0x01, // version
            0x21, // cpu_load = 33
            0xBE, 0xEF, // crc16
            0xAA, 0x55, // reserved
        ]
    }

    #[test]
    fn decodes_every_field_at_its_offset() {
        let rec = decode(&sample()).unwrap();
        assert_eq!(rec.magic, PACKET_MAGIC);
        assert_eq!(rec.vehicle_id, 1);
        assert_eq!(rec.sequence_id, 42);
        assert_eq!(rec.timestamp, 0x0000_018D_2B3C_4D5E);
        assert_eq!(rec.rpm, 8000);
        assert_eq!(rec.speed, 120);
        assert_eq!(rec.jerk, -200);
        assert_eq!(rec.temp, 90);
        assert_eq!(rec.battery_level, 75);
        assert_eq!(rec.gear, 4);
        assert_eq!(rec.flags, 0);
        assert_eq!(rec.version, 1);
        assert_eq!(rec.cpu_load, 33);
        assert_eq!(rec.crc16, 0xBEEF);
        assert!(!rec.has_alert());
    }

    #[test]
    fn flags_byte_is_offset_25() {
        let mut raw = sample();
        raw[25] = 0x01;
        let rec = decode(&raw).unwrap();
        assert_eq!(rec.flags, flags::CHECK_ENGINE);
        assert!(rec.has_alert());

        // Остальные поля не меняются.
        let base = decode(&sample()).unwrap();
        assert_eq!(TelemetryRecord { flags: 0, ..rec }, base);
    }

    #[test]
    fn rejects_short_and_long_payloads() {
        let raw = sample();
        assert_eq!(decode(&raw[..31]), Err(CodecError::InvalidLength { len: 31 }));
        assert_eq!(decode(&[]), Err(CodecError::InvalidLength { len: 0 }));

        let mut long = raw.to_vec();
        long.push(0);
        assert_eq!(decode(&long), Err(CodecError::InvalidLength { len: 33 }));
    }

    #[test]
    fn reserved_bytes_are_ignored() {
        let mut raw = sample();
        raw[30] = 0;
        raw[31] = 0;
        assert_eq!(decode(&raw), decode(&sample()));
    }

    #[test]
    fn encode_layout_is_big_endian() {
        let rec = TelemetryRecord {
            magic: PACKET_MAGIC,
            vehicle_id: 0xAABB,
            sequence_id: 0x1122_3344,
            ..Default::default()
        };
        let buf = rec.encode();
        assert_eq!(&buf[0..2], &[0xD3, 0x50]);
        assert_eq!(&buf[2..4], &[0xAA, 0xBB]);
        assert_eq!(&buf[4..8], &[0x11, 0x22, 0x33, 0x44]);
        assert_eq!(&buf[30..32], &[0, 0]);
    }

    #[test]
    fn checksum_covers_first_28_bytes() {
        let rec = decode(&sample()).unwrap().with_checksum();
        let buf = rec.encode();
        assert_eq!(rec.crc16, crc16_ccitt(&buf[..CRC_OFFSET]));

        // Пересчёт идемпотентен.
        assert_eq!(rec.with_checksum(), rec);
    }
}
