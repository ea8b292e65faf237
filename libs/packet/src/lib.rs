//! Бинарный формат телеметрии транспортных средств.
//!
//! Каждый пакет занимает ровно [`PACKET_LEN`] байт, все многобайтовые поля
//! в big-endian:
//!
//! ```text
//!  0      2      4          8                16     18     20     22 23 24 25 26 27 28     30     32
//!  ┌──────┬──────┬──────────┬────────────────┬──────┬──────┬──────┬──┬──┬──┬──┬──┬──┬──────┬──────┐
//!  │magic │veh_id│ seq_id   │ timestamp      │ rpm  │speed │ jerk │tp│bt│gr│fl│vr│cp│crc16 │ rsvd │
//!  └──────┴──────┴──────────┴────────────────┴──────┴──────┴──────┴──┴──┴──┴──┴──┴──┴──────┴──────┘
//! ```
//!
//! Декодирование чистое: нет I/O, нет разделяемого состояния, можно вызывать
//! из любого количества потоков одновременно.

mod crc;
mod error;
pub mod flags;
mod record;

pub use crc::crc16_ccitt;
pub use error::CodecError;
pub use record::{decode, TelemetryRecord};

/// Размер пакета на проводе.
pub const PACKET_LEN: usize = 32;

/// Маркер протокола, который выставляют симуляторы флота.
pub const PACKET_MAGIC: u16 = 0xD350;

/// Текущая версия формата.
pub const PACKET_VERSION: u8 = 1;

/// Смещение поля crc16; контрольная сумма покрывает байты `0..CRC_OFFSET`.
pub const CRC_OFFSET: usize = 28;
