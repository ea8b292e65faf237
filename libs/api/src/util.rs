use std::time::{SystemTime, UNIX_EPOCH};

/// Текущее Unix-время в миллисекундах.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// Текущее Unix-время в наносекундах (точность InfluxDB по умолчанию).
pub fn now_ns() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as i64
}
