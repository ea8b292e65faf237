//! Биты поля `flags`.
//!
//! Любой ненулевой `flags` ингестор считает алертом; отдельные биты
//! выставляет симулятор.

pub const CHECK_ENGINE: u8 = 1 << 0;
pub const OVERHEAT: u8 = 1 << 1;
pub const LOW_BATTERY: u8 = 1 << 2;
pub const ABS_ACTIVE: u8 = 1 << 3;
pub const TCS_ACTIVE: u8 = 1 << 4;
pub const REMOTE_KILL: u8 = 1 << 5;

/// Имена выставленных битов, для логов.
pub fn names(flags: u8) -> Vec<&'static str> {
    const ALL: [(u8, &str); 6] = [
        (CHECK_ENGINE, "check_engine"),
        (OVERHEAT, "overheat"),
        (LOW_BATTERY, "low_battery"),
        (ABS_ACTIVE, "abs_active"),
        (TCS_ACTIVE, "tcs_active"),
        (REMOTE_KILL, "remote_kill"),
    ];
    ALL.iter()
        .filter(|(bit, _)| flags & bit != 0)
        .map(|(_, name)| *name)
        .collect()
}
