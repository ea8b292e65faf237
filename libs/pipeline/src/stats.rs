use std::sync::atomic::{AtomicU64, Ordering};

/// Счётчики конвейера. Обновляются конкурентно ingress'ом и воркерами.
#[derive(Debug, Default)]
pub struct PipelineStats {
    accepted: AtomicU64,
    dropped: AtomicU64,
    decoded: AtomicU64,
    rejected: AtomicU64,
    alerts: AtomicU64,
}

/// Снимок счётчиков на момент вызова.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Принято в очередь.
    pub accepted: u64,
    /// Отброшено из-за переполнения очереди.
    pub dropped: u64,
    /// Успешно декодировано и передано в sink.
    pub decoded: u64,
    /// Отклонено декодером (неверная длина).
    pub rejected: u64,
    /// Пакеты с ненулевыми flags.
    pub alerts: u64,
}

impl PipelineStats {
    pub fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    /// Возвращает новое значение счётчика дропов.
    pub fn record_dropped(&self) -> u64 {
        self.dropped.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn record_decoded(&self) {
        self.decoded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_alert(&self) {
        self.alerts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            accepted: self.accepted.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            decoded: self.decoded.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            alerts: self.alerts.load(Ordering::Relaxed),
        }
    }
}
