use std::time::Duration;

// ═══════════════════════════════════════════════════════════════
//  Pipeline Config
// ═══════════════════════════════════════════════════════════════

/// Параметры конвейера. Неизменяемы после загрузки.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Паттерн подписки (e.g., "fleet/+/telemetry").
    pub topic: String,
    /// Количество воркеров в пуле.
    pub worker_count: usize,
    /// Ёмкость очереди задач; всё сверх неё отбрасывается.
    pub queue_size: usize,
    /// Сколько ждать транспорт при отключении.
    pub disconnect_grace: Duration,
    /// Верхняя граница flush sink'а при остановке. None = ждать сколько нужно.
    pub flush_timeout: Option<Duration>,
}

pub const DEFAULT_TOPIC: &str = "fleet/+/telemetry";
pub const DEFAULT_WORKER_COUNT: usize = 100;
pub const DEFAULT_QUEUE_SIZE: usize = 2000;
pub const DEFAULT_DISCONNECT_GRACE: Duration = Duration::from_millis(250);
pub const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_secs(10);

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            topic: DEFAULT_TOPIC.into(),
            worker_count: DEFAULT_WORKER_COUNT,
            queue_size: DEFAULT_QUEUE_SIZE,
            disconnect_grace: DEFAULT_DISCONNECT_GRACE,
            flush_timeout: Some(DEFAULT_FLUSH_TIMEOUT),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.topic.trim().is_empty() {
            return Err("topic must not be empty".into());
        }
        if self.worker_count == 0 {
            return Err("worker_count must be at least 1".into());
        }
        if self.queue_size == 0 {
            return Err("queue_size must be at least 1".into());
        }
        Ok(())
    }
}
