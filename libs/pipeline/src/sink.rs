use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::Instrument;

use ingest_api::{DataPoint, TimeSeriesSink, now_ns};
use telemetry_packet::TelemetryRecord;

pub const MEASUREMENT: &str = "vehicle_status";

/// Сколько ждать, пока наблюдатель ошибок дочитает поток после close().
const ERROR_WATCHER_GRACE: Duration = Duration::from_secs(1);

// ═══════════════════════════════════════════════════════════════
//  Record → DataPoint
// ═══════════════════════════════════════════════════════════════

/// Одна запись → одна точка `vehicle_status`.
///
/// Время точки — момент ингестии: единица `timestamp` в пакете не
/// зафиксирована форматом.
pub fn record_to_point(record: &TelemetryRecord, timestamp_ns: i64) -> DataPoint {
    DataPoint::new(MEASUREMENT)
        .tag("vehicle_id", record.vehicle_id.to_string())
        .field("speed", record.speed)
        .field("rpm", record.rpm)
        .field("jerk", record.jerk)
        .field("temp", record.temp)
        .field("battery", record.battery_level)
        .field("gear", record.gear)
        .field("flags", record.flags)
        .at(timestamp_ns)
}

// ═══════════════════════════════════════════════════════════════
//  SinkAdapter
// ═══════════════════════════════════════════════════════════════

/// Граница с клиентом хранилища.
///
/// `submit` никогда не ждёт сеть. Асинхронные ошибки записи читает
/// отдельная задача и только логирует их: до воркеров они не доходят,
/// повторной отправки нет.
pub struct SinkAdapter {
    sink: Arc<dyn TimeSeriesSink>,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl SinkAdapter {
    /// Должен вызываться внутри tokio runtime.
    pub fn new(sink: Arc<dyn TimeSeriesSink>) -> Self {
        let watcher = sink.errors().map(|mut errors| {
            let task = async move {
                while let Some(e) = errors.recv().await {
                    tracing::error!(error = %e, kind = %e.kind(), "sink write error");
                }
                tracing::debug!("sink error stream closed");
            };
            tokio::spawn(task.in_current_span())
        });
        Self { sink, watcher: Mutex::new(watcher) }
    }

    pub fn submit(&self, record: &TelemetryRecord) {
        self.sink.submit(record_to_point(record, now_ns()));
    }

    /// Дождаться отправки всего ранее переданного.
    ///
    /// `timeout = None` ждёт без ограничения. Возвращает false, если
    /// время вышло.
    pub async fn flush(&self, timeout: Option<Duration>) -> bool {
        match timeout {
            None => {
                self.sink.flush().await;
                true
            }
            Some(limit) => tokio::time::timeout(limit, self.sink.flush()).await.is_ok(),
        }
    }

    /// Закрыть клиент и дождаться, пока наблюдатель ошибок залогирует
    /// хвост потока.
    ///
    /// Ограничение то же, что у `flush`: по истечении future закрытия
    /// бросается, наблюдатель снимается. Возвращает false, если время вышло.
    pub async fn close(&self, timeout: Option<Duration>) -> bool {
        let closed = match timeout {
            None => {
                self.sink.close().await;
                true
            }
            Some(limit) => tokio::time::timeout(limit, self.sink.close()).await.is_ok(),
        };

        let watcher = match self.watcher.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(mut handle) = watcher {
            if !closed || tokio::time::timeout(ERROR_WATCHER_GRACE, &mut handle).await.is_err() {
                handle.abort();
            }
        }
        closed
    }
}
