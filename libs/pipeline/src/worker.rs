use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::Instrument;

use telemetry_packet::{CodecError, decode};

use crate::queue::{Job, JobQueue};
use crate::sink::SinkAdapter;
use crate::stats::PipelineStats;

// ═══════════════════════════════════════════════════════════════
//  Job processing
// ═══════════════════════════════════════════════════════════════

/// Чем закончилась обработка одной задачи.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// Запись передана в sink.
    Forwarded { alert: bool },
    /// Декодер отклонил payload.
    Rejected,
}

/// decode → sink.submit → alert.
///
/// Ошибки одной задачи остаются здесь: они логируются и никуда не
/// пробрасываются.
pub fn process_job(
    worker: usize,
    job: Job,
    sink: &SinkAdapter,
    stats: &PipelineStats,
) -> JobOutcome {
    let record = match decode(&job.payload) {
        Ok(record) => record,
        Err(CodecError::InvalidLength { len }) => {
            stats.record_rejected();
            tracing::warn!(worker, topic = %job.topic, len, "dropped invalid packet");
            return JobOutcome::Rejected;
        }
    };

    sink.submit(&record);
    stats.record_decoded();

    let alert = record.has_alert();
    if alert {
        stats.record_alert();
        tracing::info!(
            worker,
            vehicle_id = record.vehicle_id,
            flags = %format_args!("{:#X}", record.flags),
            jerk = record.jerk,
            version = record.version,
            "vehicle alert"
        );
    }
    JobOutcome::Forwarded { alert }
}

// ═══════════════════════════════════════════════════════════════
//  WorkerPool
// ═══════════════════════════════════════════════════════════════

/// Фиксированный пул воркеров над одной [`JobQueue`].
///
/// Каждый воркер: `Running` → (отмена замечена на следующем dequeue) →
/// `Stopped`. Перезапусков нет. Текущая задача всегда дорабатывается.
pub struct WorkerPool {
    tracker: TaskTracker,
}

impl WorkerPool {
    /// Запустить `size` воркеров. Должен вызываться внутри tokio runtime.
    pub fn start(
        size: usize,
        queue: JobQueue,
        sink: Arc<SinkAdapter>,
        stats: Arc<PipelineStats>,
        token: CancellationToken,
    ) -> Self {
        let tracker = TaskTracker::new();
        for worker in 0..size {
            let span = tracing::debug_span!("worker", id = worker);
            tracker.spawn(
                run_worker(worker, queue.clone(), sink.clone(), stats.clone(), token.clone())
                    .instrument(span),
            );
        }
        tracker.close();
        tracing::debug!(size, "worker pool started");
        Self { tracker }
    }

    /// Дождаться выхода всех воркеров.
    pub async fn join(&self) {
        self.tracker.wait().await;
    }
}

async fn run_worker(
    worker: usize,
    queue: JobQueue,
    sink: Arc<SinkAdapter>,
    stats: Arc<PipelineStats>,
    token: CancellationToken,
) {
    while let Some(job) = queue.dequeue(&token).await {
        process_job(worker, job, &sink, &stats);
    }
    tracing::debug!(worker, "worker stopped");
}
